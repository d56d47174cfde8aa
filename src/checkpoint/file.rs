//! File-backed checkpoint store.
//!
//! Each thread lives in `<base>/<encoded thread_id>.jsonl`: one header record
//! with the loop bookkeeping, then one record per message carrying its
//! position. Thread ids are percent-encoded into the file name, so any string
//! is a valid id. Writes go to a temp file that is renamed over the target, so
//! readers see either the previous checkpoint or the new one.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use super::{ensure_matching_thread, CheckpointError, CheckpointStore};
use crate::types::{ConversationState, ConversationStatus, Message};

const EXTENSION: &str = "jsonl";
const CORRUPT_SUFFIX: &str = "corrupt";
// Common file-name limit on Linux, macOS and Windows.
const MAX_FILE_NAME_BYTES: usize = 255;

// Everything but `[A-Za-z0-9_-]` is escaped, which rules out separators,
// `..`, leading dots and control characters.
const FILE_NAME: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum Record {
    Header {
        thread_id: String,
        recursion_count: usize,
        status: ConversationStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        updated_at: Option<DateTime<Utc>>,
    },
    Message {
        seq: u64,
        message: Message,
    },
}

/// Stores one JSON-Lines file per thread under a base directory.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    base_path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Store under the platform data directory, e.g.
    /// `~/.local/share/toolloop/checkpoints` on Linux.
    pub fn in_default_location() -> Option<Self> {
        directories::ProjectDirs::from("dev", "toolloop", "toolloop")
            .map(|dirs| Self::new(dirs.data_dir().join("checkpoints")))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub(crate) fn thread_path(&self, thread_id: &str) -> Result<PathBuf, CheckpointError> {
        Ok(self
            .base_path
            .join(format!("{}.{EXTENSION}", file_stem(thread_id)?)))
    }

    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>, CheckpointError> {
        let path = self.thread_path(thread_id)?;
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                self.quarantine(&path, thread_id).await;
                return Err(e.into());
            }
        };
        Ok(Some(hydrate(thread_id, &content)))
    }

    /// Move an unreadable checkpoint aside so the next `put` cannot replace
    /// the only copy of the history.
    async fn quarantine(&self, path: &Path, thread_id: &str) {
        let mut target = path.as_os_str().to_owned();
        target.push(format!(".{CORRUPT_SUFFIX}"));
        match tokio::fs::rename(path, &target).await {
            Ok(()) => tracing::warn!(
                thread_id,
                moved_to = %Path::new(&target).display(),
                "moved unreadable checkpoint aside"
            ),
            Err(err) => tracing::warn!(thread_id, error = %err, "could not move unreadable checkpoint aside"),
        }
    }

    async fn write_atomic(&self, path: &Path, content: &str, thread_id: &str) -> Result<(), CheckpointError> {
        tokio::fs::create_dir_all(&self.base_path).await?;
        let tmp_path = self.base_path.join(format!(
            ".{}.{}.tmp",
            file_stem(thread_id)?,
            uuid::Uuid::new_v4().simple()
        ));

        let write_result = async {
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            file.write_all(content.as_bytes()).await?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp_path, path).await
        }
        .await;

        if let Err(e) = write_result {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(CheckpointError::Io(e));
        }
        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn get(&self, thread_id: &str) -> ConversationState {
        match self.load(thread_id).await {
            Ok(Some(state)) => state,
            Ok(None) => ConversationState::new(thread_id),
            Err(err) => {
                tracing::warn!(thread_id, error = %err, "unreadable checkpoint, starting fresh");
                ConversationState::new(thread_id)
            }
        }
    }

    async fn put(&self, thread_id: &str, state: &ConversationState) -> Result<(), CheckpointError> {
        ensure_matching_thread(thread_id, state)?;
        let path = self.thread_path(thread_id)?;
        let content = serialize(state)?;
        self.write_atomic(&path, &content, thread_id).await
    }

    async fn clear(&self, thread_id: &str) -> Result<(), CheckpointError> {
        let path = self.thread_path(thread_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn serialize(state: &ConversationState) -> Result<String, CheckpointError> {
    let header = Record::Header {
        thread_id: state.thread_id.clone(),
        recursion_count: state.recursion_count,
        status: state.status,
        updated_at: state.updated_at,
    };
    let mut out = to_line(&header)?;
    for (seq, message) in state.messages.iter().enumerate() {
        out.push_str(&to_line(&Record::Message {
            seq: seq as u64,
            message: message.clone(),
        })?);
    }
    Ok(out)
}

fn to_line(record: &Record) -> Result<String, CheckpointError> {
    let mut line =
        serde_json::to_string(record).map_err(|e| CheckpointError::Serialization(e.to_string()))?;
    line.push('\n');
    Ok(line)
}

/// Rebuild a state from checkpoint lines, skipping records that fail to parse.
///
/// Works on raw bytes so one damaged line (including invalid UTF-8) only
/// costs that record.
fn hydrate(thread_id: &str, content: &[u8]) -> ConversationState {
    let mut state = ConversationState::new(thread_id);
    let mut messages: Vec<(u64, Message)> = Vec::new();

    for (line_no, line) in content.split(|b| *b == b'\n').enumerate() {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice::<Record>(line) {
            Ok(Record::Header {
                thread_id: stored_id,
                recursion_count,
                status,
                updated_at,
            }) => {
                if stored_id != thread_id {
                    tracing::warn!(thread_id, stored_id = %stored_id, "checkpoint header names another thread");
                }
                state.recursion_count = recursion_count;
                state.status = status;
                state.updated_at = updated_at;
            }
            Ok(Record::Message { seq, message }) => messages.push((seq, message)),
            Err(err) => {
                tracing::warn!(thread_id, line = line_no + 1, error = %err, "skipping malformed checkpoint record");
            }
        }
    }

    messages.sort_by_key(|(seq, _)| *seq);
    state.messages = messages.into_iter().map(|(_, message)| message).collect();
    state
}

/// File stem for a thread id. Only ids too long to encode into one file
/// name are rejected.
fn file_stem(thread_id: &str) -> Result<String, CheckpointError> {
    let stem = utf8_percent_encode(thread_id, FILE_NAME).to_string();
    // Leave room for the temp-file prefix and suffixes.
    if stem.len() + 48 > MAX_FILE_NAME_BYTES {
        return Err(CheckpointError::InvalidThreadId(format!(
            "thread id is too long to store ({} bytes encoded)",
            stem.len()
        )));
    }
    Ok(stem)
}
