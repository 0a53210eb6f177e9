//! JSONL file writer for orchestration checkpoints.
//!
//! Each [`Checkpoint`] is serialized as a single JSON line with a
//! `type = "checkpoint"` field and an RFC 3339 `logged_at` timestamp,
//! appended to the file via a buffered writer.

use conductor_application::CheckpointSink;
use conductor_domain::Checkpoint;
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// JSONL checkpoint sink that writes one JSON object per line.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes on `Drop`.
pub struct JsonlCheckpointSink {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlCheckpointSink {
    /// Create a sink appending to the given path.
    ///
    /// Creates the file (and parent directories) if they don't exist.
    /// Returns `None` if the file cannot be opened.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create checkpoint log directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!(
                    "Could not open checkpoint log file {}: {}",
                    path.display(),
                    e
                );
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    /// Get the path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CheckpointSink for JsonlCheckpointSink {
    fn emit(&self, checkpoint: &Checkpoint) {
        let logged_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let mut record = match serde_json::to_value(checkpoint) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return,
            Err(e) => {
                warn!(task_id = %checkpoint.task_id, error = %e, "Checkpoint not serializable");
                return;
            }
        };
        record.insert("type".to_string(), Value::String("checkpoint".to_string()));
        record.insert("logged_at".to_string(), Value::String(logged_at));

        let Ok(line) = serde_json::to_string(&record) else {
            return;
        };

        if let Ok(mut writer) = self.writer.lock()
            && let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush())
        {
            warn!(path = %self.path.display(), error = %e, "Checkpoint write failed");
        }
    }
}

impl Drop for JsonlCheckpointSink {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}
