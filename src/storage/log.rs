//! JSONL review log for Hifdh.
//!
//! Events are stored one JSON object per line in an append-only file
//! (`.hifdh/reviews.log`).

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::config::review_log_path;
use crate::core::ReviewEvent;
use crate::error::{HifdhError, Result};
use crate::storage::ReviewLog;

/// Append-only JSONL review log.
#[derive(Debug)]
pub struct JsonlReviewLog {
    /// Path to the log file.
    path: PathBuf,
    /// Serializes appends from this process.
    write_lock: Mutex<()>,
}

impl JsonlReviewLog {
    /// Create a log writer for the given path.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Create a log writer for the project containing `cwd`.
    pub fn for_project(cwd: &Path) -> Self {
        Self::new(review_log_path(cwd))
    }

    /// Get the path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_content(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&self.path)
            .map(Some)
            .map_err(|e| HifdhError::storage(&self.path, e))
    }
}

impl ReviewLog for JsonlReviewLog {
    fn append(&self, event: &ReviewEvent) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| HifdhError::storage(parent, e))?;
        }

        let mut line = serde_json::to_string(event)
            .map_err(|e| HifdhError::serde(format!("Failed to serialize review event: {}", e)))?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| HifdhError::storage(&self.path, e))?;

        // One write per line so concurrent appenders never interleave
        file.write_all(line.as_bytes())
            .map_err(|e| HifdhError::storage(&self.path, e))?;
        file.sync_data()
            .map_err(|e| HifdhError::storage(&self.path, e))?;

        debug!(record_id = %event.record_id, date = %event.date, "review event appended");
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<ReviewEvent>> {
        let Some(content) = self.read_content()? else {
            return Ok(Vec::new());
        };

        let mut events = Vec::new();
        for (line_num, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let event: ReviewEvent = serde_json::from_str(line).map_err(|e| {
                HifdhError::serde(format!(
                    "Failed to parse review event on line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;
            events.push(event);
        }

        Ok(events)
    }

    fn count(&self) -> Result<usize> {
        Ok(self
            .read_content()?
            .map(|content| content.lines().filter(|l| !l.trim().is_empty()).count())
            .unwrap_or(0))
    }
}
