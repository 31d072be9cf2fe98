//! Upcoming command for Hifdh.
//!
//! Lists manzil reviews scheduled within a horizon.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cli::{exit_code_for, open_engine, record_infos, RecordInfo};
use crate::config::Config;
use crate::error::HifdhError;

/// Options for the upcoming command.
#[derive(Debug, Clone)]
pub struct UpcomingOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Horizon in days; defaults to `queue.upcoming_days`.
    pub days: Option<u32>,
    /// First day of the window.
    pub today: NaiveDate,
}

/// Output format for the upcoming command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpcomingOutput {
    /// Whether the window was computed.
    pub success: bool,
    /// First day of the window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    /// Last day of the window (inclusive).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<NaiveDate>,
    /// Reviews in the window, earliest first.
    pub reviews: Vec<RecordInfo>,
    /// Error message if the window could not be computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Process exit code.
    #[serde(skip)]
    pub exit_code: i32,
}

impl UpcomingOutput {
    /// Create a failed output.
    pub fn failure(error: &HifdhError) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            exit_code: exit_code_for(Some(error)),
            ..Default::default()
        }
    }
}

/// The upcoming command implementation.
pub struct UpcomingCommand {
    config: Config,
    cwd: PathBuf,
}

impl UpcomingCommand {
    /// Create a new upcoming command.
    pub fn new(config: Config, cwd: impl AsRef<Path>) -> Self {
        Self {
            config,
            cwd: cwd.as_ref().to_path_buf(),
        }
    }

    /// Run the upcoming command.
    pub fn run(&self, options: &UpcomingOptions) -> UpcomingOutput {
        let snapshot = match open_engine(&self.cwd, self.config.clone()).and_then(|e| e.snapshot())
        {
            Ok(snapshot) => snapshot,
            Err(e) => return UpcomingOutput::failure(&e),
        };

        let horizon = options.days.unwrap_or(self.config.queue.upcoming_days);
        let window = snapshot.upcoming(options.today, horizon);

        UpcomingOutput {
            success: true,
            from: Some(window.from()),
            until: Some(window.until()),
            reviews: record_infos(&window),
            error: None,
            exit_code: exit_code_for(None),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &UpcomingOutput, options: &UpcomingOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        if !output.success {
            return format!(
                "Failed to list upcoming reviews: {}",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let window = match (output.from, output.until) {
            (Some(from), Some(until)) => format!("{} to {}", from, until),
            _ => "the next days".to_string(),
        };

        if output.reviews.is_empty() {
            return format!("No manzil reviews from {}.", window);
        }

        let mut lines = vec![format!(
            "Manzil reviews from {} ({})",
            window,
            output.reviews.len()
        )];
        lines.extend(output.reviews.iter().map(RecordInfo::line));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{chapters, MemorizationRecord, Stage};
    use crate::storage::{FileRecordStore, RecordStore};
    use tempfile::TempDir;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn seed_manzil(temp: &TempDir, id: &str, chapter: u16, next: u32) {
        let ch = chapters::chapter(chapter).unwrap();
        let mut record =
            MemorizationRecord::new_lesson(id, ch, 1, ch.verses, date(1), date(1)).unwrap();
        record.status = crate::core::CompletionStatus::Completed;
        record.stage = Stage::Manzil {
            review_frequency: 5,
            last_review_date: Some(date(1)),
            next_review_date: date(next),
        };
        FileRecordStore::for_project(temp.path())
            .unwrap()
            .put(&record)
            .unwrap();
    }

    fn options(days: Option<u32>) -> UpcomingOptions {
        UpcomingOptions {
            json: false,
            quiet: false,
            days,
            today: date(10),
        }
    }

    #[test]
    fn test_upcoming_uses_configured_horizon() {
        let temp = TempDir::new().unwrap();
        seed_manzil(&temp, "r0001", 112, 17);
        seed_manzil(&temp, "r0002", 113, 18);
        seed_manzil(&temp, "r0003", 114, 9);

        let cmd = UpcomingCommand::new(Config::default(), temp.path());
        let output = cmd.run(&options(None));

        assert!(output.success);
        assert_eq!(output.until, Some(date(17)));
        let ids: Vec<_> = output.reviews.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r0001"]);
    }

    #[test]
    fn test_upcoming_explicit_days_sorted() {
        let temp = TempDir::new().unwrap();
        seed_manzil(&temp, "r0001", 112, 20);
        seed_manzil(&temp, "r0002", 113, 10);

        let cmd = UpcomingCommand::new(Config::default(), temp.path());
        let output = cmd.run(&options(Some(30)));

        let ids: Vec<_> = output.reviews.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r0002", "r0001"]);

        let text = cmd.format_output(&output, &options(Some(30)));
        assert!(text.starts_with("Manzil reviews from 2026-10-10 to 2026-11-09 (2)"));
    }

    #[test]
    fn test_upcoming_empty() {
        let temp = TempDir::new().unwrap();
        let cmd = UpcomingCommand::new(Config::default(), temp.path());
        let output = cmd.run(&options(Some(0)));

        assert!(output.reviews.is_empty());
        assert_eq!(
            cmd.format_output(&output, &options(Some(0))),
            "No manzil reviews from 2026-10-10 to 2026-10-10."
        );
    }
}
