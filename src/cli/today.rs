//! Today command for Hifdh.
//!
//! Shows the day's work: sabak lessons, sabki reviews, and due manzil
//! portions, plus manzil reviews that have slipped past their date.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cli::{exit_code_for, open_engine, record_infos, RecordInfo};
use crate::config::Config;
use crate::error::HifdhError;

/// Options for the today command.
#[derive(Debug, Clone)]
pub struct TodayOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// The day to plan for.
    pub today: NaiveDate,
}

/// Output format for the today command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TodayOutput {
    /// Whether the queue was computed.
    pub success: bool,
    /// The day the queue was computed for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// New lessons in progress.
    pub sabak: Vec<RecordInfo>,
    /// Recent lessons under daily review.
    pub sabki: Vec<RecordInfo>,
    /// Manzil portions due today.
    pub manzil: Vec<RecordInfo>,
    /// Manzil portions due before today.
    pub overdue: Vec<RecordInfo>,
    /// Error message if the queue could not be computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Process exit code.
    #[serde(skip)]
    pub exit_code: i32,
}

impl TodayOutput {
    /// Create a failed output.
    pub fn failure(error: &HifdhError) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            exit_code: exit_code_for(Some(error)),
            ..Default::default()
        }
    }

    /// Total items due.
    pub fn total(&self) -> usize {
        self.sabak.len() + self.sabki.len() + self.manzil.len()
    }
}

/// The today command implementation.
pub struct TodayCommand {
    config: Config,
    cwd: PathBuf,
}

impl TodayCommand {
    /// Create a new today command.
    pub fn new(config: Config, cwd: impl AsRef<Path>) -> Self {
        Self {
            config,
            cwd: cwd.as_ref().to_path_buf(),
        }
    }

    /// Run the today command.
    pub fn run(&self, options: &TodayOptions) -> TodayOutput {
        let snapshot = match open_engine(&self.cwd, self.config.clone()).and_then(|e| e.snapshot())
        {
            Ok(snapshot) => snapshot,
            Err(e) => return TodayOutput::failure(&e),
        };

        let due = snapshot.due_today(options.today);
        TodayOutput {
            success: true,
            date: Some(options.today),
            sabak: record_infos(due.sabak.iter().copied()),
            sabki: record_infos(due.sabki.iter().copied()),
            manzil: record_infos(due.manzil.iter().copied()),
            overdue: record_infos(snapshot.overdue(options.today)),
            error: None,
            exit_code: exit_code_for(None),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &TodayOutput, options: &TodayOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        if !output.success {
            return format!(
                "Failed to build today's queue: {}",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut lines = Vec::new();
        match output.date {
            Some(date) => lines.push(format!("Hifdh for {}", date)),
            None => lines.push("Hifdh".to_string()),
        }

        if output.total() == 0 {
            lines.push(String::new());
            lines.push("Nothing due today.".to_string());
        }

        for (title, items) in [
            ("Sabak", &output.sabak),
            ("Sabki", &output.sabki),
            ("Manzil", &output.manzil),
        ] {
            if items.is_empty() {
                continue;
            }
            lines.push(String::new());
            lines.push(format!("{} ({})", title, items.len()));
            lines.extend(items.iter().map(RecordInfo::line));
        }

        if !output.overdue.is_empty() {
            lines.push(String::new());
            lines.push(format!("{} manzil review(s) overdue", output.overdue.len()));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::add::{AddCommand, AddOptions};
    use crate::cli::review::{ReviewCommand, ReviewOptions};
    use tempfile::TempDir;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn add(temp: &TempDir, chapter: u16, end: u16, today: u32) {
        let output = AddCommand::new(Config::default(), temp.path()).run(&AddOptions {
            json: false,
            quiet: false,
            chapter,
            start_verse: 1,
            end_verse: end,
            today: date(today),
            target: None,
            note: None,
        });
        assert!(output.success);
    }

    fn review(temp: &TempDir, id: &str, rating: u8, today: u32) {
        let output = ReviewCommand::new(Config::default(), temp.path()).run(&ReviewOptions {
            json: false,
            quiet: false,
            record_id: id.to_string(),
            rating,
            today: date(today),
        });
        assert!(output.success, "{:?}", output.error);
    }

    fn options(d: u32) -> TodayOptions {
        TodayOptions {
            json: false,
            quiet: false,
            today: date(d),
        }
    }

    #[test]
    fn test_today_empty_project() {
        let temp = TempDir::new().unwrap();
        let cmd = TodayCommand::new(Config::default(), temp.path());

        let output = cmd.run(&options(1));

        assert!(output.success);
        assert_eq!(output.total(), 0);
        assert!(cmd
            .format_output(&output, &options(1))
            .contains("Nothing due today."));
    }

    #[test]
    fn test_today_groups_by_stage() {
        let temp = TempDir::new().unwrap();
        add(&temp, 1, 7, 1);
        add(&temp, 2, 5, 1);
        review(&temp, "r0002", 4, 1);

        let cmd = TodayCommand::new(Config::default(), temp.path());
        let output = cmd.run(&options(2));

        assert_eq!(output.sabak.len(), 1);
        assert_eq!(output.sabak[0].id, "r0001");
        assert_eq!(output.sabki.len(), 1);
        assert_eq!(output.sabki[0].id, "r0002");
        assert!(output.manzil.is_empty());

        let text = cmd.format_output(&output, &options(2));
        assert!(text.contains("Hifdh for 2026-10-02"));
        assert!(text.contains("Sabak (1)"));
        assert!(text.contains("Sabki (1)"));
        assert!(!text.contains("Manzil ("));
    }

    #[test]
    fn test_today_reports_overdue_manzil() {
        let temp = TempDir::new().unwrap();
        add(&temp, 1, 7, 1);
        review(&temp, "r0001", 5, 1);
        for day in 2..=8 {
            review(&temp, "r0001", 4, day);
        }

        let cmd = TodayCommand::new(Config::default(), temp.path());
        let output = cmd.run(&options(30));

        assert!(output.manzil.is_empty());
        assert_eq!(output.overdue.len(), 1);
        assert_eq!(output.overdue[0].next_review_date, Some(date(13)));
        assert!(cmd
            .format_output(&output, &options(30))
            .contains("1 manzil review(s) overdue"));
    }

    #[test]
    fn test_today_json() {
        let temp = TempDir::new().unwrap();
        add(&temp, 1, 7, 1);
        let cmd = TodayCommand::new(Config::default(), temp.path());
        let opts = TodayOptions {
            json: true,
            ..options(1)
        };

        let json = cmd.format_output(&cmd.run(&opts), &opts);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["sabak"].as_array().unwrap().len(), 1);
        assert_eq!(parsed["date"], "2026-10-01");
    }
}
