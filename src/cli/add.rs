//! Add command for Hifdh.
//!
//! Creates a new sabak lesson.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cli::{exit_code_for, open_engine, RecordInfo};
use crate::config::Config;
use crate::core::NewLesson;
use crate::error::HifdhError;

/// Options for the add command.
#[derive(Debug, Clone)]
pub struct AddOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Chapter number.
    pub chapter: u16,
    /// First verse.
    pub start_verse: u16,
    /// Last verse (inclusive).
    pub end_verse: u16,
    /// Day the lesson is created.
    pub today: NaiveDate,
    /// Target completion date; defaults to `today`.
    pub target: Option<NaiveDate>,
    /// Optional note.
    pub note: Option<String>,
}

/// Output format for the add command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddOutput {
    /// Whether the lesson was created.
    pub success: bool,
    /// The created record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<RecordInfo>,
    /// Error message if creation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Process exit code.
    #[serde(skip)]
    pub exit_code: i32,
}

impl AddOutput {
    /// Create a successful output.
    pub fn success(record: RecordInfo) -> Self {
        Self {
            success: true,
            record: Some(record),
            error: None,
            exit_code: exit_code_for(None),
        }
    }

    /// Create a failed output.
    pub fn failure(error: &HifdhError) -> Self {
        Self {
            success: false,
            record: None,
            error: Some(error.to_string()),
            exit_code: exit_code_for(Some(error)),
        }
    }
}

/// The add command implementation.
pub struct AddCommand {
    config: Config,
    cwd: PathBuf,
}

impl AddCommand {
    /// Create a new add command.
    pub fn new(config: Config, cwd: impl AsRef<Path>) -> Self {
        Self {
            config,
            cwd: cwd.as_ref().to_path_buf(),
        }
    }

    /// Run the add command.
    pub fn run(&self, options: &AddOptions) -> AddOutput {
        let engine = match open_engine(&self.cwd, self.config.clone()) {
            Ok(engine) => engine,
            Err(e) => return AddOutput::failure(&e),
        };

        let mut lesson = NewLesson::new(
            options.chapter,
            options.start_verse,
            options.end_verse,
            options.today,
            options.target.unwrap_or(options.today),
        );
        if let Some(note) = &options.note {
            lesson = lesson.with_note(note.clone());
        }

        match engine.create_lesson(lesson) {
            Ok(record) => AddOutput::success(RecordInfo::from(&record)),
            Err(e) => AddOutput::failure(&e),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &AddOutput, options: &AddOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        match (&output.record, &output.error) {
            (Some(record), _) => format!(
                "Added {} [{}] ({} verses), target {}",
                record.label,
                record.id,
                record.verses,
                record
                    .target_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string())
            ),
            (None, error) => format!(
                "Add failed: {}",
                error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}
