//! Review command for Hifdh.
//!
//! Records a quality rating for one record and reports the stage change.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cli::{exit_code_for, open_engine, RecordInfo};
use crate::config::Config;
use crate::core::{StageKind, Transition};
use crate::error::HifdhError;

/// Options for the review command.
#[derive(Debug, Clone)]
pub struct ReviewOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Record to review.
    pub record_id: String,
    /// Quality rating, 0..=5.
    pub rating: u8,
    /// Day of the review.
    pub today: NaiveDate,
}

/// Output format for the review command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewOutput {
    /// Whether the review was recorded.
    pub success: bool,
    /// The updated record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<RecordInfo>,
    /// Stage before the review.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_stage: Option<StageKind>,
    /// "stayed", "promoted" or "demoted".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<String>,
    /// Error message if the review was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Process exit code.
    #[serde(skip)]
    pub exit_code: i32,
}

impl ReviewOutput {
    /// Create a successful output.
    pub fn success(record: RecordInfo, from_stage: StageKind, transition: Transition) -> Self {
        let transition = match transition {
            Transition::Stayed => "stayed",
            Transition::Promoted => "promoted",
            Transition::Demoted => "demoted",
        };
        Self {
            success: true,
            record: Some(record),
            from_stage: Some(from_stage),
            transition: Some(transition.to_string()),
            error: None,
            exit_code: exit_code_for(None),
        }
    }

    /// Create a failed output.
    pub fn failure(error: &HifdhError) -> Self {
        Self {
            success: false,
            record: None,
            from_stage: None,
            transition: None,
            error: Some(error.to_string()),
            exit_code: exit_code_for(Some(error)),
        }
    }
}

/// The review command implementation.
pub struct ReviewCommand {
    config: Config,
    cwd: PathBuf,
}

impl ReviewCommand {
    /// Create a new review command.
    pub fn new(config: Config, cwd: impl AsRef<Path>) -> Self {
        Self {
            config,
            cwd: cwd.as_ref().to_path_buf(),
        }
    }

    /// Run the review command.
    pub fn run(&self, options: &ReviewOptions) -> ReviewOutput {
        let engine = match open_engine(&self.cwd, self.config.clone()) {
            Ok(engine) => engine,
            Err(e) => return ReviewOutput::failure(&e),
        };

        match engine.record_review(&options.record_id, options.rating, options.today) {
            Ok(outcome) => ReviewOutput::success(
                RecordInfo::from(&outcome.record),
                outcome.event.from_stage,
                outcome.transition,
            ),
            Err(e) => ReviewOutput::failure(&e),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ReviewOutput, options: &ReviewOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        let Some(record) = &output.record else {
            return format!(
                "Review failed: {}",
                output.error.as_deref().unwrap_or("unknown error")
            );
        };

        let mut lines = vec![format!(
            "Reviewed {} [{}] with rating {}",
            record.label, record.id, record.quality_rating
        )];
        match (output.transition.as_deref(), output.from_stage) {
            (Some("stayed"), _) | (_, None) => {
                lines.push(format!("  Stays in {}: {}", record.stage.display_name(), record.detail()))
            }
            (_, Some(from)) => lines.push(format!(
                "  {} → {}: {}",
                from.display_name(),
                record.stage.display_name(),
                record.detail()
            )),
        }
        lines.join("\n")
    }
}
