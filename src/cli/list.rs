//! List command for Hifdh.
//!
//! Lists memorization records, optionally filtered by stage.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cli::{exit_code_for, open_engine, record_infos, RecordInfo};
use crate::config::Config;
use crate::core::StageKind;
use crate::error::HifdhError;
use crate::storage::RecordStore;

/// Options for the list command.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Only show records in this stage.
    pub stage: Option<StageKind>,
}

/// Output format for the list command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListOutput {
    /// Whether the records were read.
    pub success: bool,
    /// Matching records, in id order.
    pub records: Vec<RecordInfo>,
    /// Verses covered by the matching records.
    pub total_verses: u32,
    /// Error message if listing failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Process exit code.
    #[serde(skip)]
    pub exit_code: i32,
}

impl ListOutput {
    /// Create a successful output.
    pub fn success(records: Vec<RecordInfo>) -> Self {
        let total_verses = records.iter().map(|r| r.verses).sum();
        Self {
            success: true,
            records,
            total_verses,
            error: None,
            exit_code: exit_code_for(None),
        }
    }

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

/// The list command implementation.
pub struct ListCommand {
    config: Config,
    cwd: PathBuf,
}

impl ListCommand {
    /// Create a new list command.
    pub fn new(config: Config, cwd: impl AsRef<Path>) -> Self {
        Self {
            config,
            cwd: cwd.as_ref().to_path_buf(),
        }
    }

    /// Run the list command.
    pub fn run(&self, options: &ListOptions) -> ListOutput {
        let records = match open_engine(&self.cwd, self.config.clone())
            .and_then(|engine| engine.store().list())
        {
            Ok(records) => records,
            Err(e) => return ListOutput::failure(&e),
        };

        let filtered = records
            .iter()
            .filter(|r| options.stage.is_none_or(|stage| r.kind() == stage));
        ListOutput::success(record_infos(filtered))
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ListOutput, options: &ListOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        if !output.success {
            return format!(
                "Failed to list records: {}",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        if output.records.is_empty() {
            return match options.stage {
                Some(stage) => format!("No {} records.", stage.as_str()),
                None => "No records. Add a lesson with `hifdh add`.".to_string(),
            };
        }

        let mut lines: Vec<String> = output.records.iter().map(RecordInfo::line).collect();
        lines.push(String::new());
        lines.push(format!(
            "{} record(s), {} verses",
            output.records.len(),
            output.total_verses
        ));
        lines.join("\n")
    }
}
