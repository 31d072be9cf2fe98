//! Chapters command for Hifdh.
//!
//! Prints the chapter table used for range validation.

use serde::{Deserialize, Serialize};

use crate::core::chapters::{self, Chapter};
use crate::core::{CHAPTER_COUNT, TOTAL_VERSES};
use crate::error::{exit_codes, HifdhError};

/// Options for the chapters command.
#[derive(Debug, Clone, Default)]
pub struct ChaptersOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Show a single chapter.
    pub chapter: Option<u16>,
}

/// Output format for the chapters command.
#[derive(Debug, Clone, Serialize)]
pub struct ChaptersOutput {
    /// Whether the lookup succeeded.
    pub success: bool,
    /// Matching chapters.
    pub chapters: Vec<Chapter>,
    /// Verses across the matching chapters.
    pub total_verses: u32,
    /// Error message if the chapter was not found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Process exit code.
    #[serde(skip)]
    pub exit_code: i32,
}

/// The chapters command implementation.
#[derive(Debug, Default)]
pub struct ChaptersCommand;

impl ChaptersCommand {
    /// Create a new chapters command.
    pub fn new() -> Self {
        Self
    }

    /// Run the chapters command.
    pub fn run(&self, options: &ChaptersOptions) -> ChaptersOutput {
        let found: Vec<Chapter> = match options.chapter {
            Some(number) => match chapters::chapter(number) {
                Some(ch) => vec![ch],
                None => {
                    let err = HifdhError::invalid_range(
                        number,
                        0,
                        0,
                        format!("chapter must be between 1 and {}", CHAPTER_COUNT),
                    );
                    return ChaptersOutput {
                        success: false,
                        chapters: Vec::new(),
                        total_verses: 0,
                        error: Some(err.to_string()),
                        exit_code: err.exit_code(),
                    };
                }
            },
            None => chapters::all().collect(),
        };

        let total_verses = match options.chapter {
            Some(_) => found.iter().map(|c| c.verses as u32).sum(),
            None => TOTAL_VERSES,
        };

        ChaptersOutput {
            success: true,
            chapters: found,
            total_verses,
            error: None,
            exit_code: exit_codes::SUCCESS,
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ChaptersOutput, options: &ChaptersOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        if let Some(error) = &output.error {
            return format!("Lookup failed: {}", error);
        }

        let mut lines: Vec<String> = output
            .chapters
            .iter()
            .map(|c| format!("{:>4}  {:<24} {:>4}", c.number, c.name, c.verses))
            .collect();
        if output.chapters.len() > 1 {
            lines.push(format!(
                "{} chapters, {} verses",
                output.chapters.len(),
                output.total_verses
            ));
        }
        lines.join("\n")
    }
}
