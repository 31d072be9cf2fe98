//! CLI commands for Hifdh.
//!
//! Commands are thin: they open the engine for the project, call one
//! engine or queue operation, and format the result. They are organized
//! into:
//! - **Write commands**: add, review
//! - **Read commands**: today, upcoming, list, stats, chapters
//! - **Setup**: init

// Write commands
pub mod add;
pub mod review;

// Read commands
pub mod chapters;
pub mod list;
pub mod stats;
pub mod today;
pub mod upcoming;

// Setup
pub mod init;

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::core::{CompletionStatus, Engine, MemorizationRecord, Stage, StageKind};
use crate::error::{exit_codes, HifdhError, Result};
use crate::storage::{FileRecordStore, JsonlReviewLog};

pub use add::AddCommand;
pub use chapters::ChaptersCommand;
pub use init::InitCommand;
pub use list::ListCommand;
pub use review::ReviewCommand;
pub use stats::StatsCommand;
pub use today::TodayCommand;
pub use upcoming::UpcomingCommand;

/// The engine as used by the CLI: file records plus a JSONL review log.
pub type ProjectEngine = Engine<FileRecordStore, JsonlReviewLog>;

/// Open the engine for the project containing `cwd`.
pub fn open_engine(cwd: &Path, config: Config) -> Result<ProjectEngine> {
    Ok(Engine::new(
        FileRecordStore::for_project(cwd)?,
        JsonlReviewLog::for_project(cwd),
        config,
    ))
}

/// Exit code for a command outcome.
pub fn exit_code_for(error: Option<&HifdhError>) -> i32 {
    error.map(HifdhError::exit_code).unwrap_or(exit_codes::SUCCESS)
}

/// Record summary used in command output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordInfo {
    /// Record id.
    pub id: String,
    /// Chapter number.
    pub chapter: u16,
    /// Human-readable range, e.g. "Al-Baqarah 1-5".
    pub label: String,
    /// Verses covered.
    pub verses: u32,
    /// Current stage.
    pub stage: StageKind,
    /// Completion status.
    pub status: CompletionStatus,
    /// Latest rating.
    pub quality_rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_in_sabki: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_frequency: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_review_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_review_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl From<&MemorizationRecord> for RecordInfo {
    fn from(record: &MemorizationRecord) -> Self {
        let review_frequency = match &record.stage {
            Stage::Manzil {
                review_frequency, ..
            } => Some(*review_frequency),
            _ => None,
        };
        Self {
            id: record.id.clone(),
            chapter: record.chapter,
            label: record.label(),
            verses: record.verse_count(),
            stage: record.kind(),
            status: record.status,
            quality_rating: record.quality_rating,
            target_date: record.target_date(),
            days_in_sabki: record.days_in_sabki(),
            review_frequency,
            last_review_date: record.last_review_date(),
            next_review_date: record.next_review_date(),
            note: record.note.clone(),
        }
    }
}

impl RecordInfo {
    /// One-line description of the stage-specific state.
    pub fn detail(&self) -> String {
        match self.stage {
            StageKind::Sabak => match self.target_date {
                Some(target) => format!("target {}", target),
                None => String::new(),
            },
            StageKind::Sabki => format!("day {}", self.days_in_sabki.unwrap_or(0)),
            StageKind::Manzil => match (self.next_review_date, self.review_frequency) {
                (Some(next), Some(freq)) => format!("next {} (every {}d)", next, freq),
                _ => String::new(),
            },
        }
    }

    /// Format as a single list line.
    pub fn line(&self) -> String {
        let mut line = format!(
            "  [{}] {:<28} {:<7} {}",
            self.id,
            self.label,
            self.stage.as_str(),
            self.detail()
        );
        if self.quality_rating > 0 {
            line.push_str(&format!("  ★{}", self.quality_rating));
        }
        line
    }
}

/// Convert borrowed records into output rows.
pub fn record_infos<'a>(
    records: impl IntoIterator<Item = &'a MemorizationRecord>,
) -> Vec<RecordInfo> {
    records.into_iter().map(RecordInfo::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chapters;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn test_record_info_from_sabak() {
        let ch = chapters::chapter(2).unwrap();
        let record = MemorizationRecord::new_lesson("r0001", ch, 1, 5, date(1), date(3)).unwrap();
        let info = RecordInfo::from(&record);

        assert_eq!(info.label, "Al-Baqarah 1-5");
        assert_eq!(info.verses, 5);
        assert_eq!(info.detail(), "target 2026-03-03");
        assert!(info.line().contains("[r0001]"));
        assert!(!info.line().contains('★'));
    }

    #[test]
    fn test_record_info_from_manzil() {
        let ch = chapters::chapter(1).unwrap();
        let mut record =
            MemorizationRecord::new_lesson("r0002", ch, 1, 7, date(1), date(1)).unwrap();
        record.quality_rating = 4;
        record.stage = Stage::Manzil {
            review_frequency: 6,
            last_review_date: Some(date(2)),
            next_review_date: date(8),
        };
        let info = RecordInfo::from(&record);

        assert_eq!(info.review_frequency, Some(6));
        assert_eq!(info.detail(), "next 2026-03-08 (every 6d)");
        assert!(info.line().contains("★4"));

        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains(r#""stage":"manzil""#));
        assert!(!json.contains("target_date"));
    }

    #[test]
    fn test_exit_code_for() {
        assert_eq!(exit_code_for(None), exit_codes::SUCCESS);
        assert_eq!(
            exit_code_for(Some(&HifdhError::invalid_rating(9))),
            exit_codes::REJECTED
        );
        assert_eq!(
            exit_code_for(Some(&HifdhError::invariant("broken"))),
            exit_codes::FATAL
        );
        assert_eq!(
            exit_code_for(Some(&HifdhError::config("bad"))),
            exit_codes::FAULT
        );
    }
}
