//! Memorization record types.
//!
//! A record covers one contiguous verse range of a chapter. Its stage is a
//! tagged variant carrying only the fields that stage needs, so the
//! scheduler can match on it exhaustively.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::ScheduleConfig;
use crate::core::chapters::Chapter;
use crate::error::{HifdhError, Result};

/// Schema version for record serialization.
///
/// Increment when the schema changes in a breaking way.
pub const RECORD_SCHEMA_VERSION: u8 = 1;

/// Highest valid quality rating.
pub const MAX_RATING: u8 = 5;

/// A memorized (or in-progress) verse range and its scheduling state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemorizationRecord {
    /// Store-assigned identifier.
    pub id: String,
    /// Schema version for forward compatibility.
    pub schema_version: u8,
    /// Chapter number (1..=114).
    pub chapter: u16,
    /// Chapter name.
    pub chapter_name: String,
    /// First verse of the range.
    pub start_verse: u16,
    /// Last verse of the range (inclusive).
    pub end_verse: u16,
    /// When the lesson was created.
    pub created_on: NaiveDate,
    /// Most recent quality rating (0 = not yet rated).
    pub quality_rating: u8,
    /// Free-text note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Completion status.
    pub status: CompletionStatus,
    /// Latest date the record was touched. Reviews may not go before it.
    pub last_recorded: NaiveDate,
    /// Current stage and its fields.
    pub stage: Stage,
}

/// Completion status of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompletionStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl CompletionStatus {
    /// Get the display name for this status.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }
}

/// The stage a record is in, with stage-specific fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stage {
    /// New lesson awaiting its first passing review.
    Sabak {
        /// Date the lesson should be memorized by.
        target_date: NaiveDate,
    },
    /// Daily reinforcement window.
    Sabki {
        /// Date the record entered sabki.
        entered_on: NaiveDate,
        /// Last review in this stage.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        last_review_date: Option<NaiveDate>,
        /// Whole days spent in this stage (at least 1).
        days_in_sabki: u32,
        /// Reviews completed in this stage.
        review_count: u32,
        /// Sum of the ratings of those reviews.
        #[serde(default)]
        rating_total: u32,
    },
    /// Long-term spaced review.
    Manzil {
        /// Interval between reviews, in days.
        review_frequency: u32,
        /// Last review in this stage.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        last_review_date: Option<NaiveDate>,
        /// Next scheduled review.
        next_review_date: NaiveDate,
    },
}

/// Stage discriminant without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Sabak,
    Sabki,
    Manzil,
}

impl StageKind {
    /// Lowercase name used in JSON and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sabak => "sabak",
            Self::Sabki => "sabki",
            Self::Manzil => "manzil",
        }
    }

    /// Get the display name for this stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Sabak => "Sabak",
            Self::Sabki => "Sabki",
            Self::Manzil => "Manzil",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StageKind {
    type Err = HifdhError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sabak" => Ok(Self::Sabak),
            "sabki" => Ok(Self::Sabki),
            "manzil" => Ok(Self::Manzil),
            other => Err(HifdhError::config(format!("unknown stage '{}'", other))),
        }
    }
}

impl Stage {
    /// The stage discriminant.
    pub fn kind(&self) -> StageKind {
        match self {
            Self::Sabak { .. } => StageKind::Sabak,
            Self::Sabki { .. } => StageKind::Sabki,
            Self::Manzil { .. } => StageKind::Manzil,
        }
    }
}

impl MemorizationRecord {
    /// Create a new sabak lesson.
    ///
    /// The verse range must already be validated against `chapter`.
    /// Fails with `TemporalRegression` if the target precedes creation.
    pub fn new_lesson(
        id: impl Into<String>,
        chapter: Chapter,
        start_verse: u16,
        end_verse: u16,
        created_on: NaiveDate,
        target_date: NaiveDate,
    ) -> Result<Self> {
        let id = id.into();
        if target_date < created_on {
            return Err(HifdhError::temporal_regression(id, target_date, created_on));
        }

        Ok(Self {
            id,
            schema_version: RECORD_SCHEMA_VERSION,
            chapter: chapter.number,
            chapter_name: chapter.name.to_string(),
            start_verse,
            end_verse,
            created_on,
            quality_rating: 0,
            note: None,
            status: CompletionStatus::NotStarted,
            last_recorded: created_on,
            stage: Stage::Sabak { target_date },
        })
    }

    /// Attach a note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// The current stage discriminant.
    pub fn kind(&self) -> StageKind {
        self.stage.kind()
    }

    /// Number of verses covered by the range.
    pub fn verse_count(&self) -> u32 {
        (self.end_verse as u32 + 1).saturating_sub(self.start_verse as u32)
    }

    /// Last review date, if the current stage tracks one.
    pub fn last_review_date(&self) -> Option<NaiveDate> {
        match &self.stage {
            Stage::Sabak { .. } => None,
            Stage::Sabki {
                last_review_date, ..
            }
            | Stage::Manzil {
                last_review_date, ..
            } => *last_review_date,
        }
    }

    /// Next manzil review date, if in manzil.
    pub fn next_review_date(&self) -> Option<NaiveDate> {
        match &self.stage {
            Stage::Manzil {
                next_review_date, ..
            } => Some(*next_review_date),
            _ => None,
        }
    }

    /// Target date, if in sabak.
    pub fn target_date(&self) -> Option<NaiveDate> {
        match &self.stage {
            Stage::Sabak { target_date } => Some(*target_date),
            _ => None,
        }
    }

    /// Days spent in sabki, if in sabki.
    pub fn days_in_sabki(&self) -> Option<u32> {
        match &self.stage {
            Stage::Sabki { days_in_sabki, .. } => Some(*days_in_sabki),
            _ => None,
        }
    }

    /// Human-readable label, e.g. "Al-Baqarah 1-5".
    pub fn label(&self) -> String {
        format!(
            "{} {}-{}",
            self.chapter_name, self.start_verse, self.end_verse
        )
    }

    /// Verify the record's structural and stage invariants.
    ///
    /// Returns `StageInvariantViolation` on the first broken invariant.
    pub fn check_invariants(&self, config: &ScheduleConfig) -> Result<()> {
        let fail = |msg: String| Err(HifdhError::invariant(format!("record {}: {}", self.id, msg)));

        if self.start_verse == 0 || self.start_verse > self.end_verse {
            return fail(format!(
                "verse range {}-{} is invalid",
                self.start_verse, self.end_verse
            ));
        }
        if self.quality_rating > MAX_RATING {
            return fail(format!("rating {} above {}", self.quality_rating, MAX_RATING));
        }
        if self.last_recorded < self.created_on {
            return fail(format!(
                "last recorded {} precedes creation {}",
                self.last_recorded, self.created_on
            ));
        }

        match &self.stage {
            Stage::Sabak { target_date } => {
                if *target_date < self.created_on {
                    return fail(format!(
                        "sabak target {} precedes creation {}",
                        target_date, self.created_on
                    ));
                }
                if self.status == CompletionStatus::Completed {
                    return fail("sabak record marked completed".to_string());
                }
            }
            Stage::Sabki {
                days_in_sabki,
                review_count,
                rating_total,
                ..
            } => {
                if *days_in_sabki == 0 || *days_in_sabki > config.sabki_duration_days {
                    return fail(format!(
                        "days in sabki {} outside 1..={}",
                        days_in_sabki, config.sabki_duration_days
                    ));
                }
                if *rating_total > review_count * MAX_RATING as u32 {
                    return fail(format!(
                        "rating total {} too large for {} reviews",
                        rating_total, review_count
                    ));
                }
            }
            Stage::Manzil {
                review_frequency,
                last_review_date,
                next_review_date,
            } => {
                if *review_frequency < config.manzil_min_days
                    || *review_frequency > config.manzil_max_days
                {
                    return fail(format!(
                        "manzil interval {} outside {}..={}",
                        review_frequency, config.manzil_min_days, config.manzil_max_days
                    ));
                }
                let anchor = last_review_date.unwrap_or(self.created_on);
                let expected = add_days(anchor, *review_frequency)?;
                if *next_review_date != expected {
                    return fail(format!(
                        "next review {} is not {} + {} days",
                        next_review_date, anchor, review_frequency
                    ));
                }
            }
        }

        Ok(())
    }
}

impl fmt::Display for MemorizationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.id, self.label(), self.kind())
    }
}

/// Add whole days to a date.
///
/// Overflow past chrono's calendar range is reported as an invariant
/// violation since no real schedule reaches it.
pub fn add_days(date: NaiveDate, days: u32) -> Result<NaiveDate> {
    date.checked_add_days(chrono::Days::new(days as u64))
        .ok_or_else(|| HifdhError::invariant(format!("date overflow adding {} days to {}", days, date)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chapters;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lesson() -> MemorizationRecord {
        let ch = chapters::chapter(2).unwrap();
        MemorizationRecord::new_lesson("r0001", ch, 1, 5, date(2026, 3, 1), date(2026, 3, 2))
            .unwrap()
    }

    #[test]
    fn test_new_lesson_defaults() {
        let record = lesson();
        assert_eq!(record.chapter, 2);
        assert_eq!(record.chapter_name, "Al-Baqarah");
        assert_eq!(record.kind(), StageKind::Sabak);
        assert_eq!(record.status, CompletionStatus::NotStarted);
        assert_eq!(record.quality_rating, 0);
        assert_eq!(record.last_recorded, date(2026, 3, 1));
        assert_eq!(record.target_date(), Some(date(2026, 3, 2)));
        assert_eq!(record.verse_count(), 5);
        assert!(record.check_invariants(&ScheduleConfig::default()).is_ok());
    }

    #[test]
    fn test_new_lesson_rejects_target_before_creation() {
        let ch = chapters::chapter(2).unwrap();
        let err =
            MemorizationRecord::new_lesson("r0001", ch, 1, 5, date(2026, 3, 5), date(2026, 3, 4))
                .unwrap_err();
        assert!(matches!(err, HifdhError::TemporalRegression { .. }));
    }

    #[test]
    fn test_label_and_display() {
        let record = lesson();
        assert_eq!(record.label(), "Al-Baqarah 1-5");
        assert_eq!(record.to_string(), "[r0001] Al-Baqarah 1-5 (sabak)");
    }

    #[test]
    fn test_with_note() {
        let record = lesson().with_note("Focus on verse 3 pronunciation");
        assert_eq!(
            record.note.as_deref(),
            Some("Focus on verse 3 pronunciation")
        );
    }

    #[test]
    fn test_manzil_invariant_checks_next_date() {
        let mut record = lesson();
        record.status = CompletionStatus::Completed;
        record.stage = Stage::Manzil {
            review_frequency: 5,
            last_review_date: Some(date(2026, 3, 10)),
            next_review_date: date(2026, 3, 15),
        };
        assert!(record.check_invariants(&ScheduleConfig::default()).is_ok());

        record.stage = Stage::Manzil {
            review_frequency: 5,
            last_review_date: Some(date(2026, 3, 10)),
            next_review_date: date(2026, 3, 16),
        };
        let err = record
            .check_invariants(&ScheduleConfig::default())
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_manzil_without_review_anchors_on_creation() {
        let mut record = lesson();
        record.stage = Stage::Manzil {
            review_frequency: 7,
            last_review_date: None,
            next_review_date: date(2026, 3, 8),
        };
        assert!(record.check_invariants(&ScheduleConfig::default()).is_ok());
    }

    #[test]
    fn test_manzil_interval_bounds() {
        let mut record = lesson();
        record.stage = Stage::Manzil {
            review_frequency: 31,
            last_review_date: Some(date(2026, 3, 1)),
            next_review_date: date(2026, 4, 1),
        };
        assert!(record
            .check_invariants(&ScheduleConfig::default())
            .is_err());
    }

    #[test]
    fn test_sabki_days_bounds() {
        let mut record = lesson();
        record.stage = Stage::Sabki {
            entered_on: date(2026, 3, 1),
            last_review_date: None,
            days_in_sabki: 0,
            review_count: 0,
            rating_total: 0,
        };
        assert!(record
            .check_invariants(&ScheduleConfig::default())
            .is_err());

        record.stage = Stage::Sabki {
            entered_on: date(2026, 3, 1),
            last_review_date: None,
            days_in_sabki: 8,
            review_count: 0,
            rating_total: 0,
        };
        assert!(record
            .check_invariants(&ScheduleConfig::default())
            .is_err());
    }

    #[test]
    fn test_stage_serialization_is_tagged() {
        let record = lesson();
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(r#""kind":"sabak""#));
        assert!(json.contains(r#""status":"not-started""#));
        assert!(!json.contains("note"));

        let parsed: MemorizationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_stage_kind_from_str() {
        assert_eq!("sabak".parse::<StageKind>().unwrap(), StageKind::Sabak);
        assert_eq!("Manzil".parse::<StageKind>().unwrap(), StageKind::Manzil);
        assert!("hifz".parse::<StageKind>().is_err());
    }

    #[test]
    fn test_add_days() {
        assert_eq!(add_days(date(2026, 2, 27), 2).unwrap(), date(2026, 3, 1));
        assert!(add_days(NaiveDate::MAX, 1).is_err());
    }
}
