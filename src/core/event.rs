//! Review events.
//!
//! One event is produced per successful review. Events are append-only and
//! are the source of truth for streaks, pace and quality averages.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::record::{MemorizationRecord, StageKind};

/// Schema version for review events.
///
/// Increment when the event schema changes in a breaking way.
pub const EVENT_SCHEMA_VERSION: u8 = 1;

/// A single review, as written to the review log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewEvent {
    /// Schema version for forward compatibility.
    pub v: u8,
    /// Day the review was recorded for.
    pub date: NaiveDate,
    /// The reviewed record.
    pub record_id: String,
    /// Reported quality rating.
    pub rating: u8,
    /// Stage before the review.
    pub from_stage: StageKind,
    /// Stage after the review.
    pub stage: StageKind,
    /// Verses covered by the record.
    pub verses: u32,
}

impl ReviewEvent {
    /// Build the event for a review that produced `updated` from a record in `from_stage`.
    pub fn new(
        updated: &MemorizationRecord,
        rating: u8,
        from_stage: StageKind,
        date: NaiveDate,
    ) -> Self {
        Self {
            v: EVENT_SCHEMA_VERSION,
            date,
            record_id: updated.id.clone(),
            rating,
            from_stage,
            stage: updated.kind(),
            verses: updated.verse_count(),
        }
    }

    /// Whether this review moved the record into manzil (completed).
    pub fn completes_record(&self) -> bool {
        self.from_stage != StageKind::Manzil && self.stage == StageKind::Manzil
    }

    /// Whether this review moved the record to an earlier stage.
    pub fn is_demotion(&self) -> bool {
        self.stage < self.from_stage
    }

    /// Whether the rating counts towards quality averages (0 = not assessed).
    pub fn is_rated(&self) -> bool {
        self.rating > 0
    }
}
