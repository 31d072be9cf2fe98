//! Stage scheduler for Hifdh.
//!
//! The scheduler is the only code that changes a record's stage, dates or
//! counters. It is a pure function of `(record, rating, today)`: it never
//! reads a clock and never touches storage. The caller persists the updated
//! record and appends the returned event.
//!
//! Transitions:
//! - sabak → sabki when the rating reaches `promotion_rating`
//! - sabki → manzil after `sabki_duration_days` with a passing average
//! - sabki → sabak after `sabki_duration_days` with a failing average
//! - manzil → sabki on a lapse (rating at or below `lapse_rating`)

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::config::ScheduleConfig;
use crate::core::event::ReviewEvent;
use crate::core::record::{add_days, CompletionStatus, MemorizationRecord, Stage, MAX_RATING};
use crate::error::{HifdhError, Result};

/// How a review changed the record's stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Stage unchanged.
    Stayed,
    /// Moved forward (sabak → sabki, sabki → manzil).
    Promoted,
    /// Moved back (manzil → sabki, sabki → sabak).
    Demoted,
}

/// Result of a successful review.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    /// The updated record.
    pub record: MemorizationRecord,
    /// The event to append to the review log.
    pub event: ReviewEvent,
    /// Stage movement caused by the review.
    pub transition: Transition,
}

/// Stage scheduler.
///
/// Borrows the schedule policy; cheap to construct per call.
#[derive(Debug, Clone, Copy)]
pub struct StageScheduler<'a> {
    config: &'a ScheduleConfig,
}

impl<'a> StageScheduler<'a> {
    /// Create a scheduler for the given policy.
    pub fn new(config: &'a ScheduleConfig) -> Self {
        Self { config }
    }

    /// Apply a review with `rating` on `today` to `record`.
    ///
    /// # Errors
    ///
    /// * `InvalidRating` if `rating` is above 5
    /// * `TemporalRegression` if `today` precedes the record's last recorded date
    /// * `StageInvariantViolation` if the result breaks a record invariant
    pub fn record_review(
        &self,
        record: &MemorizationRecord,
        rating: u8,
        today: NaiveDate,
    ) -> Result<ReviewOutcome> {
        if rating > MAX_RATING {
            return Err(HifdhError::invalid_rating(rating));
        }
        if today < record.last_recorded {
            return Err(HifdhError::temporal_regression(
                &record.id,
                today,
                record.last_recorded,
            ));
        }

        let from = record.kind();
        let mut updated = record.clone();
        updated.quality_rating = rating;
        updated.last_recorded = today;

        match &record.stage {
            Stage::Sabak { .. } => self.review_sabak(&mut updated, rating, today),
            Stage::Sabki {
                entered_on,
                review_count,
                rating_total,
                ..
            } => self.review_sabki(
                &mut updated,
                rating,
                today,
                *entered_on,
                *review_count,
                *rating_total,
            )?,
            Stage::Manzil {
                review_frequency, ..
            } => self.review_manzil(&mut updated, rating, today, *review_frequency)?,
        }

        updated.check_invariants(self.config)?;

        let to = updated.kind();
        let transition = match to.cmp(&from) {
            std::cmp::Ordering::Greater => Transition::Promoted,
            std::cmp::Ordering::Less => Transition::Demoted,
            std::cmp::Ordering::Equal => Transition::Stayed,
        };

        match transition {
            Transition::Stayed => debug!(
                record_id = %updated.id,
                stage = %to,
                rating,
                "review recorded"
            ),
            _ => info!(
                record_id = %updated.id,
                from = %from,
                to = %to,
                rating,
                "stage changed"
            ),
        }

        let event = ReviewEvent::new(&updated, rating, from, today);
        Ok(ReviewOutcome {
            record: updated,
            event,
            transition,
        })
    }

    fn review_sabak(&self, record: &mut MemorizationRecord, rating: u8, today: NaiveDate) {
        record.status = CompletionStatus::InProgress;
        if rating >= self.config.promotion_rating {
            record.stage = Self::fresh_sabki(today);
        }
    }

    fn review_sabki(
        &self,
        record: &mut MemorizationRecord,
        rating: u8,
        today: NaiveDate,
        entered_on: NaiveDate,
        review_count: u32,
        rating_total: u32,
    ) -> Result<()> {
        let review_count = review_count + 1;
        let rating_total = rating_total + rating as u32;
        let days_in_sabki = (today - entered_on).num_days().max(1) as u32;

        if days_in_sabki < self.config.sabki_duration_days {
            record.stage = Stage::Sabki {
                entered_on,
                last_review_date: Some(today),
                days_in_sabki,
                review_count,
                rating_total,
            };
            return Ok(());
        }

        let average = rating_total as f64 / review_count as f64;
        if average >= self.config.sabki_pass_average {
            let review_frequency = self.config.manzil_baseline_days;
            record.stage = Stage::Manzil {
                review_frequency,
                last_review_date: Some(today),
                next_review_date: add_days(today, review_frequency)?,
            };
            record.status = CompletionStatus::Completed;
        } else {
            record.stage = Stage::Sabak {
                target_date: add_days(today, 1)?,
            };
            record.status = CompletionStatus::InProgress;
        }
        debug!(
            record_id = %record.id,
            days_in_sabki,
            average,
            "sabki window closed"
        );
        Ok(())
    }

    fn review_manzil(
        &self,
        record: &mut MemorizationRecord,
        rating: u8,
        today: NaiveDate,
        review_frequency: u32,
    ) -> Result<()> {
        let review_frequency = self.adjust_interval(review_frequency, rating);

        if rating <= self.config.lapse_rating {
            record.stage = Self::fresh_sabki(today);
            record.status = CompletionStatus::InProgress;
            return Ok(());
        }

        record.stage = Stage::Manzil {
            review_frequency,
            last_review_date: Some(today),
            next_review_date: add_days(today, review_frequency)?,
        };
        Ok(())
    }

    /// Compute the next manzil interval for a rating.
    ///
    /// Strong ratings multiply the interval by `growth_factor` (floored),
    /// middling ratings keep it, weak ratings halve it. The result is
    /// clamped to the configured bounds.
    pub fn adjust_interval(&self, current: u32, rating: u8) -> u32 {
        let c = self.config;
        let next = if rating >= c.growth_rating {
            (current as f64 * c.growth_factor).floor() as u32
        } else if rating > c.shrink_rating {
            current
        } else {
            current / 2
        };
        next.clamp(c.manzil_min_days, c.manzil_max_days)
    }

    fn fresh_sabki(today: NaiveDate) -> Stage {
        Stage::Sabki {
            entered_on: today,
            last_review_date: Some(today),
            days_in_sabki: 1,
            review_count: 0,
            rating_total: 0,
        }
    }
}
