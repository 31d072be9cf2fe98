//! Core types and logic for Hifdh.
//!
//! This module contains the memorization record model, the stage
//! scheduler, the review queue, and the engine that ties them to storage.

pub mod chapters;
pub mod engine;
pub mod event;
pub mod juz;
pub mod queue;
pub mod record;
pub mod scheduler;

pub use chapters::{Chapter, CHAPTER_COUNT, TOTAL_VERSES};
pub use engine::{Engine, NewLesson, Snapshot};
pub use event::{ReviewEvent, EVENT_SCHEMA_VERSION};
pub use juz::{Juz, JUZ_COUNT};
pub use queue::{due_today, overdue, upcoming, DueToday, Upcoming};
pub use record::{
    CompletionStatus, MemorizationRecord, Stage, StageKind, MAX_RATING, RECORD_SCHEMA_VERSION,
};
pub use scheduler::{ReviewOutcome, StageScheduler, Transition};
