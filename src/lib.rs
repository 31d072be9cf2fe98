//! Hifdh - Quran memorization tracker
//!
//! Hifdh schedules memorized portions through the three classical stages:
//! sabak (new lesson), sabki (recent revision) and manzil (long-term
//! revision on an adaptive interval). Records live as JSON files in the
//! project's `.hifdh/` directory, every review is appended to a JSONL log,
//! and progress statistics are derived from both.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod stats;
pub mod storage;

pub use config::Config;
pub use core::{
    CompletionStatus, Engine, MemorizationRecord, NewLesson, ReviewEvent, ReviewOutcome,
    Snapshot, Stage, StageKind, StageScheduler, Transition,
};
pub use error::{HifdhError, Result};
pub use stats::{StatsAggregator, StatsCache, StatsCacheManager, StatsSnapshot};
pub use storage::{
    FileRecordStore, JsonlReviewLog, MemoryRecordStore, MemoryReviewLog, RecordStore, ReviewLog,
};

// CLI commands
pub use cli::{
    AddCommand, ChaptersCommand, InitCommand, ListCommand, ReviewCommand, StatsCommand,
    TodayCommand, UpcomingCommand,
};
