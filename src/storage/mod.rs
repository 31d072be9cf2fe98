//! Record and review-event storage for Hifdh.
//!
//! This module provides persistence for memorization records and the
//! append-only review log, with file-based and in-memory backends.

pub mod file;
pub mod log;
pub mod memory;
pub mod traits;

pub use file::FileRecordStore;
pub use log::JsonlReviewLog;
pub use memory::{MemoryRecordStore, MemoryReviewLog};
pub use traits::{format_record_id, parse_record_id, RecordStore, ReviewLog};
