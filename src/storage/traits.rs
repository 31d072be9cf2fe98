//! Storage traits for Hifdh.
//!
//! `RecordStore` holds one record per id. `ReviewLog` is the append-only
//! event history. Neither contains scheduling logic.

use std::sync::Arc;

use crate::core::{MemorizationRecord, ReviewEvent};
use crate::error::{HifdhError, Result};

/// Prefix of store-assigned record ids.
pub const RECORD_ID_PREFIX: char = 'r';

/// Format a numeric sequence as a record id (`r0001`).
pub fn format_record_id(seq: u32) -> String {
    format!("{}{:04}", RECORD_ID_PREFIX, seq)
}

/// Parse the sequence number out of a record id.
///
/// Returns `None` for ids not produced by `format_record_id`.
pub fn parse_record_id(id: &str) -> Option<u32> {
    id.strip_prefix(RECORD_ID_PREFIX)?.parse().ok()
}

/// The id following the highest existing sequence number.
pub(crate) fn id_after(highest: Option<u32>) -> Result<String> {
    let highest = highest.unwrap_or(0);
    let next = highest.checked_add(1).ok_or_else(|| {
        HifdhError::invariant(format!("record id sequence exhausted after {}", highest))
    })?;
    Ok(format_record_id(next))
}

/// Sort records by their id sequence, falling back to the raw id.
pub(crate) fn sort_by_id(records: &mut [MemorizationRecord]) {
    records.sort_by(|a, b| {
        (parse_record_id(&a.id), &a.id).cmp(&(parse_record_id(&b.id), &b.id))
    });
}

/// Trait for record storage backends.
///
/// Implementations provide CRUD over memorization records. Records are
/// never deleted by the engine, so there is no delete operation.
pub trait RecordStore: Send + Sync {
    /// Retrieve a record by id.
    ///
    /// Returns `Ok(None)` if the record doesn't exist.
    fn get(&self, id: &str) -> Result<Option<MemorizationRecord>>;

    /// Save a record.
    ///
    /// Creates a new record or replaces an existing one.
    fn put(&self, record: &MemorizationRecord) -> Result<()>;

    /// Save a record under an id that must not be taken yet.
    ///
    /// Fails with `DuplicateRecord` and leaves the stored record untouched
    /// if the id exists, including when another writer claims it first.
    fn insert(&self, record: &MemorizationRecord) -> Result<()>;

    /// List all records, ordered by id.
    fn list(&self) -> Result<Vec<MemorizationRecord>>;

    /// Get the next unused record id.
    ///
    /// The id is not reserved. Callers claim it with `insert` and ask again
    /// when another writer got there first.
    ///
    /// Fails with `StageInvariantViolation` when the id sequence is exhausted.
    fn next_id(&self) -> Result<String>;

    /// Check if a record exists.
    fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.get(id)?.is_some())
    }
}

/// Trait for review event logs.
///
/// Appends must be durable once `append` returns. Events are never
/// rewritten.
pub trait ReviewLog: Send + Sync {
    /// Append one event.
    fn append(&self, event: &ReviewEvent) -> Result<()>;

    /// Read every event in append order.
    fn read_all(&self) -> Result<Vec<ReviewEvent>>;

    /// Count the events in the log.
    fn count(&self) -> Result<usize> {
        Ok(self.read_all()?.len())
    }
}

/// Blanket implementation of RecordStore for Arc-wrapped stores.
///
/// Lets tests keep a handle to a store after moving it into an engine.
impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    fn get(&self, id: &str) -> Result<Option<MemorizationRecord>> {
        (**self).get(id)
    }

    fn put(&self, record: &MemorizationRecord) -> Result<()> {
        (**self).put(record)
    }

    fn insert(&self, record: &MemorizationRecord) -> Result<()> {
        (**self).insert(record)
    }

    fn list(&self) -> Result<Vec<MemorizationRecord>> {
        (**self).list()
    }

    fn next_id(&self) -> Result<String> {
        (**self).next_id()
    }

    fn exists(&self, id: &str) -> Result<bool> {
        (**self).exists(id)
    }
}

impl<T: ReviewLog + ?Sized> ReviewLog for Arc<T> {
    fn append(&self, event: &ReviewEvent) -> Result<()> {
        (**self).append(event)
    }

    fn read_all(&self) -> Result<Vec<ReviewEvent>> {
        (**self).read_all()
    }

    fn count(&self) -> Result<usize> {
        (**self).count()
    }
}

/// Test utilities for storage implementations.
#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::core::{chapters, StageKind};
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, d).unwrap()
    }

    /// Build a sabak record with the given id.
    pub fn sample_record(id: &str) -> MemorizationRecord {
        let ch = chapters::chapter(36).unwrap();
        MemorizationRecord::new_lesson(id, ch, 1, 12, date(1), date(3)).unwrap()
    }

    /// Build a review event for the given record id.
    pub fn sample_event(record_id: &str, day: u32, rating: u8) -> ReviewEvent {
        ReviewEvent {
            v: crate::core::EVENT_SCHEMA_VERSION,
            date: date(day),
            record_id: record_id.to_string(),
            rating,
            from_stage: StageKind::Sabak,
            stage: StageKind::Sabki,
            verses: 12,
        }
    }

    /// Test helper to verify RecordStore implementations.
    pub fn test_record_store_crud<S: RecordStore>(store: &S) {
        let first = store.next_id().unwrap();
        assert_eq!(first, "r0001");

        let record = sample_record(&first);

        // Initially should not exist
        assert!(!store.exists(&record.id).unwrap());
        assert!(store.get(&record.id).unwrap().is_none());

        store.put(&record).unwrap();
        assert!(store.exists(&record.id).unwrap());

        let retrieved = store.get(&record.id).unwrap().unwrap();
        assert_eq!(retrieved, record);

        // Ids keep advancing past stored records
        let second = store.next_id().unwrap();
        assert_eq!(second, "r0002");
        store.insert(&sample_record(&second)).unwrap();

        // Inserting over a taken id fails and keeps the stored record
        let mut clash = sample_record(&second);
        clash.note = Some("second writer".to_string());
        let err = store.insert(&clash).unwrap_err();
        assert!(matches!(err, HifdhError::DuplicateRecord { .. }));
        assert!(store.get(&second).unwrap().unwrap().note.is_none());

        // Updates replace in place
        let mut updated = record.clone();
        updated.quality_rating = 4;
        store.put(&updated).unwrap();
        assert_eq!(store.get(&record.id).unwrap().unwrap().quality_rating, 4);

        let all = store.list().unwrap();
        let ids: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r0001", "r0002"]);
    }

    /// Test helper to verify ReviewLog implementations.
    pub fn test_review_log_append<L: ReviewLog>(log: &L) {
        assert_eq!(log.count().unwrap(), 0);
        assert!(log.read_all().unwrap().is_empty());

        log.append(&sample_event("r0001", 1, 4)).unwrap();
        log.append(&sample_event("r0002", 2, 0)).unwrap();
        log.append(&sample_event("r0001", 2, 5)).unwrap();

        assert_eq!(log.count().unwrap(), 3);
        let events = log.read_all().unwrap();
        assert_eq!(events[0], sample_event("r0001", 1, 4));
        assert_eq!(events[1].record_id, "r0002");
        assert_eq!(events[2].rating, 5);
    }

    #[test]
    fn test_record_id_format() {
        assert_eq!(format_record_id(1), "r0001");
        assert_eq!(format_record_id(12345), "r12345");
        assert_eq!(parse_record_id("r0042"), Some(42));
        assert_eq!(parse_record_id("r12345"), Some(12345));
        assert_eq!(parse_record_id("x0001"), None);
        assert_eq!(parse_record_id("r"), None);
    }

    #[test]
    fn test_id_after() {
        assert_eq!(id_after(None).unwrap(), "r0001");
        assert_eq!(id_after(Some(41)).unwrap(), "r0042");

        let err = id_after(Some(u32::MAX)).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("exhausted"));
    }

    #[test]
    fn test_sort_by_id_numeric() {
        let mut records = vec![sample_record("r10000"), sample_record("r0002")];
        sort_by_id(&mut records);
        assert_eq!(records[0].id, "r0002");
        assert_eq!(records[1].id, "r10000");
    }
}
