//! In-memory storage for testing.
//!
//! Thread-safe implementations of `RecordStore` and `ReviewLog` used by
//! unit tests and by callers that manage persistence themselves.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::core::{MemorizationRecord, ReviewEvent};
use crate::error::{HifdhError, Result};
use crate::storage::traits::{id_after, parse_record_id, sort_by_id};
use crate::storage::{RecordStore, ReviewLog};

/// In-memory record store.
///
/// Thread-safe implementation using `RwLock<HashMap>`.
/// Records are lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<String, MemorizationRecord>>,
}

impl MemoryRecordStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of records in the store.
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordStore for MemoryRecordStore {
    fn get(&self, id: &str) -> Result<Option<MemorizationRecord>> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(id).cloned())
    }

    fn put(&self, record: &MemorizationRecord) -> Result<()> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn insert(&self, record: &MemorizationRecord) -> Result<()> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        match records.entry(record.id.clone()) {
            Entry::Occupied(_) => Err(HifdhError::duplicate_record(&record.id)),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    fn list(&self) -> Result<Vec<MemorizationRecord>> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let mut result: Vec<MemorizationRecord> = records.values().cloned().collect();
        sort_by_id(&mut result);
        Ok(result)
    }

    fn next_id(&self) -> Result<String> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        id_after(records.keys().filter_map(|id| parse_record_id(id)).max())
    }
}

/// In-memory review log.
#[derive(Debug, Default)]
pub struct MemoryReviewLog {
    events: RwLock<Vec<ReviewEvent>>,
}

impl MemoryReviewLog {
    /// Create a new empty log.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReviewLog for MemoryReviewLog {
    fn append(&self, event: &ReviewEvent) -> Result<()> {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<ReviewEvent>> {
        Ok(self
            .events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn count(&self) -> Result<usize> {
        Ok(self
            .events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len())
    }
}
