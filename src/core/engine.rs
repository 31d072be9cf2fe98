//! The engine facade.
//!
//! Wires a record store, a review log and the schedule policy. Writes are
//! serialized per record id; reads work on a [`Snapshot`] taken from the
//! store and log, so any number of readers can run alongside writers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::core::chapters;
use crate::core::queue::{self, DueToday, Upcoming};
use crate::core::record::MemorizationRecord;
use crate::core::scheduler::{ReviewOutcome, StageScheduler};
use crate::core::ReviewEvent;
use crate::error::{HifdhError, Result};
use crate::stats::{StatsAggregator, StatsSnapshot};
use crate::storage::{RecordStore, ReviewLog};

/// How many ids `create_lesson` tries before giving up on a busy store.
const ID_ALLOCATION_ATTEMPTS: u32 = 16;

/// Parameters for a new sabak lesson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLesson {
    pub chapter: u16,
    pub start_verse: u16,
    pub end_verse: u16,
    pub created_on: NaiveDate,
    pub target_date: NaiveDate,
    pub note: Option<String>,
}

impl NewLesson {
    /// Describe a lesson over `chapter:start-end`.
    pub fn new(
        chapter: u16,
        start_verse: u16,
        end_verse: u16,
        created_on: NaiveDate,
        target_date: NaiveDate,
    ) -> Self {
        Self {
            chapter,
            start_verse,
            end_verse,
            created_on,
            target_date,
            note: None,
        }
    }

    /// Attach a note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Records and events read at one point in time.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub records: Vec<MemorizationRecord>,
    pub events: Vec<ReviewEvent>,
    corpus_verses: u32,
}

impl Snapshot {
    /// Build a snapshot from already-loaded data.
    pub fn new(
        records: Vec<MemorizationRecord>,
        events: Vec<ReviewEvent>,
        corpus_verses: u32,
    ) -> Self {
        Self {
            records,
            events,
            corpus_verses,
        }
    }

    /// Records due on `today`.
    pub fn due_today(&self, today: NaiveDate) -> DueToday<'_> {
        queue::due_today(&self.records, today)
    }

    /// Manzil reviews within `horizon_days` of `today`.
    pub fn upcoming(&self, today: NaiveDate, horizon_days: u32) -> Upcoming<'_> {
        queue::upcoming(&self.records, today, horizon_days)
    }

    /// Manzil reviews whose date has passed.
    pub fn overdue(&self, today: NaiveDate) -> Vec<&MemorizationRecord> {
        queue::overdue(&self.records, today)
    }

    /// The aggregator matching this snapshot's corpus size.
    pub fn aggregator(&self) -> StatsAggregator {
        StatsAggregator::new(self.corpus_verses)
    }

    /// Progress statistics for `today`.
    pub fn stats(&self, today: NaiveDate) -> StatsSnapshot {
        self.aggregator().compute(&self.records, &self.events, today)
    }
}

/// The scheduling engine.
pub struct Engine<S: RecordStore, L: ReviewLog> {
    store: S,
    log: L,
    config: Config,
    record_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    create_lock: Mutex<()>,
}

impl<S: RecordStore, L: ReviewLog> Engine<S, L> {
    /// Create an engine over a store and log.
    pub fn new(store: S, log: L, config: Config) -> Self {
        Self {
            store,
            log,
            config,
            record_locks: Mutex::new(HashMap::new()),
            create_lock: Mutex::new(()),
        }
    }

    /// Get the active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the record store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the review log.
    pub fn log(&self) -> &L {
        &self.log
    }

    /// Create a new lesson in sabak.
    ///
    /// # Errors
    ///
    /// * `InvalidRange` if the chapter or verse range is invalid
    /// * `TemporalRegression` if the target date precedes the creation date
    /// * `DuplicateRecord` if other writers keep taking the allocated ids
    pub fn create_lesson(&self, lesson: NewLesson) -> Result<MemorizationRecord> {
        let chapter = chapters::validate_range(lesson.chapter, lesson.start_verse, lesson.end_verse)?;

        let _guard = self.create_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut record = MemorizationRecord::new_lesson(
            self.store.next_id()?,
            chapter,
            lesson.start_verse,
            lesson.end_verse,
            lesson.created_on,
            lesson.target_date,
        )?;
        record.note = lesson.note.filter(|n| !n.trim().is_empty());
        record.check_invariants(&self.config.schedule)?;

        // Another process may claim the same id between next_id and insert
        let mut attempt = 1;
        loop {
            match self.store.insert(&record) {
                Ok(()) => break,
                Err(HifdhError::DuplicateRecord { record_id })
                    if attempt < ID_ALLOCATION_ATTEMPTS =>
                {
                    debug!(%record_id, attempt, "record id taken, allocating another");
                    attempt += 1;
                    record.id = self.store.next_id()?;
                }
                Err(e) => return Err(e),
            }
        }

        info!(record_id = %record.id, lesson = %record.label(), "lesson created");
        Ok(record)
    }

    /// Record a review of `record_id` with `rating` on `today`.
    ///
    /// The event is appended before the record is written. If the write
    /// fails the event stays in the log, so the failure is logged with the
    /// record id and date to find it again.
    ///
    /// # Errors
    ///
    /// * `UnknownRecord` if no record has that id
    /// * `InvalidRating` / `TemporalRegression` from the scheduler
    pub fn record_review(
        &self,
        record_id: &str,
        rating: u8,
        today: NaiveDate,
    ) -> Result<ReviewOutcome> {
        let lock = self.lock_for(record_id);
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.apply_review(record_id, rating, today)
        };
        self.release_lock(record_id, lock);
        result
    }

    fn apply_review(&self, record_id: &str, rating: u8, today: NaiveDate) -> Result<ReviewOutcome> {
        let record = self
            .store
            .get(record_id)?
            .ok_or_else(|| HifdhError::unknown_record(record_id))?;

        let outcome =
            StageScheduler::new(&self.config.schedule).record_review(&record, rating, today)?;

        self.log.append(&outcome.event)?;
        if let Err(e) = self.store.put(&outcome.record) {
            warn!(
                record_id,
                date = %today,
                rating,
                error = %e,
                "review logged but record not saved"
            );
            return Err(e);
        }
        Ok(outcome)
    }

    /// Get a single record.
    pub fn get(&self, record_id: &str) -> Result<MemorizationRecord> {
        self.store
            .get(record_id)?
            .ok_or_else(|| HifdhError::unknown_record(record_id))
    }

    /// Read all records and events.
    pub fn snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot::new(
            self.store.list()?,
            self.log.read_all()?,
            self.config.corpus.total_verses,
        ))
    }

    fn lock_for(&self, record_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .record_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(record_id.to_string()).or_default())
    }

    /// Drop `lock` and forget it once no other review holds it.
    fn release_lock(&self, record_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self
            .record_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        drop(lock);
        if locks
            .get(record_id)
            .is_some_and(|l| Arc::strong_count(l) == 1)
        {
            locks.remove(record_id);
        }
    }
}
