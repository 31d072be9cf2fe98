//! Materialized stats cache for Hifdh.
//!
//! The cache stores the last computed snapshot together with the inputs it
//! was computed from. It is stale when any of those inputs differ, and a
//! stale or unreadable cache is simply recomputed.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{MemorizationRecord, ReviewEvent};
use crate::error::{FailOpen, HifdhError, Result};
use crate::stats::{StatsAggregator, StatsSnapshot};

/// Materialized stats cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatsCache {
    /// Day the snapshot was computed for.
    pub generated_for: NaiveDate,
    /// Number of review events the snapshot saw.
    pub events_processed: usize,
    /// Number of records the snapshot saw.
    pub records_processed: usize,
    /// The cached snapshot.
    pub snapshot: StatsSnapshot,
}

impl StatsCache {
    /// Compute a fresh cache entry.
    pub fn compute(
        aggregator: &StatsAggregator,
        records: &[MemorizationRecord],
        events: &[ReviewEvent],
        today: NaiveDate,
    ) -> Self {
        Self {
            generated_for: today,
            events_processed: events.len(),
            records_processed: records.len(),
            snapshot: aggregator.compute(records, events, today),
        }
    }

    /// Check whether the cache no longer matches its inputs.
    pub fn is_stale(
        &self,
        today: NaiveDate,
        event_count: usize,
        record_count: usize,
        corpus_verses: u32,
    ) -> bool {
        self.generated_for != today
            || self.events_processed != event_count
            || self.records_processed != record_count
            || self.snapshot.corpus_verses != corpus_verses
    }
}

/// Manager for loading, saving, and refreshing the stats cache.
#[derive(Debug, Clone)]
pub struct StatsCacheManager {
    /// Path to the cache file.
    cache_path: PathBuf,
}

impl StatsCacheManager {
    /// Create a new cache manager.
    pub fn new(cache_path: impl AsRef<Path>) -> Self {
        Self {
            cache_path: cache_path.as_ref().to_path_buf(),
        }
    }

    /// Load the cache from disk.
    pub fn load(&self) -> Result<Option<StatsCache>> {
        if !self.cache_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.cache_path)
            .map_err(|e| HifdhError::storage(&self.cache_path, e))?;

        let cache: StatsCache = serde_json::from_str(&content)
            .map_err(|e| HifdhError::serde(format!("Failed to parse stats cache: {}", e)))?;

        Ok(Some(cache))
    }

    /// Save the cache to disk via temp file + rename.
    pub fn save(&self, cache: &StatsCache) -> Result<()> {
        if let Some(parent) = self.cache_path.parent() {
            fs::create_dir_all(parent).map_err(|e| HifdhError::storage(parent, e))?;
        }

        let content = serde_json::to_string_pretty(cache)
            .map_err(|e| HifdhError::serde(format!("Failed to serialize stats cache: {}", e)))?;

        let temp_path = self.cache_path.with_extension("json.tmp");
        fs::write(&temp_path, content).map_err(|e| HifdhError::storage(&temp_path, e))?;
        fs::rename(&temp_path, &self.cache_path)
            .map_err(|e| HifdhError::storage(&self.cache_path, e))?;

        Ok(())
    }

    /// Return the cached snapshot if fresh, else recompute and save.
    ///
    /// Cache read and write failures are logged and ignored.
    pub fn load_or_compute(
        &self,
        aggregator: &StatsAggregator,
        records: &[MemorizationRecord],
        events: &[ReviewEvent],
        today: NaiveDate,
    ) -> StatsSnapshot {
        let cached = self.load().fail_open_default("Failed to load stats cache");

        if let Some(cache) = cached {
            if !cache.is_stale(
                today,
                events.len(),
                records.len(),
                aggregator.corpus_verses(),
            ) {
                debug!(path = %self.cache_path.display(), "stats cache hit");
                return cache.snapshot;
            }
        }

        let cache = StatsCache::compute(aggregator, records, events, today);
        self.save(&cache)
            .fail_open_default("Failed to save stats cache");
        cache.snapshot
    }

    /// Get the cache path.
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{StageKind, EVENT_SCHEMA_VERSION};
    use tempfile::TempDir;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, d).unwrap()
    }

    fn event(d: u32) -> ReviewEvent {
        ReviewEvent {
            v: EVENT_SCHEMA_VERSION,
            date: date(d),
            record_id: "r0001".to_string(),
            rating: 4,
            from_stage: StageKind::Sabak,
            stage: StageKind::Sabki,
            verses: 3,
        }
    }

    fn manager() -> (StatsCacheManager, TempDir) {
        let temp = TempDir::new().unwrap();
        let manager = StatsCacheManager::new(temp.path().join("stats-cache.json"));
        (manager, temp)
    }

    #[test]
    fn test_manager_load_missing() {
        let (manager, _temp) = manager();
        assert!(manager.load().unwrap().is_none());
    }

    #[test]
    fn test_manager_save_and_load() {
        let (manager, _temp) = manager();
        let cache = StatsCache::compute(&StatsAggregator::default(), &[], &[event(1)], date(1));

        manager.save(&cache).unwrap();
        let loaded = manager.load().unwrap().unwrap();

        assert_eq!(loaded, cache);
        assert!(!manager.cache_path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_is_stale() {
        let aggregator = StatsAggregator::default();
        let cache = StatsCache::compute(&aggregator, &[], &[event(1)], date(1));

        assert!(!cache.is_stale(date(1), 1, 0, aggregator.corpus_verses()));
        assert!(cache.is_stale(date(2), 1, 0, aggregator.corpus_verses()));
        assert!(cache.is_stale(date(1), 2, 0, aggregator.corpus_verses()));
        assert!(cache.is_stale(date(1), 1, 1, aggregator.corpus_verses()));
        assert!(cache.is_stale(date(1), 1, 0, 100));
    }

    #[test]
    fn test_load_or_compute_writes_cache() {
        let (manager, _temp) = manager();
        let aggregator = StatsAggregator::default();
        let events = vec![event(1), event(2)];

        let snapshot = manager.load_or_compute(&aggregator, &[], &events, date(2));
        assert_eq!(snapshot.current_streak, 2);

        let cache = manager.load().unwrap().unwrap();
        assert_eq!(cache.events_processed, 2);
        assert_eq!(cache.snapshot, snapshot);
    }

    #[test]
    fn test_load_or_compute_uses_fresh_cache() {
        let (manager, _temp) = manager();
        let aggregator = StatsAggregator::default();
        let events = vec![event(1)];

        // Plant a cache with a recognizable value
        let mut cache = StatsCache::compute(&aggregator, &[], &events, date(1));
        cache.snapshot.longest_streak = 99;
        manager.save(&cache).unwrap();

        let snapshot = manager.load_or_compute(&aggregator, &[], &events, date(1));
        assert_eq!(snapshot.longest_streak, 99);
    }

    #[test]
    fn test_load_or_compute_recomputes_stale_cache() {
        let (manager, _temp) = manager();
        let aggregator = StatsAggregator::default();

        let mut cache = StatsCache::compute(&aggregator, &[], &[event(1)], date(1));
        cache.snapshot.longest_streak = 99;
        manager.save(&cache).unwrap();

        let events = vec![event(1), event(2)];
        let snapshot = manager.load_or_compute(&aggregator, &[], &events, date(2));
        assert_eq!(snapshot.longest_streak, 2);
    }

    #[test]
    fn test_corrupt_cache_fails_open() {
        let (manager, _temp) = manager();
        fs::write(manager.cache_path(), "{ not json").unwrap();

        let snapshot =
            manager.load_or_compute(&StatsAggregator::default(), &[], &[event(1)], date(1));
        assert_eq!(snapshot.total_reviews, 1);
        assert!(manager.load().unwrap().is_some());
    }
}
