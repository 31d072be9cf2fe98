//! Progress statistics for Hifdh.
//!
//! Stats are derived from the record set and the append-only review log
//! (`.hifdh/reviews.log`), which is the source of truth. A materialized
//! cache (`.hifdh/stats-cache.json`) avoids recomputation within a day.

pub mod aggregator;
pub mod cache;

pub use aggregator::{
    activity_calendar, compute_stats, juz_progress, quality_trend, DailyActivity, DailyQuality,
    JuzProgress, StageCounts, StatsAggregator, StatsSnapshot, WeeklyPace,
};
pub use cache::{StatsCache, StatsCacheManager};
