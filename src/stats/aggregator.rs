//! Progress statistics derived from records and the review log.
//!
//! Everything here is a pure function of `(records, events, today)`.
//! Events dated after `today` are ignored so that a snapshot computed for a
//! past day is reproducible.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::core::chapters::TOTAL_VERSES;
use crate::core::juz::{self, verse_position};
use crate::core::record::{add_days, CompletionStatus, MemorizationRecord, StageKind};
use crate::core::ReviewEvent;

/// Record counts per stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCounts {
    pub sabak: usize,
    pub sabki: usize,
    pub manzil: usize,
}

impl StageCounts {
    /// Count the records in each stage.
    pub fn from_records(records: &[MemorizationRecord]) -> Self {
        let mut counts = Self::default();
        for record in records {
            match record.kind() {
                StageKind::Sabak => counts.sabak += 1,
                StageKind::Sabki => counts.sabki += 1,
                StageKind::Manzil => counts.manzil += 1,
            }
        }
        counts
    }

    /// Total records.
    pub fn total(&self) -> usize {
        self.sabak + self.sabki + self.manzil
    }
}

/// Verses completed this week against the week before.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPace {
    /// Verses first moved into manzil during the last 7 days (today included).
    pub this_week_verses: u32,
    /// Verses first moved into manzil during the 7 days before that.
    pub last_week_verses: u32,
    /// Percent change; `None` when last week had nothing to compare against.
    pub change_pct: Option<f64>,
}

/// Aggregate progress statistics for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// The day the snapshot describes.
    pub computed_for: NaiveDate,
    /// Verses across completed records.
    pub total_verses_memorized: u32,
    /// Corpus size used for percentages and projections.
    pub corpus_verses: u32,
    /// `total_verses_memorized / corpus_verses`, a fraction in `[0, 1]`.
    pub completion_percentage: f64,
    /// Consecutive active days ending today or yesterday.
    pub current_streak: u32,
    /// Longest run of consecutive active days.
    pub longest_streak: u32,
    /// Mean rating of rated reviews; `None` before the first rated review.
    pub average_quality: Option<f64>,
    /// Newly completed verses per active day.
    pub verses_per_day: f64,
    /// Days until the corpus is complete at the current pace; `None` is unknown.
    pub estimated_completion_days: Option<f64>,
    /// `today + ceil(estimated_completion_days)`.
    pub estimated_completion_date: Option<NaiveDate>,
    /// Records per stage.
    pub stage_counts: StageCounts,
    /// Week-over-week completion pace.
    pub weekly_pace: WeeklyPace,
    /// Reviews recorded up to and including the snapshot day.
    pub total_reviews: usize,
}

/// Average rating for one day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyQuality {
    pub date: NaiveDate,
    /// Reviews on this day, rated or not.
    pub reviews: u32,
    /// Mean of the rated reviews, if any.
    pub average: Option<f64>,
}

/// Review count for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub reviews: u32,
}

/// Memorized share of one juz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JuzProgress {
    pub juz: u8,
    /// Distinct verses of this juz covered by completed records.
    pub memorized_verses: u32,
    pub total_verses: u32,
    /// `memorized_verses / total_verses`, in `[0, 1]`.
    pub fraction: f64,
}

/// Computes [`StatsSnapshot`]s against a fixed corpus size.
#[derive(Debug, Clone, Copy)]
pub struct StatsAggregator {
    corpus_verses: u32,
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new(TOTAL_VERSES)
    }
}

impl StatsAggregator {
    /// Create an aggregator for a corpus of `corpus_verses` verses.
    ///
    /// A zero corpus is treated as the full corpus.
    pub fn new(corpus_verses: u32) -> Self {
        let corpus_verses = if corpus_verses == 0 {
            TOTAL_VERSES
        } else {
            corpus_verses
        };
        Self { corpus_verses }
    }

    /// Corpus size in verses.
    pub fn corpus_verses(&self) -> u32 {
        self.corpus_verses
    }

    /// Compute the snapshot for `today`.
    pub fn compute(
        &self,
        records: &[MemorizationRecord],
        events: &[ReviewEvent],
        today: NaiveDate,
    ) -> StatsSnapshot {
        let events = events_until(events, today);

        let total_verses_memorized: u32 = records
            .iter()
            .filter(|r| r.status == CompletionStatus::Completed)
            .map(|r| r.verse_count())
            .sum();
        let completion_percentage = total_verses_memorized as f64 / self.corpus_verses as f64;

        let active_days: BTreeSet<NaiveDate> = events.iter().map(|e| e.date).collect();
        let first_completions = first_completions(&events);
        let verses_per_day = verses_per_day(&first_completions, active_days.len());

        let remaining = self.corpus_verses.saturating_sub(total_verses_memorized);
        let estimated_completion_days =
            (verses_per_day > 0.0).then(|| remaining as f64 / verses_per_day);
        let estimated_completion_date = estimated_completion_days.and_then(|days| {
            let days = days.ceil();
            if days > u32::MAX as f64 {
                return None;
            }
            add_days(today, days as u32).ok()
        });

        StatsSnapshot {
            computed_for: today,
            total_verses_memorized,
            corpus_verses: self.corpus_verses,
            completion_percentage,
            current_streak: current_streak(&active_days, today),
            longest_streak: longest_streak(&active_days),
            average_quality: average_rating(events.iter().copied()),
            verses_per_day,
            estimated_completion_days,
            estimated_completion_date,
            stage_counts: StageCounts::from_records(records),
            weekly_pace: weekly_pace(&first_completions, today),
            total_reviews: events.len(),
        }
    }
}

/// Compute stats against the full corpus.
pub fn compute_stats(
    records: &[MemorizationRecord],
    events: &[ReviewEvent],
    today: NaiveDate,
) -> StatsSnapshot {
    StatsAggregator::default().compute(records, events, today)
}

/// Per-day average rating over the `days` days ending on `today`, oldest first.
pub fn quality_trend(events: &[ReviewEvent], today: NaiveDate, days: u32) -> Vec<DailyQuality> {
    if days == 0 {
        return Vec::new();
    }
    let from = days_before(today, days - 1);

    let mut by_day: BTreeMap<NaiveDate, Vec<&ReviewEvent>> = BTreeMap::new();
    for event in events.iter().filter(|e| e.date >= from && e.date <= today) {
        by_day.entry(event.date).or_default().push(event);
    }

    from.iter_days()
        .take_while(|d| *d <= today)
        .map(|date| {
            let day_events = by_day.get(&date).map(Vec::as_slice).unwrap_or(&[]);
            DailyQuality {
                date,
                reviews: day_events.len() as u32,
                average: average_rating(day_events.iter().copied()),
            }
        })
        .collect()
}

/// Completed verses per juz, for all 30 juz in order.
///
/// Overlapping records count each verse once.
pub fn juz_progress(records: &[MemorizationRecord]) -> Vec<JuzProgress> {
    let mut spans: Vec<(u32, u32)> = records
        .iter()
        .filter(|r| r.status == CompletionStatus::Completed)
        .filter_map(|r| {
            Some((
                verse_position(r.chapter, r.start_verse)?,
                verse_position(r.chapter, r.end_verse)?,
            ))
        })
        .collect();
    spans.sort_unstable();

    let mut merged: Vec<(u32, u32)> = Vec::with_capacity(spans.len());
    for (first, last) in spans {
        match merged.last_mut() {
            Some(prev) if first <= prev.1 + 1 => prev.1 = prev.1.max(last),
            _ => merged.push((first, last)),
        }
    }

    juz::all()
        .map(|j| {
            let memorized_verses: u32 = merged
                .iter()
                .map(|&(first, last)| {
                    let lo = first.max(j.first);
                    let hi = last.min(j.last);
                    if lo <= hi {
                        hi - lo + 1
                    } else {
                        0
                    }
                })
                .sum();
            JuzProgress {
                juz: j.number,
                memorized_verses,
                total_verses: j.verses(),
                fraction: memorized_verses as f64 / j.verses() as f64,
            }
        })
        .collect()
}

/// Review counts for every day in `[from, to]`.
pub fn activity_calendar(
    events: &[ReviewEvent],
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<DailyActivity> {
    let mut counts: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for event in events.iter().filter(|e| e.date >= from && e.date <= to) {
        *counts.entry(event.date).or_insert(0) += 1;
    }

    from.iter_days()
        .take_while(|d| *d <= to)
        .map(|date| DailyActivity {
            date,
            reviews: counts.get(&date).copied().unwrap_or(0),
        })
        .collect()
}

fn events_until(events: &[ReviewEvent], today: NaiveDate) -> Vec<&ReviewEvent> {
    events.iter().filter(|e| e.date <= today).collect()
}

fn days_before(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_sub_days(Days::new(days as u64))
        .unwrap_or(NaiveDate::MIN)
}

fn average_rating<'a>(events: impl Iterator<Item = &'a ReviewEvent>) -> Option<f64> {
    let (sum, count) = events
        .filter(|e| e.is_rated())
        .fold((0u32, 0u32), |(sum, count), e| (sum + e.rating as u32, count + 1));
    (count > 0).then(|| sum as f64 / count as f64)
}

fn current_streak(active_days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let anchor = if active_days.contains(&today) {
        today
    } else {
        match today.pred_opt() {
            Some(yesterday) if active_days.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut streak = 0;
    let mut day = Some(anchor);
    while let Some(d) = day.filter(|d| active_days.contains(d)) {
        streak += 1;
        day = d.pred_opt();
    }
    streak
}

fn longest_streak(active_days: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;

    for day in active_days {
        run = match previous {
            Some(p) if p.succ_opt() == Some(*day) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(*day);
    }
    longest
}

/// The earliest completing event of each record.
///
/// A record promoted back to manzil after a lapse completes again, but its
/// verses were already memorized the first time.
fn first_completions<'a>(events: &[&'a ReviewEvent]) -> Vec<&'a ReviewEvent> {
    let mut completions: Vec<&ReviewEvent> = events
        .iter()
        .copied()
        .filter(|e| e.completes_record())
        .collect();
    completions.sort_by_key(|e| e.date);

    let mut seen: HashSet<&str> = HashSet::new();
    completions.retain(|&e| seen.insert(e.record_id.as_str()));
    completions
}

/// Verses completed for the first time, per active day.
fn verses_per_day(first_completions: &[&ReviewEvent], active_days: usize) -> f64 {
    if active_days == 0 {
        return 0.0;
    }
    let newly_completed: u32 = first_completions.iter().map(|e| e.verses).sum();
    newly_completed as f64 / active_days as f64
}

fn weekly_pace(first_completions: &[&ReviewEvent], today: NaiveDate) -> WeeklyPace {
    let this_week_start = days_before(today, 6);
    let last_week_start = days_before(today, 13);

    let completed_between = |from: NaiveDate, to: NaiveDate| -> u32 {
        first_completions
            .iter()
            .filter(|e| e.date >= from && e.date <= to)
            .map(|e| e.verses)
            .sum()
    };

    let this_week_verses = completed_between(this_week_start, today);
    let last_week_verses = match this_week_start.pred_opt() {
        Some(end) => completed_between(last_week_start, end),
        None => 0,
    };
    let change_pct = (last_week_verses > 0).then(|| {
        (this_week_verses as f64 - last_week_verses as f64) / last_week_verses as f64 * 100.0
    });

    WeeklyPace {
        this_week_verses,
        last_week_verses,
        change_pct,
    }
}
