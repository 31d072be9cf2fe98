//! Stats command for Hifdh.
//!
//! Displays the progress dashboard: completion, streaks, pace and quality.

use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::cli::{exit_code_for, open_engine};
use crate::config::{stats_cache_path, Config};
use crate::error::{FailOpen, HifdhError};
use crate::stats::{
    activity_calendar, juz_progress, quality_trend, DailyActivity, DailyQuality, JuzProgress,
    StatsCache, StatsCacheManager, StatsSnapshot,
};

/// Days shown in the activity calendar.
pub const ACTIVITY_CALENDAR_DAYS: u64 = 28;

/// Options for the stats command.
#[derive(Debug, Clone)]
pub struct StatsOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Include juz progress, the quality trend and the activity calendar.
    pub detailed: bool,
    /// Force rebuild the cache.
    pub rebuild: bool,
    /// The day the stats describe.
    pub today: NaiveDate,
}

/// Output format for the stats command.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsOutput {
    /// Whether stats were computed.
    pub success: bool,
    /// The progress snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsSnapshot>,
    /// Daily average rating, oldest first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub quality_trend: Vec<DailyQuality>,
    /// Daily review counts, oldest first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub activity: Vec<DailyActivity>,
    /// Completed verses per juz.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub juz: Vec<JuzProgress>,
    /// Error message if stats failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Process exit code.
    #[serde(skip)]
    pub exit_code: i32,
}

impl StatsOutput {
    /// Create a failed output.
    pub fn failure(error: &HifdhError) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            exit_code: exit_code_for(Some(error)),
            ..Default::default()
        }
    }
}

/// The stats command implementation.
pub struct StatsCommand {
    config: Config,
    cwd: PathBuf,
}

impl StatsCommand {
    /// Create a new stats command.
    pub fn new(config: Config, cwd: impl AsRef<Path>) -> Self {
        Self {
            config,
            cwd: cwd.as_ref().to_path_buf(),
        }
    }

    /// Run the stats command.
    pub fn run(&self, options: &StatsOptions) -> StatsOutput {
        let snapshot = match open_engine(&self.cwd, self.config.clone()).and_then(|e| e.snapshot())
        {
            Ok(snapshot) => snapshot,
            Err(e) => return StatsOutput::failure(&e),
        };

        let aggregator = snapshot.aggregator();
        let cache_manager = StatsCacheManager::new(stats_cache_path(&self.cwd));
        let stats = if options.rebuild {
            let cache =
                StatsCache::compute(&aggregator, &snapshot.records, &snapshot.events, options.today);
            cache_manager
                .save(&cache)
                .fail_open_default("Failed to save stats cache");
            cache.snapshot
        } else {
            cache_manager.load_or_compute(
                &aggregator,
                &snapshot.records,
                &snapshot.events,
                options.today,
            )
        };

        let (quality_trend, activity, juz) = if options.detailed {
            let from = options
                .today
                .checked_sub_days(Days::new(ACTIVITY_CALENDAR_DAYS - 1))
                .unwrap_or(NaiveDate::MIN);
            (
                quality_trend(
                    &snapshot.events,
                    options.today,
                    self.config.queue.trend_days,
                ),
                activity_calendar(&snapshot.events, from, options.today),
                juz_progress(&snapshot.records),
            )
        } else {
            (Vec::new(), Vec::new(), Vec::new())
        };

        StatsOutput {
            success: true,
            stats: Some(stats),
            quality_trend,
            activity,
            juz,
            error: None,
            exit_code: exit_code_for(None),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &StatsOutput, options: &StatsOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    /// Format output as human-readable text.
    fn format_human_readable(&self, output: &StatsOutput) -> String {
        let Some(stats) = output.stats.as_ref().filter(|_| output.success) else {
            return format!(
                "Stats failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        };

        let mut lines = Vec::new();
        lines.push(format!("=== Hifdh Progress ({}) ===\n", stats.computed_for));

        lines.push("📖 Memorized".to_string());
        lines.push(format!(
            "   {} of {} verses ({:.2}%)",
            stats.total_verses_memorized,
            stats.corpus_verses,
            stats.completion_percentage * 100.0
        ));
        lines.push(format!(
            "   Sabak: {} | Sabki: {} | Manzil: {}\n",
            stats.stage_counts.sabak, stats.stage_counts.sabki, stats.stage_counts.manzil
        ));

        lines.push("🔥 Consistency".to_string());
        lines.push(format!(
            "   Current streak: {} day(s) | Longest: {} day(s)",
            stats.current_streak, stats.longest_streak
        ));
        lines.push(format!("   Reviews recorded: {}", stats.total_reviews));
        match stats.average_quality {
            Some(avg) => lines.push(format!("   Average quality: {:.1} / 5\n", avg)),
            None => lines.push("   Average quality: -\n".to_string()),
        }

        lines.push("📈 Pace".to_string());
        lines.push(format!("   {:.1} verses per active day", stats.verses_per_day));
        let pace = &stats.weekly_pace;
        let change = match pace.change_pct {
            Some(pct) => format!(" ({:+.0}%)", pct),
            None => String::new(),
        };
        lines.push(format!(
            "   This week: {} verses | Last week: {} verses{}",
            pace.this_week_verses, pace.last_week_verses, change
        ));
        match (stats.estimated_completion_days, stats.estimated_completion_date) {
            (Some(days), Some(date)) => lines.push(format!(
                "   Estimated completion: {} (~{:.0} days)",
                date, days
            )),
            _ => lines.push("   Estimated completion: not enough data".to_string()),
        }

        if !output.juz.is_empty() {
            lines.push(String::new());
            lines.push("📚 Juz".to_string());
            let mut started = output
                .juz
                .iter()
                .filter(|j| j.memorized_verses > 0)
                .peekable();
            if started.peek().is_none() {
                lines.push("   No juz started yet".to_string());
            }
            for progress in started {
                let filled = ((progress.fraction * 10.0).round() as usize).min(10);
                lines.push(format!(
                    "   Juz {:>2}  {}{} {:>3.0}% ({}/{})",
                    progress.juz,
                    "█".repeat(filled),
                    "░".repeat(10 - filled),
                    progress.fraction * 100.0,
                    progress.memorized_verses,
                    progress.total_verses
                ));
            }
        }

        if !output.quality_trend.is_empty() {
            lines.push(String::new());
            lines.push("⭐ Quality trend".to_string());
            for day in output.quality_trend.iter().filter(|d| d.reviews > 0) {
                let average = day
                    .average
                    .map(|a| format!("{:.1}", a))
                    .unwrap_or_else(|| "-".to_string());
                lines.push(format!(
                    "   {}  {} ({} review(s))",
                    day.date, average, day.reviews
                ));
            }
        }

        if !output.activity.is_empty() {
            lines.push(String::new());
            lines.push("🗓 Activity".to_string());
            let cells: String = output
                .activity
                .iter()
                .map(|d| match d.reviews {
                    0 => '·',
                    1..=2 => '▪',
                    _ => '■',
                })
                .collect();
            lines.push(format!("   {}", cells));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::add::{AddCommand, AddOptions};
    use crate::cli::review::{ReviewCommand, ReviewOptions};
    use tempfile::TempDir;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn options(d: u32) -> StatsOptions {
        StatsOptions {
            json: false,
            quiet: false,
            detailed: false,
            rebuild: false,
            today: date(d),
        }
    }

    fn setup() -> TempDir {
        let temp = TempDir::new().unwrap();
        let add = AddCommand::new(Config::default(), temp.path());
        assert!(
            add.run(&AddOptions {
                json: false,
                quiet: false,
                chapter: 1,
                start_verse: 1,
                end_verse: 7,
                today: date(1),
                target: None,
                note: None,
            })
            .success
        );
        let review = ReviewCommand::new(Config::default(), temp.path());
        for (rating, day) in [(5, 1), (4, 2), (4, 3), (3, 4), (4, 5), (4, 6), (5, 7), (4, 8)] {
            let output = review.run(&ReviewOptions {
                json: false,
                quiet: false,
                record_id: "r0001".to_string(),
                rating,
                today: date(day),
            });
            assert!(output.success, "{:?}", output.error);
        }
        temp
    }

    #[test]
    fn test_stats_empty_project() {
        let temp = TempDir::new().unwrap();
        let cmd = StatsCommand::new(Config::default(), temp.path());
        let output = cmd.run(&options(1));

        assert!(output.success);
        let stats = output.stats.as_ref().unwrap();
        assert_eq!(stats.total_verses_memorized, 0);
        assert_eq!(stats.average_quality, None);
        assert!(cmd
            .format_output(&output, &options(1))
            .contains("Estimated completion: not enough data"));
    }

    #[test]
    fn test_stats_after_completion() {
        let temp = setup();
        let cmd = StatsCommand::new(Config::default(), temp.path());
        let output = cmd.run(&options(8));

        let stats = output.stats.as_ref().unwrap();
        assert_eq!(stats.total_verses_memorized, 7);
        assert_eq!(stats.stage_counts.manzil, 1);
        assert_eq!(stats.current_streak, 8);
        assert_eq!(stats.total_reviews, 8);

        let text = cmd.format_output(&output, &options(8));
        assert!(text.contains("7 of 6236 verses (0.11%)"));
        assert!((stats.completion_percentage - 7.0 / 6236.0).abs() < 1e-12);
        assert!(text.contains("Current streak: 8 day(s)"));
        assert!(temp.path().join(".hifdh/stats-cache.json").exists());
    }

    #[test]
    fn test_stats_rebuild_replaces_cache() {
        let temp = setup();
        let cmd = StatsCommand::new(Config::default(), temp.path());
        cmd.run(&options(8));

        let cache_path = temp.path().join(".hifdh/stats-cache.json");
        std::fs::write(&cache_path, "not json").unwrap();

        let output = cmd.run(&StatsOptions {
            rebuild: true,
            ..options(8)
        });
        assert!(output.success);
        let cache = StatsCacheManager::new(&cache_path).load().unwrap().unwrap();
        assert_eq!(cache.events_processed, 8);
    }

    #[test]
    fn test_stats_detailed_sections() {
        let temp = setup();
        let cmd = StatsCommand::new(Config::default(), temp.path());
        let opts = StatsOptions {
            detailed: true,
            ..options(8)
        };
        let output = cmd.run(&opts);

        assert_eq!(output.quality_trend.len(), 14);
        assert_eq!(output.activity.len(), ACTIVITY_CALENDAR_DAYS as usize);
        assert_eq!(output.activity.last().unwrap().reviews, 1);

        assert_eq!(output.juz.len(), 30);
        assert_eq!(output.juz[0].memorized_verses, 7);
        assert_eq!(output.juz[0].total_verses, 148);

        let text = cmd.format_output(&output, &opts);
        assert!(text.contains("Juz  1"));
        assert!(text.contains("(7/148)"));
        assert!(!text.contains("Juz  2"));
        assert!(text.contains("Quality trend"));
        assert!(text.contains("Activity"));

        let json = cmd.format_output(
            &output,
            &StatsOptions {
                json: true,
                ..opts.clone()
            },
        );
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["stats"]["total_verses_memorized"], 7);
        assert_eq!(parsed["juz"].as_array().unwrap().len(), 30);
        assert!(parsed["stats"]["completion_percentage"].as_f64().unwrap() < 1.0);
    }

    #[test]
    fn test_stats_summary_omits_juz() {
        let temp = setup();
        let cmd = StatsCommand::new(Config::default(), temp.path());
        let output = cmd.run(&options(8));

        assert!(output.juz.is_empty());
        assert!(!cmd.format_output(&output, &options(8)).contains("Juz"));
    }
}
