//! Configuration loading for Hifdh.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.hifdh/config.toml`)
//! 3. User config (`~/.hifdh/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. The scheduling thresholds are policy
//! constants; the defaults reproduce the classic sabak/sabki/manzil routine.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::chapters::TOTAL_VERSES;
use crate::error::{HifdhError, Result};

/// Main configuration struct for Hifdh.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Stage transition and interval policy.
    pub schedule: ScheduleConfig,
    /// Corpus settings.
    pub corpus: CorpusConfig,
    /// Review queue and dashboard windows.
    pub queue: QueueConfig,
}

/// Stage transition and interval policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Minimum sabak rating that moves a lesson into sabki.
    pub promotion_rating: u8,
    /// Days in sabki after which the record must be promoted or demoted.
    pub sabki_duration_days: u32,
    /// Average sabki rating needed for promotion to manzil.
    pub sabki_pass_average: f64,
    /// Manzil interval assigned on promotion.
    pub manzil_baseline_days: u32,
    /// Lower bound for the manzil interval.
    pub manzil_min_days: u32,
    /// Upper bound for the manzil interval.
    pub manzil_max_days: u32,
    /// Multiplier applied to the interval on a strong review.
    pub growth_factor: f64,
    /// Minimum manzil rating that grows the interval.
    pub growth_rating: u8,
    /// Highest manzil rating that halves the interval.
    pub shrink_rating: u8,
    /// Highest manzil rating that also demotes back to sabki.
    pub lapse_rating: u8,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            promotion_rating: 3,
            sabki_duration_days: 7,
            sabki_pass_average: 3.0,
            manzil_baseline_days: 5,
            manzil_min_days: 1,
            manzil_max_days: 30,
            growth_factor: 1.3,
            growth_rating: 4,
            shrink_rating: 2,
            lapse_rating: 0,
        }
    }
}

impl ScheduleConfig {
    /// Check that the thresholds are mutually consistent.
    pub fn validate(&self) -> Result<()> {
        if self.promotion_rating == 0 || self.promotion_rating > 5 {
            return Err(HifdhError::config(format!(
                "schedule.promotion_rating must be in 1..=5, got {}",
                self.promotion_rating
            )));
        }
        if self.sabki_duration_days == 0 {
            return Err(HifdhError::config(
                "schedule.sabki_duration_days must be at least 1",
            ));
        }
        if !self.sabki_pass_average.is_finite() || !(0.0..=5.0).contains(&self.sabki_pass_average)
        {
            return Err(HifdhError::config(format!(
                "schedule.sabki_pass_average must be in [0, 5], got {}",
                self.sabki_pass_average
            )));
        }
        if self.manzil_min_days == 0 || self.manzil_min_days > self.manzil_max_days {
            return Err(HifdhError::config(format!(
                "schedule.manzil_min_days/max_days must satisfy 1 <= min <= max, got {}..={}",
                self.manzil_min_days, self.manzil_max_days
            )));
        }
        if !(self.manzil_min_days..=self.manzil_max_days).contains(&self.manzil_baseline_days) {
            return Err(HifdhError::config(format!(
                "schedule.manzil_baseline_days {} outside {}..={}",
                self.manzil_baseline_days, self.manzil_min_days, self.manzil_max_days
            )));
        }
        if !self.growth_factor.is_finite() || self.growth_factor < 1.0 {
            return Err(HifdhError::config(format!(
                "schedule.growth_factor must be >= 1.0, got {}",
                self.growth_factor
            )));
        }
        if !(self.lapse_rating <= self.shrink_rating && self.shrink_rating < self.growth_rating)
            || self.growth_rating > 5
        {
            return Err(HifdhError::config(format!(
                "schedule ratings must satisfy lapse <= shrink < growth <= 5, got {} / {} / {}",
                self.lapse_rating, self.shrink_rating, self.growth_rating
            )));
        }
        Ok(())
    }
}

/// Corpus settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CorpusConfig {
    /// Total verses used for completion percentage and projections.
    pub total_verses: u32,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            total_verses: TOTAL_VERSES,
        }
    }
}

/// Review queue and dashboard windows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QueueConfig {
    /// Default horizon for the upcoming view.
    pub upcoming_days: u32,
    /// Days shown in the quality trend.
    pub trend_days: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            upcoming_days: 7,
            trend_days: 14,
        }
    }
}

impl Config {
    /// Load configuration with full precedence chain.
    ///
    /// Precedence (highest to lowest):
    /// 1. Environment variables
    /// 2. Project config (`.hifdh/config.toml` in the project root)
    /// 3. User config (`~/.hifdh/config.toml`)
    /// 4. Defaults
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config.sanitize()
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config.sanitize()
    }

    /// Load user config from `~/.hifdh/config.toml`.
    fn load_user_config() -> Option<Config> {
        let home = hifdh_home()?;
        let config_path = home.join("config.toml");
        Self::load_optional(&config_path)
    }

    /// Load project config from `.hifdh/config.toml` in the project root.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        let config_path = project_dir(cwd).join("config.toml");
        Self::load_optional(&config_path)
    }

    /// Load a config file that may be absent; parse errors are logged.
    fn load_optional(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("ignoring {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| HifdhError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| HifdhError::config(e.to_string()))
    }

    /// Fall back to the default schedule if the layered result is inconsistent.
    fn sanitize(mut self) -> Self {
        if let Err(e) = self.schedule.validate() {
            tracing::warn!("{}; using default schedule", e);
            self.schedule = ScheduleConfig::default();
        }
        if self.corpus.total_verses == 0 {
            tracing::warn!("corpus.total_verses is 0; using {}", TOTAL_VERSES);
            self.corpus.total_verses = TOTAL_VERSES;
        }
        self
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        override_u32("HIFDH_SABKI_DAYS", &mut self.schedule.sabki_duration_days, 1);
        override_u32(
            "HIFDH_MANZIL_BASELINE_DAYS",
            &mut self.schedule.manzil_baseline_days,
            1,
        );
        override_u32("HIFDH_MANZIL_MIN_DAYS", &mut self.schedule.manzil_min_days, 1);
        override_u32("HIFDH_MANZIL_MAX_DAYS", &mut self.schedule.manzil_max_days, 1);
        override_u32("HIFDH_UPCOMING_DAYS", &mut self.queue.upcoming_days, 0);
        override_u32("HIFDH_TREND_DAYS", &mut self.queue.trend_days, 1);

        // HIFDH_PROMOTION_RATING
        if let Ok(val) = env::var("HIFDH_PROMOTION_RATING") {
            match val.parse::<u8>() {
                Ok(n) if (1..=5).contains(&n) => self.schedule.promotion_rating = n,
                _ => tracing::warn!(
                    "Invalid HIFDH_PROMOTION_RATING value '{}'. Expected 1-5. Using '{}'.",
                    val,
                    self.schedule.promotion_rating
                ),
            }
        }

        // HIFDH_GROWTH_FACTOR
        if let Ok(val) = env::var("HIFDH_GROWTH_FACTOR") {
            match val.parse::<f64>() {
                Ok(n) if n.is_finite() && n >= 1.0 => self.schedule.growth_factor = n,
                _ => tracing::warn!(
                    "Invalid HIFDH_GROWTH_FACTOR value '{}'. Expected a number >= 1.0. Using '{}'.",
                    val,
                    self.schedule.growth_factor
                ),
            }
        }
    }

    /// Merge another config into this one.
    ///
    /// The `other` config takes precedence field by field: every value that
    /// differs from the default is applied, so each layer only needs to
    /// list its customizations.
    ///
    /// # Limitation
    ///
    /// A layer cannot set a value back to its default to undo a lower layer.
    fn merge(mut self, other: Config) -> Self {
        let d = ScheduleConfig::default();
        let o = other.schedule;
        if o.promotion_rating != d.promotion_rating {
            self.schedule.promotion_rating = o.promotion_rating;
        }
        if o.sabki_duration_days != d.sabki_duration_days {
            self.schedule.sabki_duration_days = o.sabki_duration_days;
        }
        if o.sabki_pass_average != d.sabki_pass_average {
            self.schedule.sabki_pass_average = o.sabki_pass_average;
        }
        if o.manzil_baseline_days != d.manzil_baseline_days {
            self.schedule.manzil_baseline_days = o.manzil_baseline_days;
        }
        if o.manzil_min_days != d.manzil_min_days {
            self.schedule.manzil_min_days = o.manzil_min_days;
        }
        if o.manzil_max_days != d.manzil_max_days {
            self.schedule.manzil_max_days = o.manzil_max_days;
        }
        if o.growth_factor != d.growth_factor {
            self.schedule.growth_factor = o.growth_factor;
        }
        if o.growth_rating != d.growth_rating {
            self.schedule.growth_rating = o.growth_rating;
        }
        if o.shrink_rating != d.shrink_rating {
            self.schedule.shrink_rating = o.shrink_rating;
        }
        if o.lapse_rating != d.lapse_rating {
            self.schedule.lapse_rating = o.lapse_rating;
        }

        if other.corpus.total_verses != CorpusConfig::default().total_verses {
            self.corpus.total_verses = other.corpus.total_verses;
        }

        let default_queue = QueueConfig::default();
        if other.queue.upcoming_days != default_queue.upcoming_days {
            self.queue.upcoming_days = other.queue.upcoming_days;
        }
        if other.queue.trend_days != default_queue.trend_days {
            self.queue.trend_days = other.queue.trend_days;
        }

        self
    }

    /// Save configuration to the project config file.
    ///
    /// Writes `.hifdh/config.toml` under `root`, creating the directory if
    /// needed. Uses a temp file and rename.
    pub fn save_project(&self, root: &Path) -> Result<PathBuf> {
        let dir = root.join(PROJECT_DIR_NAME);
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| HifdhError::storage(&dir, e))?;
        }

        let config_path = dir.join("config.toml");
        let content =
            toml::to_string_pretty(self).map_err(|e| HifdhError::config(e.to_string()))?;

        let temp_path = dir.join(".config.toml.tmp");
        fs::write(&temp_path, &content).map_err(|e| HifdhError::storage(&temp_path, e))?;
        let file = fs::File::open(&temp_path).map_err(|e| HifdhError::storage(&temp_path, e))?;
        file.sync_all()
            .map_err(|e| HifdhError::storage(&temp_path, e))?;
        drop(file);

        fs::rename(&temp_path, &config_path).map_err(|e| HifdhError::storage(&config_path, e))?;

        Ok(config_path)
    }
}

/// Apply a `u32` env override with a lower bound, warning on bad values.
fn override_u32(var: &str, slot: &mut u32, min: u32) {
    if let Ok(val) = env::var(var) {
        match val.parse::<u32>() {
            Ok(n) if n >= min => *slot = n,
            _ => tracing::warn!(
                "Invalid {} value '{}'. Expected an integer >= {}. Using '{}'.",
                var,
                val,
                min,
                slot
            ),
        }
    }
}

/// Name of the per-project data directory.
pub const PROJECT_DIR_NAME: &str = ".hifdh";

/// Get the Hifdh home directory.
///
/// Checks `HIFDH_HOME` first, then falls back to `~/.hifdh`.
pub fn hifdh_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("HIFDH_HOME") {
        if home.is_empty() {
            tracing::warn!("HIFDH_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("HIFDH_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(PROJECT_DIR_NAME));
    }

    let fallback = env::temp_dir().join("hifdh");
    tracing::warn!(
        "HOME not set, using fallback location: {}",
        fallback.display()
    );
    Some(fallback)
}

/// Find the project root for a working directory.
///
/// Walks up looking for an existing `.hifdh/` directory and falls back to
/// `cwd` itself when none is found.
pub fn find_project_root(cwd: &Path) -> PathBuf {
    for ancestor in cwd.ancestors() {
        if ancestor.join(PROJECT_DIR_NAME).is_dir() {
            return ancestor.to_path_buf();
        }
    }
    cwd.to_path_buf()
}

/// Get the project data directory, `<root>/.hifdh/`.
pub fn project_dir(cwd: &Path) -> PathBuf {
    find_project_root(cwd).join(PROJECT_DIR_NAME)
}

/// Get the record directory, `<root>/.hifdh/records/`.
pub fn records_dir(cwd: &Path) -> PathBuf {
    project_dir(cwd).join("records")
}

/// Get the review log path, `<root>/.hifdh/reviews.log`.
pub fn review_log_path(cwd: &Path) -> PathBuf {
    project_dir(cwd).join("reviews.log")
}

/// Get the stats cache path, `<root>/.hifdh/stats-cache.json`.
pub fn stats_cache_path(cwd: &Path) -> PathBuf {
    project_dir(cwd).join("stats-cache.json")
}
