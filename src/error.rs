//! Unified error types for Hifdh.
//!
//! Caller mistakes (bad rating, bad verse range, a date in the past, an
//! unknown id) are returned as typed errors so the presentation layer can
//! decide whether to prompt or retry. Storage and config failures are
//! infrastructure errors; the non-essential ones (stats cache, config
//! loading) are handled fail-open through [`FailOpen`].

use std::io;
use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// The main error type for Hifdh operations.
#[derive(Error, Debug)]
pub enum HifdhError {
    /// Quality rating outside 0..=5.
    #[error("invalid rating {rating}: expected a value between 0 and 5")]
    InvalidRating { rating: u8 },

    /// Verse range is inverted or outside the chapter.
    #[error("invalid range for chapter {chapter} ({start}-{end}): {reason}")]
    InvalidRange {
        chapter: u16,
        start: u16,
        end: u16,
        reason: String,
    },

    /// The supplied date precedes the record's last recorded date.
    #[error("date {supplied} precedes last recorded date {last} of record {record_id}")]
    TemporalRegression {
        record_id: String,
        supplied: NaiveDate,
        last: NaiveDate,
    },

    /// No record with the given id exists.
    #[error("unknown record: {record_id}")]
    UnknownRecord { record_id: String },

    /// A new record was given an id that is already stored.
    #[error("record already exists: {record_id}")]
    DuplicateRecord { record_id: String },

    /// A record broke a stage invariant. Indicates a bug, never recovered.
    #[error("stage invariant violated: {message}")]
    StageInvariantViolation { message: String },

    /// I/O errors from record or log file operations.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON or TOML (de)serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },
}

/// A specialized Result type for Hifdh operations.
pub type Result<T> = std::result::Result<T, HifdhError>;

impl HifdhError {
    /// Create an invalid rating error.
    pub fn invalid_rating(rating: u8) -> Self {
        Self::InvalidRating { rating }
    }

    /// Create an invalid range error.
    pub fn invalid_range(chapter: u16, start: u16, end: u16, reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            chapter,
            start,
            end,
            reason: reason.into(),
        }
    }

    /// Create a temporal regression error.
    pub fn temporal_regression(
        record_id: impl Into<String>,
        supplied: NaiveDate,
        last: NaiveDate,
    ) -> Self {
        Self::TemporalRegression {
            record_id: record_id.into(),
            supplied,
            last,
        }
    }

    /// Create an unknown record error.
    pub fn unknown_record(record_id: impl Into<String>) -> Self {
        Self::UnknownRecord {
            record_id: record_id.into(),
        }
    }

    /// Create a duplicate record error.
    pub fn duplicate_record(record_id: impl Into<String>) -> Self {
        Self::DuplicateRecord {
            record_id: record_id.into(),
        }
    }

    /// Create a stage invariant violation.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::StageInvariantViolation {
            message: message.into(),
        }
    }

    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the error was caused by the caller's input rather than a fault.
    ///
    /// User-facing errors are safe to show as a prompt and to resubmit
    /// with corrected input.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::InvalidRating { .. }
                | Self::InvalidRange { .. }
                | Self::TemporalRegression { .. }
                | Self::UnknownRecord { .. }
        )
    }

    /// Whether the error indicates a bug in the engine.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::StageInvariantViolation { .. })
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        if self.is_user_facing() {
            exit_codes::REJECTED
        } else if self.is_fatal() {
            exit_codes::FATAL
        } else {
            exit_codes::FAULT
        }
    }
}

impl From<io::Error> for HifdhError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for HifdhError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Trait for fail-open error handling.
///
/// Used where a failure should degrade to a default instead of aborting the
/// command, e.g. an unreadable stats cache or a broken user config.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Handle an error by logging a warning and returning the provided fallback.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using fallback)", context, err);
                fallback
            }
        }
    }
}

/// Exit codes for the Hifdh CLI.
pub mod exit_codes {
    /// Command succeeded.
    pub const SUCCESS: i32 = 0;

    /// Input was rejected (bad rating, range, date or id).
    pub const REJECTED: i32 = 1;

    /// Storage, serialization or config fault.
    pub const FAULT: i32 = 2;

    /// Invariant violation or panic.
    pub const FATAL: i32 = 3;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_invalid_rating_display() {
        let err = HifdhError::invalid_rating(7);
        assert_eq!(
            err.to_string(),
            "invalid rating 7: expected a value between 0 and 5"
        );
    }

    #[test]
    fn test_invalid_range_display() {
        let err = HifdhError::invalid_range(1, 5, 3, "start verse after end verse");
        assert_eq!(
            err.to_string(),
            "invalid range for chapter 1 (5-3): start verse after end verse"
        );
    }

    #[test]
    fn test_temporal_regression_display() {
        let err = HifdhError::temporal_regression("r0001", date(2026, 1, 1), date(2026, 1, 5));
        assert_eq!(
            err.to_string(),
            "date 2026-01-01 precedes last recorded date 2026-01-05 of record r0001"
        );
    }

    #[test]
    fn test_unknown_record_display() {
        let err = HifdhError::unknown_record("r0042");
        assert_eq!(err.to_string(), "unknown record: r0042");
    }

    #[test]
    fn test_storage_error_display() {
        let err = HifdhError::storage(
            "/tmp/records/r0001.json",
            io::Error::new(io::ErrorKind::NotFound, "file not found"),
        );
        assert!(err.to_string().contains("storage error"));
        assert!(err.to_string().contains("/tmp/records/r0001.json"));
    }

    #[test]
    fn test_user_facing_classification() {
        let user_facing = vec![
            HifdhError::invalid_rating(6),
            HifdhError::invalid_range(2, 0, 5, "verses start at 1"),
            HifdhError::temporal_regression("r1", date(2026, 1, 1), date(2026, 1, 2)),
            HifdhError::unknown_record("r1"),
        ];
        for err in user_facing {
            assert!(err.is_user_facing(), "{} should be user facing", err);
            assert!(!err.is_fatal());
            assert_eq!(err.exit_code(), exit_codes::REJECTED);
        }

        let faults = vec![
            HifdhError::serde("bad json"),
            HifdhError::config("bad toml"),
            HifdhError::duplicate_record("r0001"),
            HifdhError::from(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
        ];
        for err in faults {
            assert!(!err.is_user_facing());
            assert_eq!(err.exit_code(), exit_codes::FAULT);
        }
    }

    #[test]
    fn test_invariant_violation_is_fatal() {
        let err = HifdhError::invariant("manzil interval 0 outside 1..=30");
        assert!(err.is_fatal());
        assert!(!err.is_user_facing());
        assert_eq!(err.exit_code(), exit_codes::FATAL);
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: HifdhError = json_err.into();
        assert!(matches!(err, HifdhError::Serde { .. }));
    }

    #[test]
    fn test_fail_open_default() {
        let result: Result<Vec<String>> = Err(HifdhError::serde("test"));
        let value = result.fail_open_default("test context");
        assert!(value.is_empty());
    }

    #[test]
    fn test_fail_open_with() {
        let result: Result<i32> = Err(HifdhError::config("test"));
        assert_eq!(result.fail_open_with("test context", 42), 42);
    }

    #[test]
    fn test_fail_open_success() {
        let result: Result<i32> = Ok(100);
        assert_eq!(result.fail_open_default("test context"), 100);
    }
}
