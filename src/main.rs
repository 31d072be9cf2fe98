//! Hifdh - Quran memorization tracker
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hifdh::config::{hifdh_home, Config};
use hifdh::core::StageKind;
use hifdh::error::exit_codes;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "HIFDH_LOG";

// =============================================================================
// CLI Definition
// =============================================================================

/// Hifdh - sabak, sabki and manzil scheduling for Quran memorization
#[derive(Parser)]
#[command(name = "hifdh")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize Hifdh in the current directory
    Init {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
        /// Overwrite an existing config file
        #[arg(long, short)]
        force: bool,
    },

    /// Start a new lesson (sabak)
    Add {
        /// Chapter number (1-114)
        chapter: u16,
        /// First verse
        start: u16,
        /// Last verse (inclusive)
        end: u16,
        /// Target completion date (YYYY-MM-DD); defaults to today
        #[arg(long, short)]
        target: Option<NaiveDate>,
        /// Free-text note
        #[arg(long, short)]
        note: Option<String>,
        /// Treat this date as today (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Record a review with a quality rating (0-5)
    Review {
        /// Record ID (e.g. r0001)
        record_id: String,
        /// Quality rating, 0 (forgotten) to 5 (perfect)
        rating: u8,
        /// Treat this date as today (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Show what is due today
    Today {
        /// Treat this date as today (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Show manzil reviews coming up
    Upcoming {
        /// Horizon in days
        #[arg(long, short)]
        days: Option<u32>,
        /// Treat this date as today (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// List memorization records
    List {
        /// Only show one stage (sabak, sabki, manzil)
        #[arg(long, short)]
        stage: Option<StageKind>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Show progress statistics
    Stats {
        /// Include juz progress, quality trend and activity calendar
        #[arg(long, short)]
        detailed: bool,
        /// Force rebuild of the stats cache
        #[arg(long)]
        rebuild: bool,
        /// Treat this date as today (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Show the chapter table
    Chapters {
        /// Show a single chapter
        chapter: Option<u16>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();
    init_tracing();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("hifdh error: {}", e);
            to_exit_code(exit_codes::FAULT)
        }
    }
}

/// Set up the global panic handler.
///
/// On panic, logs to ~/.hifdh/crash.log and exits with code 3.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("hifdh panic: {}", info);

        if let Some(home) = hifdh_home() {
            let crash_log = home.join("crash.log");
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::FATAL);
    }));
}

/// Install the stderr log subscriber, filtered by `HIFDH_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .init();
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Init { json, quiet, force } => run_init(json, quiet, force, &cwd),
        Commands::Add {
            chapter,
            start,
            end,
            target,
            note,
            date,
            json,
            quiet,
        } => run_add(chapter, start, end, target, note, date, json, quiet, &cwd),
        Commands::Review {
            record_id,
            rating,
            date,
            json,
            quiet,
        } => run_review(record_id, rating, date, json, quiet, &cwd),
        Commands::Today { date, json, quiet } => run_today(date, json, quiet, &cwd),
        Commands::Upcoming {
            days,
            date,
            json,
            quiet,
        } => run_upcoming(days, date, json, quiet, &cwd),
        Commands::List { stage, json, quiet } => run_list(stage, json, quiet, &cwd),
        Commands::Stats {
            detailed,
            rebuild,
            date,
            json,
            quiet,
        } => run_stats(detailed, rebuild, date, json, quiet, &cwd),
        Commands::Chapters {
            chapter,
            json,
            quiet,
        } => run_chapters(chapter, json, quiet),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

/// Convert a command exit code to a process exit code.
fn to_exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(exit_codes::FAULT as u8))
}

/// The effective "today": `--date` if given, else the local calendar date.
fn resolve_today(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| chrono::Local::now().date_naive())
}

fn print_formatted(formatted: &str) {
    if !formatted.is_empty() {
        println!("{}", formatted);
    }
}

fn run_init(
    json: bool,
    quiet: bool,
    force: bool,
    cwd: &Path,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use hifdh::cli::init::{InitCommand, InitOptions};

    let cmd = InitCommand::new(Config::load_from_cwd(cwd), cwd);
    let options = InitOptions { json, quiet, force };

    let output = cmd.run(&options);
    print_formatted(&cmd.format_output(&output, &options));

    Ok(to_exit_code(output.exit_code))
}

#[allow(clippy::too_many_arguments)]
fn run_add(
    chapter: u16,
    start_verse: u16,
    end_verse: u16,
    target: Option<NaiveDate>,
    note: Option<String>,
    date: Option<NaiveDate>,
    json: bool,
    quiet: bool,
    cwd: &Path,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use hifdh::cli::add::{AddCommand, AddOptions};

    let cmd = AddCommand::new(Config::load_from_cwd(cwd), cwd);
    let options = AddOptions {
        json,
        quiet,
        chapter,
        start_verse,
        end_verse,
        today: resolve_today(date),
        target,
        note,
    };

    let output = cmd.run(&options);
    print_formatted(&cmd.format_output(&output, &options));

    Ok(to_exit_code(output.exit_code))
}

fn run_review(
    record_id: String,
    rating: u8,
    date: Option<NaiveDate>,
    json: bool,
    quiet: bool,
    cwd: &Path,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use hifdh::cli::review::{ReviewCommand, ReviewOptions};

    let cmd = ReviewCommand::new(Config::load_from_cwd(cwd), cwd);
    let options = ReviewOptions {
        json,
        quiet,
        record_id,
        rating,
        today: resolve_today(date),
    };

    let output = cmd.run(&options);
    print_formatted(&cmd.format_output(&output, &options));

    Ok(to_exit_code(output.exit_code))
}

fn run_today(
    date: Option<NaiveDate>,
    json: bool,
    quiet: bool,
    cwd: &Path,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use hifdh::cli::today::{TodayCommand, TodayOptions};

    let cmd = TodayCommand::new(Config::load_from_cwd(cwd), cwd);
    let options = TodayOptions {
        json,
        quiet,
        today: resolve_today(date),
    };

    let output = cmd.run(&options);
    print_formatted(&cmd.format_output(&output, &options));

    Ok(to_exit_code(output.exit_code))
}

fn run_upcoming(
    days: Option<u32>,
    date: Option<NaiveDate>,
    json: bool,
    quiet: bool,
    cwd: &Path,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use hifdh::cli::upcoming::{UpcomingCommand, UpcomingOptions};

    let cmd = UpcomingCommand::new(Config::load_from_cwd(cwd), cwd);
    let options = UpcomingOptions {
        json,
        quiet,
        days,
        today: resolve_today(date),
    };

    let output = cmd.run(&options);
    print_formatted(&cmd.format_output(&output, &options));

    Ok(to_exit_code(output.exit_code))
}

fn run_list(
    stage: Option<StageKind>,
    json: bool,
    quiet: bool,
    cwd: &Path,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use hifdh::cli::list::{ListCommand, ListOptions};

    let cmd = ListCommand::new(Config::load_from_cwd(cwd), cwd);
    let options = ListOptions { json, quiet, stage };

    let output = cmd.run(&options);
    print_formatted(&cmd.format_output(&output, &options));

    Ok(to_exit_code(output.exit_code))
}

fn run_stats(
    detailed: bool,
    rebuild: bool,
    date: Option<NaiveDate>,
    json: bool,
    quiet: bool,
    cwd: &Path,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use hifdh::cli::stats::{StatsCommand, StatsOptions};

    let cmd = StatsCommand::new(Config::load_from_cwd(cwd), cwd);
    let options = StatsOptions {
        json,
        quiet,
        detailed,
        rebuild,
        today: resolve_today(date),
    };

    let output = cmd.run(&options);
    print_formatted(&cmd.format_output(&output, &options));

    Ok(to_exit_code(output.exit_code))
}

fn run_chapters(
    chapter: Option<u16>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use hifdh::cli::chapters::{ChaptersCommand, ChaptersOptions};

    let cmd = ChaptersCommand::new();
    let options = ChaptersOptions {
        json,
        quiet,
        chapter,
    };

    let output = cmd.run(&options);
    print_formatted(&cmd.format_output(&output, &options));

    Ok(to_exit_code(output.exit_code))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_codes::SUCCESS, 0);
        assert_eq!(exit_codes::REJECTED, 1);
        assert_eq!(exit_codes::FAULT, 2);
        assert_eq!(exit_codes::FATAL, 3);
    }

    #[test]
    fn test_to_exit_code() {
        assert_eq!(to_exit_code(0), ExitCode::from(0));
        assert_eq!(to_exit_code(1), ExitCode::from(1));
        assert_eq!(to_exit_code(-1), ExitCode::from(exit_codes::FAULT as u8));
    }

    #[test]
    fn test_resolve_today_prefers_flag() {
        assert_eq!(resolve_today(Some(date(2026, 1, 2))), date(2026, 1, 2));
    }

    #[test]
    fn test_cli_parse_add() {
        let cli = Cli::parse_from([
            "hifdh",
            "add",
            "2",
            "1",
            "5",
            "--target",
            "2026-10-21",
            "--note",
            "slow",
            "--date",
            "2026-10-19",
        ]);
        match cli.command {
            Commands::Add {
                chapter,
                start,
                end,
                target,
                note,
                date: today,
                json,
                quiet,
            } => {
                assert_eq!((chapter, start, end), (2, 1, 5));
                assert_eq!(target, Some(date(2026, 10, 21)));
                assert_eq!(note.as_deref(), Some("slow"));
                assert_eq!(today, Some(date(2026, 10, 19)));
                assert!(!json && !quiet);
            }
            _ => panic!("Expected Add command"),
        }
    }

    #[test]
    fn test_cli_parse_review() {
        let cli = Cli::parse_from(["hifdh", "review", "r0001", "4", "-j"]);
        match cli.command {
            Commands::Review {
                record_id,
                rating,
                date,
                json,
                ..
            } => {
                assert_eq!(record_id, "r0001");
                assert_eq!(rating, 4);
                assert!(date.is_none());
                assert!(json);
            }
            _ => panic!("Expected Review command"),
        }
    }

    #[test]
    fn test_cli_parse_list_stage() {
        let cli = Cli::parse_from(["hifdh", "list", "--stage", "manzil"]);
        match cli.command {
            Commands::List { stage, .. } => assert_eq!(stage, Some(StageKind::Manzil)),
            _ => panic!("Expected List command"),
        }

        assert!(Cli::try_parse_from(["hifdh", "list", "--stage", "hifz"]).is_err());
    }

    #[test]
    fn test_cli_parse_upcoming() {
        let cli = Cli::parse_from(["hifdh", "upcoming", "--days", "14", "-q"]);
        match cli.command {
            Commands::Upcoming { days, quiet, .. } => {
                assert_eq!(days, Some(14));
                assert!(quiet);
            }
            _ => panic!("Expected Upcoming command"),
        }
    }

    #[test]
    fn test_cli_parse_stats() {
        let cli = Cli::parse_from(["hifdh", "stats", "--detailed", "--rebuild"]);
        match cli.command {
            Commands::Stats {
                detailed, rebuild, ..
            } => {
                assert!(detailed);
                assert!(rebuild);
            }
            _ => panic!("Expected Stats command"),
        }
    }

    #[test]
    fn test_cli_parse_rejects_bad_date() {
        assert!(Cli::try_parse_from(["hifdh", "today", "--date", "19/10/2026"]).is_err());
    }

    #[test]
    fn test_cli_parse_init_and_chapters() {
        let cli = Cli::parse_from(["hifdh", "init", "--force"]);
        assert!(matches!(cli.command, Commands::Init { force: true, .. }));

        let cli = Cli::parse_from(["hifdh", "chapters", "36"]);
        assert!(matches!(
            cli.command,
            Commands::Chapters {
                chapter: Some(36),
                ..
            }
        ));
    }
}
