//! TikTok Live statistics tool
//!
//! Reads the post-stream statistics panel from screenshots, keeps the numbers
//! per streamer and prints or exports period reports.

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{info, warn};

use tiktok_live_stats::config::{self, AppConfig};
use tiktok_live_stats::ocr::{self, ScreenshotProcessor, TesseractCli};
use tiktok_live_stats::report::{self, Period};
use tiktok_live_stats::store::{
    self, CsvStatisticsStore, HolidayStore, SessionRecord, StatisticsStore, UserStore,
};
use tiktok_live_stats::worker::{self, WorkItem, WorkOutcome};
use tiktok_live_stats::{logging, paths};

#[derive(Parser, Debug)]
#[command(
    name = "tiktok-live-stats",
    version,
    about = "Extract and report TikTok Live statistics from screenshots"
)]
struct Cli {
    /// Path to config.json (default: <data dir>/config.json)
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides config and TIKTOK_STATS_DATA_DIR)
    #[arg(long = "data-dir", global = true)]
    data_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum HolidayAction {
    /// Mark a day as a day off (default today)
    Add {
        #[arg(short = 'u', long = "user")]
        user: i64,
        #[arg(short = 'd', long = "date")]
        date: Option<NaiveDate>,
    },
    /// Unmark a day off
    Remove {
        #[arg(short = 'u', long = "user")]
        user: i64,
        #[arg(short = 'd', long = "date")]
        date: NaiveDate,
    },
    /// List a user's days off
    List {
        #[arg(short = 'u', long = "user")]
        user: i64,
    },
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract statistics from a screenshot and print them
    Extract {
        image: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Extract statistics from a screenshot and record them for a user
    Record {
        #[arg(short = 'u', long = "user")]
        user: i64,
        image: PathBuf,
    },
    /// Queue several screenshots for a user and record them through the worker
    Batch {
        #[arg(short = 'u', long = "user")]
        user: i64,
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Register a user's TikTok nickname
    Register {
        #[arg(short = 'u', long = "user")]
        user: i64,
        nickname: String,
    },
    /// Print a report for one user or for everyone
    Report {
        /// day, week, month or days:N
        #[arg(short = 'p', long = "period", default_value = "day")]
        period: String,
        #[arg(short = 'u', long = "user")]
        user: Option<i64>,
        /// Last day of the period (YYYY-MM-DD, default today)
        #[arg(short = 'd', long = "date")]
        date: Option<NaiveDate>,
        /// Also print the per-day breakdown (with --user)
        #[arg(long)]
        daily: bool,
    },
    /// Print the users with the most diamonds
    Leaderboard {
        #[arg(short = 'p', long = "period", default_value = "week")]
        period: String,
        #[arg(short = 'n', long = "limit", default_value_t = 10)]
        limit: usize,
        #[arg(short = 'd', long = "date")]
        date: Option<NaiveDate>,
    },
    /// Export a summary (or one user's daily rows) to CSV or JSON
    Export {
        #[arg(short = 'p', long = "period", default_value = "days:30")]
        period: String,
        /// Output file; .json exports JSON, anything else CSV.
        /// With --all-users a directory that receives one CSV per user.
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
        #[arg(short = 'u', long = "user", conflicts_with = "all_users")]
        user: Option<i64>,
        /// Daily rows for every user
        #[arg(long = "all-users")]
        all_users: bool,
        #[arg(short = 'd', long = "date")]
        date: Option<NaiveDate>,
    },
    /// Manage a user's days off
    Holiday {
        #[command(subcommand)]
        action: HolidayAction,
    },
    /// Check that Tesseract and its language data work
    Check,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = config::load_config(cli.config.as_deref());
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }
    let data_dir = config.data_dir();
    paths::ensure_directories(&data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;
    logging::init(cli.verbose, &paths::get_logs_dir(&data_dir))?;
    info!(data_dir = %data_dir.display(), "starting");

    match cli.command {
        Command::Extract { image, json } => cmd_extract(&config, &image, json),
        Command::Record { user, image } => cmd_record(&config, user, &image),
        Command::Batch { user, images } => cmd_batch(&config, user, &images),
        Command::Register { user, nickname } => cmd_register(&config, user, &nickname),
        Command::Report {
            period,
            user,
            date,
            daily,
        } => cmd_report(&config, &period, user, date, daily),
        Command::Leaderboard {
            period,
            limit,
            date,
        } => cmd_leaderboard(&config, &period, limit, date),
        Command::Export {
            period,
            output,
            user,
            all_users,
            date,
        } => {
            let target = match (user, all_users) {
                (Some(user_id), _) => ExportTarget::User(user_id),
                (None, true) => ExportTarget::AllUsers,
                (None, false) => ExportTarget::Summary,
            };
            cmd_export(&config, &period, &output, target, date)
        }
        Command::Holiday { action } => cmd_holiday(&config, action),
        Command::Check => cmd_check(&config),
    }
}

fn build_processor(config: &AppConfig) -> Result<ScreenshotProcessor<TesseractCli>> {
    let tesseract = ocr::ensure_tesseract(config)?;
    let recognizer = TesseractCli::new(
        tesseract.executable,
        tesseract.tessdata,
        config.ocr_languages.clone(),
    );
    let processor = ScreenshotProcessor::new(recognizer);
    Ok(match &config.scratch_dir {
        Some(dir) => processor.with_scratch_root(dir),
        None => processor,
    })
}

fn stats_store(config: &AppConfig) -> CsvStatisticsStore {
    CsvStatisticsStore::new(paths::get_stats_csv_path(&config.data_dir()))
}

fn user_store(config: &AppConfig) -> Result<UserStore> {
    UserStore::open(paths::get_users_path(&config.data_dir()))
}

fn holiday_store(config: &AppConfig) -> Result<HolidayStore> {
    HolidayStore::open(paths::get_holidays_path(&config.data_dir()))
}

fn parse_period(period: &str, date: Option<NaiveDate>) -> Result<Period> {
    Period::parse(period, date.unwrap_or_else(|| Local::now().date_naive()))
}

fn print_stats(stats: &ocr::ParsedStatistics) {
    println!("Тривалість: {}", report::format_duration(stats.duration_minutes));
    println!("Глядачі: {}", stats.viewers);
    println!("Дарувальники: {}", stats.gifters);
    println!("Діаманти: {}", stats.diamonds);
}

fn cmd_extract(config: &AppConfig, image: &Path, json: bool) -> Result<()> {
    let processor = build_processor(config)?;
    let stats = processor.process_file(image)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_stats(&stats);
    }
    Ok(())
}

fn cmd_record(config: &AppConfig, user: i64, image: &Path) -> Result<()> {
    let processor = build_processor(config)?;
    let stats = processor.process_file(image)?;

    let source = image
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    stats_store(config).append(&SessionRecord::new(user, stats, source))?;

    let mut users = user_store(config)?;
    if !users.touch(user)? {
        warn!(user_id = user, "recording statistics for an unregistered user");
    }

    print_stats(&stats);
    Ok(())
}

fn cmd_batch(config: &AppConfig, user: i64, images: &[PathBuf]) -> Result<()> {
    let processor = build_processor(config)?;
    let store = stats_store(config);
    let inbox = paths::get_screenshots_dir(&config.data_dir());
    let delete_screenshots = config.delete_screenshots;

    let (sender, receiver) = worker::create_work_queue();
    let (outcome_tx, outcome_rx) = std::sync::mpsc::channel();

    let handle = thread::spawn(move || {
        worker::run_worker(receiver, &processor, &store, Some(&outcome_tx), delete_screenshots);
    });

    // The worker owns and deletes what it is given, so it gets copies.
    for (i, image) in images.iter().enumerate() {
        let file_name = image
            .file_name()
            .ok_or_else(|| anyhow!("Not a file: {}", image.display()))?;
        let queued = inbox.join(format!("{}_{}_{}", user, i, file_name.to_string_lossy()));
        std::fs::copy(image, &queued)
            .with_context(|| format!("Failed to queue {}", image.display()))?;
        sender.send(WorkItem::new(user, queued))?;
    }
    drop(sender);

    let (mut recorded, mut failed) = (0usize, 0usize);
    for outcome in outcome_rx {
        match outcome {
            WorkOutcome::Recorded { stats, .. } => {
                recorded += 1;
                println!(
                    "OK: {} | {} | {} | {}",
                    report::format_duration(stats.duration_minutes),
                    stats.viewers,
                    stats.gifters,
                    stats.diamonds
                );
            }
            WorkOutcome::Rejected { error, .. } => {
                failed += 1;
                println!("Не вдалося розпізнати: {}", error);
            }
            WorkOutcome::StoreFailed { error, .. } => {
                failed += 1;
                println!("Не вдалося зберегти: {:#}", error);
            }
        }
    }

    handle
        .join()
        .map_err(|_| anyhow!("Screenshot worker panicked"))?;

    if recorded > 0 {
        let mut users = user_store(config)?;
        users.touch(user)?;
    }
    println!("Оброблено: {}, помилок: {}", recorded, failed);
    Ok(())
}

fn cmd_register(config: &AppConfig, user: i64, nickname: &str) -> Result<()> {
    let nickname = nickname.trim().trim_start_matches('@');
    if nickname.is_empty() {
        return Err(anyhow!("Nickname must not be empty"));
    }

    let mut users = user_store(config)?;
    let record = users.register(user, nickname)?;
    println!(
        "{} зареєстровано ({})",
        record.nickname,
        record.registered_at.format("%d.%m.%Y")
    );
    Ok(())
}

fn cmd_report(
    config: &AppConfig,
    period: &str,
    user: Option<i64>,
    date: Option<NaiveDate>,
    daily: bool,
) -> Result<()> {
    let period = parse_period(period, date)?;
    let records = stats_store(config).load()?;
    let users = user_store(config)?;
    let holidays = holiday_store(config)?;

    let mut summaries = report::summarize(&records, &period);
    report::attach_nicknames(&mut summaries, &users);

    match user {
        Some(user_id) => {
            let mut summary = summaries
                .into_iter()
                .find(|s| s.user_id == user_id)
                .unwrap_or_else(|| report::UserSummary {
                    user_id,
                    nickname: users.nickname(user_id).map(str::to_string),
                    ..Default::default()
                });
            report::attach_holidays(std::slice::from_mut(&mut summary), &holidays, &period);
            println!("{}", report::render_user_report(&summary, &period));
            if daily {
                let mut rows = report::daily_breakdown(&records, user_id, &period);
                report::mark_holidays(&mut rows, user_id, &holidays);
                println!("{}", report::render_daily_rows(&rows));
            }
        }
        None => println!("{}", report::render_period_report(&summaries, &period)),
    }
    Ok(())
}

fn cmd_leaderboard(
    config: &AppConfig,
    period: &str,
    limit: usize,
    date: Option<NaiveDate>,
) -> Result<()> {
    let period = parse_period(period, date)?;
    let records = stats_store(config).load()?;
    let users = user_store(config)?;

    let mut top = report::leaderboard(&records, &period, limit);
    report::attach_nicknames(&mut top, &users);

    println!(
        "{}",
        report::render_summary_table(&top, &format!("Рейтинг за {}", period))
    );
    Ok(())
}

enum ExportTarget {
    Summary,
    User(i64),
    AllUsers,
}

fn cmd_export(
    config: &AppConfig,
    period: &str,
    output: &Path,
    target: ExportTarget,
    date: Option<NaiveDate>,
) -> Result<()> {
    let period = parse_period(period, date)?;
    let records = store::load_records(&paths::get_stats_csv_path(&config.data_dir()))?;
    let holidays = holiday_store(config)?;
    let as_json = output
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    match target {
        ExportTarget::User(user_id) => {
            let mut rows = report::daily_breakdown(&records, user_id, &period);
            report::mark_holidays(&mut rows, user_id, &holidays);
            if as_json {
                report::export_to_json(&rows, output)?;
            } else {
                report::export_daily_csv(&rows, output)?;
            }
        }
        ExportTarget::AllUsers => {
            let reports =
                report::all_users_daily(&records, &user_store(config)?, &holidays, &period);
            if as_json {
                report::export_to_json(&reports, output)?;
            } else {
                let written = report::export_all_daily_csv(&reports, output)?;
                for path in &written {
                    println!("{}", path.display());
                }
            }
        }
        ExportTarget::Summary => {
            let mut summaries = report::summarize(&records, &period);
            report::attach_nicknames(&mut summaries, &user_store(config)?);
            report::attach_holidays(&mut summaries, &holidays, &period);
            if as_json {
                report::export_to_json(&summaries, output)?;
            } else {
                report::export_summary_csv(&summaries, output)?;
            }
        }
    }

    info!(path = %output.display(), "report exported");
    println!("Експортовано: {}", output.display());
    Ok(())
}

fn cmd_holiday(config: &AppConfig, action: HolidayAction) -> Result<()> {
    let mut holidays = holiday_store(config)?;

    match action {
        HolidayAction::Add { user, date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            if holidays.add(user, date)? {
                println!("Вихідний {} додано", date.format("%d.%m.%Y"));
            } else {
                println!("{} вже є вихідним", date.format("%d.%m.%Y"));
            }
        }
        HolidayAction::Remove { user, date } => {
            if holidays.remove(user, date)? {
                println!("Вихідний {} видалено", date.format("%d.%m.%Y"));
            } else {
                println!("{} не є вихідним", date.format("%d.%m.%Y"));
            }
        }
        HolidayAction::List { user } => {
            let dates = holidays.list(user);
            if dates.is_empty() {
                println!("Вихідних днів немає");
            }
            for date in dates {
                println!("{}", date.format("%d.%m.%Y"));
            }
        }
    }
    Ok(())
}

fn cmd_check(config: &AppConfig) -> Result<()> {
    let processor = build_processor(config)?;
    processor.check_installation()?;
    println!("Tesseract працює ({})", processor.recognizer().executable.display());
    Ok(())
}
