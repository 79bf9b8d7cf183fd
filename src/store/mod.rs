//! Append-only statistics storage.
//!
//! Every accepted screenshot becomes one CSV row. The file is opened in append
//! mode for each write, so a crash never loses rows already written.

pub mod holidays;
pub mod users;

pub use holidays::{HolidayRecord, HolidayStore};
pub use users::{UserRecord, UserStore};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::ocr::ParsedStatistics;

/// CSV header row.
const CSV_HEADER: &str = "user_id,timestamp,duration_minutes,viewers,gifters,diamonds,source";
const CSV_COLUMNS: usize = 7;

/// One accepted stream session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: i64,
    pub recorded_at: DateTime<Local>,
    pub stats: ParsedStatistics,
    /// Where the numbers came from, usually the screenshot file name
    pub source: String,
}

impl SessionRecord {
    pub fn new(user_id: i64, stats: ParsedStatistics, source: impl Into<String>) -> Self {
        Self {
            user_id,
            recorded_at: Local::now(),
            stats,
            source: source.into(),
        }
    }

    fn to_csv_line(&self) -> String {
        // Source is the last column, so commas in it survive; line breaks do not.
        let source: String = self
            .source
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        format!(
            "{},{},{},{},{},{},{}",
            self.user_id,
            self.recorded_at.to_rfc3339(),
            self.stats.duration_minutes,
            self.stats.viewers,
            self.stats.gifters,
            self.stats.diamonds,
            source,
        )
    }

    fn parse_line(line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.splitn(CSV_COLUMNS, ',').collect();
        if parts.len() < CSV_COLUMNS {
            return Err(anyhow!("Expected {} columns, got {}", CSV_COLUMNS, parts.len()));
        }

        let number = |idx: usize, name: &str| -> Result<u64> {
            parts[idx]
                .trim()
                .parse::<u64>()
                .with_context(|| format!("Invalid {}", name))
        };

        let user_id = parts[0].trim().parse::<i64>().context("Invalid user id")?;
        let recorded_at = DateTime::parse_from_rfc3339(parts[1].trim())
            .context("Invalid timestamp")?
            .with_timezone(&Local);

        Ok(Self {
            user_id,
            recorded_at,
            stats: ParsedStatistics {
                duration_minutes: number(2, "duration")?,
                viewers: number(3, "viewers")?,
                gifters: number(4, "gifters")?,
                diamonds: number(5, "diamonds")?,
            },
            source: parts[6].to_string(),
        })
    }
}

/// Somewhere accepted sessions are kept.
pub trait StatisticsStore {
    fn append(&self, record: &SessionRecord) -> Result<()>;
}

/// Statistics kept in a CSV file.
#[derive(Debug, Clone)]
pub struct CsvStatisticsStore {
    path: PathBuf,
}

impl CsvStatisticsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<SessionRecord>> {
        load_records(&self.path)
    }
}

impl StatisticsStore for CsvStatisticsStore {
    fn append(&self, record: &SessionRecord) -> Result<()> {
        let needs_header = std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .context("Failed to open statistics CSV for append")?;

        if needs_header {
            writeln!(file, "{}", CSV_HEADER).context("Failed to write CSV header")?;
        }
        writeln!(file, "{}", record.to_csv_line()).context("Failed to write CSV row")?;

        info!(
            user_id = record.user_id,
            duration = record.stats.duration_minutes,
            viewers = record.stats.viewers,
            gifters = record.stats.gifters,
            diamonds = record.stats.diamonds,
            "session recorded"
        );
        Ok(())
    }
}

/// Loads every session from a statistics CSV.
///
/// A missing file means no sessions yet. The header, blank lines and
/// malformed rows are skipped; malformed rows are logged.
pub fn load_records(path: &Path) -> Result<Vec<SessionRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result.context("Failed to read line from CSV")?;

        if line_num == 0 || line.trim().is_empty() {
            continue;
        }

        match SessionRecord::parse_line(&line) {
            Ok(record) => records.push(record),
            Err(e) => warn!(row = line_num + 1, error = %e, "skipping malformed CSV row"),
        }
    }

    Ok(records)
}
