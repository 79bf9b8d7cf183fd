//! CSV and JSON export of report data.

use super::{DailyRow, UserDailyReport, UserSummary};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

const SUMMARY_HEADER: &str = "nickname,user_id,active_days,holiday_days,sessions,total_duration_min,total_viewers,total_gifters,total_diamonds,avg_duration_min,avg_viewers,avg_diamonds,max_diamonds,last_stream";
const DAILY_HEADER: &str = "date,sessions,total_duration_min,total_viewers,total_gifters,total_diamonds,is_holiday";

/// Quotes a CSV field when it contains a separator, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Export per-user summaries to a CSV file.
pub fn export_summary_csv(summaries: &[UserSummary], output_path: &Path) -> Result<()> {
    let mut file = File::create(output_path)
        .with_context(|| format!("Failed to create CSV file: {}", output_path.display()))?;

    writeln!(file, "{}", SUMMARY_HEADER).context("Failed to write CSV header")?;
    for s in summaries {
        let last_stream = s
            .last_stream
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        writeln!(
            file,
            "{},{},{},{},{},{},{},{},{},{:.2},{:.2},{:.2},{},{}",
            csv_field(&s.nickname.clone().unwrap_or_default()),
            s.user_id,
            s.active_days,
            s.holiday_days,
            s.sessions,
            s.total_duration,
            s.total_viewers,
            s.total_gifters,
            s.total_diamonds,
            s.avg_duration(),
            s.avg_viewers(),
            s.avg_diamonds(),
            s.max_diamonds,
            last_stream,
        )
        .context("Failed to write CSV row")?;
    }

    Ok(())
}

/// Export one user's per-day rows to a CSV file.
pub fn export_daily_csv(rows: &[DailyRow], output_path: &Path) -> Result<()> {
    let mut file = File::create(output_path)
        .with_context(|| format!("Failed to create CSV file: {}", output_path.display()))?;

    writeln!(file, "{}", DAILY_HEADER).context("Failed to write CSV header")?;
    for row in rows {
        writeln!(
            file,
            "{},{},{},{},{},{},{}",
            row.date.format("%Y-%m-%d"),
            row.sessions,
            row.total_duration,
            row.total_viewers,
            row.total_gifters,
            row.total_diamonds,
            row.is_holiday,
        )
        .context("Failed to write CSV row")?;
    }

    Ok(())
}

/// File name for one user's detailed CSV, unique per user id.
fn detail_file_name(report: &UserDailyReport) -> String {
    let safe: String = report
        .nickname
        .as_deref()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .replace(' ', "_");

    if safe.is_empty() {
        format!("tiktok_detail_{}.csv", report.user_id)
    } else {
        format!("tiktok_detail_{}_{}.csv", safe, report.user_id)
    }
}

/// Writes one daily CSV per user into `dir` and returns the written paths.
pub fn export_all_daily_csv(reports: &[UserDailyReport], dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let mut written = Vec::with_capacity(reports.len());
    for report in reports {
        let path = dir.join(detail_file_name(report));
        export_daily_csv(&report.rows, &path)?;
        written.push(path);
    }

    info!(files = written.len(), dir = %dir.display(), "per-user CSV files exported");
    Ok(written)
}

/// Export any report data to a JSON file.
///
/// The output is pretty-printed for human readability.
pub fn export_to_json<T: Serialize + ?Sized>(data: &T, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(data).context("Failed to serialize report to JSON")?;

    let mut file = File::create(output_path)
        .with_context(|| format!("Failed to create JSON file: {}", output_path.display()))?;

    file.write_all(json.as_bytes())
        .context("Failed to write JSON data")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn summary() -> UserSummary {
        UserSummary {
            user_id: 7,
            nickname: Some("name, with comma".to_string()),
            sessions: 2,
            active_days: 1,
            holiday_days: 3,
            total_duration: 410,
            total_viewers: 9800,
            total_gifters: 122,
            total_diamonds: 37_800,
            max_viewers: 4900,
            max_diamonds: 18_900,
            last_stream: None,
        }
    }

    fn daily_row(day: u32) -> DailyRow {
        DailyRow {
            date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            sessions: 1,
            total_duration: 205,
            total_viewers: 4900,
            total_gifters: 61,
            total_diamonds: 18_900,
            is_holiday: false,
        }
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_export_summary_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("summary.csv");

        export_summary_csv(&[summary()], &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], SUMMARY_HEADER);
        assert_eq!(
            lines[1],
            "\"name, with comma\",7,1,3,2,410,9800,122,37800,205.00,4900.00,18900.00,18900,"
        );
    }

    #[test]
    fn test_export_daily_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("daily.csv");
        let rows = vec![
            daily_row(14),
            DailyRow {
                date: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
                is_holiday: true,
                ..DailyRow::default()
            },
        ];

        export_daily_csv(&rows, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], DAILY_HEADER);
        assert_eq!(lines[1], "2025-03-14,1,205,4900,61,18900,false");
        assert_eq!(lines[2], "2025-03-15,0,0,0,0,0,true");
    }

    #[test]
    fn test_detail_file_names() {
        let report = |user_id, nickname: Option<&str>| UserDailyReport {
            user_id,
            nickname: nickname.map(str::to_string),
            rows: Vec::new(),
        };

        assert_eq!(
            detail_file_name(&report(7, Some("star girl"))),
            "tiktok_detail_star_girl_7.csv"
        );
        assert_eq!(
            detail_file_name(&report(8, Some("../evil/name"))),
            "tiktok_detail_evilname_8.csv"
        );
        assert_eq!(detail_file_name(&report(9, None)), "tiktok_detail_9.csv");
        assert_eq!(detail_file_name(&report(10, Some("***"))), "tiktok_detail_10.csv");
    }

    #[test]
    fn test_export_all_daily_csv_writes_one_file_per_user() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("package");
        let reports = vec![
            UserDailyReport {
                user_id: 1,
                nickname: Some("alpha".to_string()),
                rows: vec![daily_row(14)],
            },
            UserDailyReport {
                user_id: 2,
                nickname: Some("alpha".to_string()),
                rows: vec![daily_row(15)],
            },
        ];

        let written = export_all_daily_csv(&reports, &out).unwrap();

        assert_eq!(
            written,
            vec![
                out.join("tiktok_detail_alpha_1.csv"),
                out.join("tiktok_detail_alpha_2.csv")
            ]
        );
        let second = std::fs::read_to_string(&written[1]).unwrap();
        assert!(second.ends_with("2025-03-15,1,205,4900,61,18900,false\n"));
    }

    #[test]
    fn test_export_to_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("summary.json");

        export_to_json(&[summary()], &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"user_id\": 7"));
        assert!(content.contains("\"total_diamonds\": 37800"));
        assert!(content.contains("\"last_stream\": null"));
    }
}
