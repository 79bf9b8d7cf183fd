//! Text rendering of summaries for chat messages and the terminal.

use super::{DailyRow, Period, UserSummary};

/// Rows shown in the summary table.
const TABLE_ROWS: usize = 15;
const TABLE_WIDTH: usize = 45;
/// Cells are cut to this many characters to keep columns aligned.
const CELL_CHARS: usize = 7;

/// `45 хв`, `3 год`, `3 год 25 хв`
pub fn format_duration(minutes: u64) -> String {
    if minutes < 60 {
        return format!("{} хв", minutes);
    }

    let hours = minutes / 60;
    let remaining = minutes % 60;
    if remaining == 0 {
        format!("{} год", hours)
    } else {
        format!("{} год {} хв", hours, remaining)
    }
}

/// `950`, `4.9K`, `1.2M`, rounded to one decimal place.
pub fn format_number(number: u64) -> String {
    let with_suffix = |unit: u64, suffix: char| {
        let tenths = number / (unit / 10) + u64::from(number % (unit / 10) >= unit / 20);
        format!("{}.{}{}", tenths / 10, tenths % 10, suffix)
    };

    if number >= 1_000_000 {
        with_suffix(1_000_000, 'M')
    } else if number >= 1_000 {
        with_suffix(1_000, 'K')
    } else {
        number.to_string()
    }
}

fn cell(text: &str) -> String {
    text.chars().take(CELL_CHARS).collect()
}

fn table_line(name: &str, sessions: u64, duration: u64, diamonds: u64) -> String {
    format!(
        "{:<15} {:>6} {:>8} {:>8}\n",
        name,
        sessions,
        cell(&format_duration(duration)),
        cell(&format_number(diamonds)),
    )
}

/// Table of the top users with a total line over the shown rows.
pub fn render_summary_table(summaries: &[UserSummary], title: &str) -> String {
    if summaries.is_empty() {
        return format!("{}\n\nНемає даних для відображення.", title);
    }

    let mut out = format!("{}\n\n", title);
    out.push_str(&format!(
        "{:<15} {:>6} {:>8} {:>8}\n",
        "Користувач", "Ефіри", "Тривал", "Алмази"
    ));
    out.push_str(&"-".repeat(TABLE_WIDTH));
    out.push('\n');

    let (mut sessions, mut duration, mut diamonds) = (0u64, 0u64, 0u64);
    for summary in summaries.iter().take(TABLE_ROWS) {
        let name: String = summary.display_name().chars().take(14).collect();
        out.push_str(&table_line(
            &name,
            summary.sessions,
            summary.total_duration,
            summary.total_diamonds,
        ));
        sessions += summary.sessions;
        duration = duration.saturating_add(summary.total_duration);
        diamonds = diamonds.saturating_add(summary.total_diamonds);
    }

    out.push_str(&"-".repeat(TABLE_WIDTH));
    out.push('\n');
    out.push_str(&table_line("ВСЬОГО", sessions, duration, diamonds));

    out.push_str(&format!("\nВсього користувачів у звіті: {}", summaries.len()));
    if summaries.len() > TABLE_ROWS {
        out.push_str(&format!(
            "\nПоказано топ {} з {}",
            TABLE_ROWS,
            summaries.len()
        ));
    }
    out
}

/// One user's statistics for a period.
pub fn render_user_report(summary: &UserSummary, period: &Period) -> String {
    format!(
        "Статистика {} ({})\n\
         \n\
         Всього ефірів: {}\n\
         Активних днів: {}\n\
         Вихідних днів: {}\n\
         Загальна тривалість: {}\n\
         Всього глядачів: {}\n\
         Всього дарувальників: {}\n\
         Всього алмазів: {}\n\
         \n\
         Середня тривалість ефіру: {}\n\
         Максимум глядачів за ефір: {}\n\
         Максимум алмазів за ефір: {}\n",
        summary.display_name(),
        period,
        summary.sessions,
        summary.active_days,
        summary.holiday_days,
        format_duration(summary.total_duration),
        format_number(summary.total_viewers),
        format_number(summary.total_gifters),
        format_number(summary.total_diamonds),
        format_duration(summary.avg_duration() as u64),
        format_number(summary.max_viewers),
        format_number(summary.max_diamonds),
    )
}

/// Overall report for a period: activity totals and the top 3 by diamonds.
pub fn render_period_report(summaries: &[UserSummary], period: &Period) -> String {
    let sessions: u64 = summaries.iter().map(|s| s.sessions).sum();
    let duration: u64 = summaries.iter().map(|s| s.total_duration).sum();
    let viewers: u64 = summaries.iter().map(|s| s.total_viewers).sum();
    let diamonds: u64 = summaries.iter().map(|s| s.total_diamonds).sum();

    let mut out = format!(
        "ЗВІТ TikTok LIVE\n\
         Період: {}\n\
         \n\
         Активних користувачів: {}\n\
         Загальна тривалість ефірів: {}:{:02}\n\
         Загальна кількість глядачів: {}\n\
         Загальна кількість алмазів: {}\n\
         \n\
         ТОП 3 ЗА АЛМАЗАМИ:",
        period,
        summaries.len(),
        duration / 60,
        duration % 60,
        format_number(viewers),
        format_number(diamonds),
    );

    if summaries.is_empty() {
        out.push_str("\nНе було активності");
    }
    for (i, summary) in summaries.iter().take(3).enumerate() {
        out.push_str(&format!(
            "\n{}. {} - {}",
            i + 1,
            summary.display_name(),
            format_number(summary.total_diamonds)
        ));
    }

    out.push_str(&format!("\n\nСкріншотів оброблено: {}", sessions));
    out
}

/// Per-day table for one user. Days off are marked in the last column.
pub fn render_daily_rows(rows: &[DailyRow]) -> String {
    let mut out = format!(
        "{:<10} {:>5} {:>12} {:>8} {:>8}  {}\n",
        "Дата", "Ефіри", "Тривалість", "Глядачі", "Алмази", "Статус"
    );
    for row in rows {
        let status = if row.is_holiday { "Вихідний" } else { "Робочий" };
        out.push_str(&format!(
            "{:<10} {:>5} {:>12} {:>8} {:>8}  {}\n",
            row.date.format("%d.%m.%Y"),
            row.sessions,
            format_duration(row.total_duration),
            format_number(row.total_viewers),
            format_number(row.total_diamonds),
            status,
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn summary(
        user_id: i64,
        nickname: &str,
        sessions: u64,
        duration: u64,
        diamonds: u64,
    ) -> UserSummary {
        UserSummary {
            user_id,
            nickname: Some(nickname.to_string()),
            sessions,
            active_days: sessions,
            holiday_days: 1,
            total_duration: duration,
            total_viewers: 1000,
            total_gifters: 40,
            total_diamonds: diamonds,
            max_viewers: 600,
            max_diamonds: diamonds,
            last_stream: None,
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0 хв");
        assert_eq!(format_duration(45), "45 хв");
        assert_eq!(format_duration(60), "1 год");
        assert_eq!(format_duration(205), "3 год 25 хв");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1.0K");
        assert_eq!(format_number(4900), "4.9K");
        assert_eq!(format_number(18_949), "18.9K");
        assert_eq!(format_number(18_950), "19.0K");
        assert_eq!(format_number(1_250_000), "1.3M");
        assert_eq!(format_number(1_200_000), "1.2M");
    }

    #[test]
    fn test_summary_table_totals() {
        let summaries = vec![
            summary(1, "alpha", 2, 120, 5000),
            summary(2, "beta", 1, 45, 300),
        ];
        let table = render_summary_table(&summaries, "Звіт");

        assert!(table.starts_with("Звіт\n\n"));
        assert!(table.contains("alpha"));
        assert!(table.contains("beta"));
        let total_line = table.lines().find(|l| l.starts_with("ВСЬОГО")).unwrap();
        assert!(total_line.contains(" 3 "));
        assert!(total_line.contains("5.3K"));
        assert!(table.ends_with("Всього користувачів у звіті: 2"));
    }

    #[test]
    fn test_summary_table_shows_top_15() {
        let summaries: Vec<UserSummary> = (1..=20)
            .map(|i| summary(i, &format!("user{:02}", i), 1, 60, 100))
            .collect();
        let table = render_summary_table(&summaries, "Звіт");

        assert!(table.contains("user15"));
        assert!(!table.contains("user16"));
        assert!(table.contains("Показано топ 15 з 20"));
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(
            render_summary_table(&[], "Звіт"),
            "Звіт\n\nНемає даних для відображення."
        );
    }

    #[test]
    fn test_long_names_are_cut() {
        let summaries = vec![summary(1, "a_very_long_nickname_here", 1, 60, 100)];
        let table = render_summary_table(&summaries, "Звіт");
        assert!(table.contains("a_very_long_ni "));
        assert!(!table.contains("a_very_long_nic"));
    }

    #[test]
    fn test_user_report() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let report = render_user_report(&summary(1, "alpha", 2, 410, 18_900), &Period::Day(day));

        assert!(report.starts_with("Статистика alpha (14.03.2025)"));
        assert!(report.contains("Всього ефірів: 2"));
        assert!(report.contains("Вихідних днів: 1"));
        assert!(report.contains("Загальна тривалість: 6 год 50 хв"));
        assert!(report.contains("Середня тривалість ефіру: 3 год 25 хв"));
        assert!(report.contains("Всього алмазів: 18.9K"));
    }

    #[test]
    fn test_period_report() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let summaries = vec![
            summary(1, "alpha", 2, 120, 5000),
            summary(2, "beta", 1, 45, 300),
        ];
        let report = render_period_report(&summaries, &Period::Day(day));

        assert!(report.contains("Активних користувачів: 2"));
        assert!(report.contains("Загальна тривалість ефірів: 2:45"));
        assert!(report.contains("1. alpha - 5.0K"));
        assert!(report.contains("2. beta - 300"));
        assert!(report.ends_with("Скріншотів оброблено: 3"));

        let empty = render_period_report(&[], &Period::Day(day));
        assert!(empty.contains("Не було активності"));
    }

    #[test]
    fn test_daily_rows() {
        let rows = vec![
            DailyRow {
                date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
                sessions: 1,
                total_duration: 205,
                total_viewers: 4900,
                total_gifters: 61,
                total_diamonds: 18_900,
                is_holiday: false,
            },
            DailyRow {
                date: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
                is_holiday: true,
                ..DailyRow::default()
            },
        ];
        let table = render_daily_rows(&rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("14.03.2025"));
        assert!(lines[1].contains("3 год 25 хв"));
        assert!(lines[1].ends_with("Робочий"));
        assert!(lines[2].ends_with("Вихідний"));
    }
}
