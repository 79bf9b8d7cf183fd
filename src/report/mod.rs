//! Aggregation of recorded sessions into per-user and per-day summaries.

pub mod export;
pub mod format;

pub use export::{export_all_daily_csv, export_daily_csv, export_summary_csv, export_to_json};
pub use format::{
    format_duration, format_number, render_daily_rows, render_period_report,
    render_summary_table, render_user_report,
};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Datelike, Days, Local, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::store::{HolidayStore, SessionRecord, UserStore};

/// Longest `days:N` window accepted, about ten years.
pub const MAX_PERIOD_DAYS: u32 = 3660;

/// A reporting window of whole local calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day(NaiveDate),
    /// Seven days ending on (and including) the date
    Week(NaiveDate),
    Month { year: i32, month: u32 },
    /// `days` days ending on (and including) `until`
    LastDays { days: u32, until: NaiveDate },
}

impl Period {
    /// Parses `day`, `week`, `month` or `days:N` relative to `anchor`.
    pub fn parse(s: &str, anchor: NaiveDate) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "day" | "today" => Ok(Period::Day(anchor)),
            "week" => Ok(Period::Week(anchor)),
            "month" => Ok(Period::Month {
                year: anchor.year(),
                month: anchor.month(),
            }),
            other => {
                let n = other.strip_prefix("days:").ok_or_else(|| {
                    anyhow!("Unknown period '{}', expected day, week, month or days:N", s)
                })?;
                let days: u32 = n
                    .parse()
                    .with_context(|| format!("Invalid day count '{}'", n))?;
                if days == 0 {
                    return Err(anyhow!("Day count must be at least 1"));
                }
                if days > MAX_PERIOD_DAYS {
                    return Err(anyhow!("Day count must be at most {}", MAX_PERIOD_DAYS));
                }
                Ok(Period::LastDays {
                    days,
                    until: anchor,
                })
            }
        }
    }

    /// Half-open `[start, end)` date range.
    pub fn range(&self) -> (NaiveDate, NaiveDate) {
        match *self {
            Period::Day(day) => (day, next_day(day)),
            Period::Week(end) => (days_before(end, 6), next_day(end)),
            Period::Month { year, month } => {
                let start = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN);
                let end = if month == 12 {
                    NaiveDate::from_ymd_opt(year + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(year, month + 1, 1)
                };
                (start, end.unwrap_or(NaiveDate::MAX))
            }
            Period::LastDays { days, until } => (
                days_before(until, u64::from(days.saturating_sub(1))),
                next_day(until),
            ),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        let (start, end) = self.range();
        start <= date && date < end
    }

    /// Every day in the period, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let (start, end) = self.range();
        start.iter_days().take_while(move |d| *d < end)
    }
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(NaiveDate::MAX)
}

/// Clamps at the earliest representable date.
fn days_before(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (start, end) = self.range();
        let last = end.pred_opt().unwrap_or(end);
        match self {
            Period::Day(day) => write!(f, "{}", day.format("%d.%m.%Y")),
            Period::Month { year, month } => write!(f, "{:02}.{}", month, year),
            _ => write!(f, "{} - {}", start.format("%d.%m.%Y"), last.format("%d.%m.%Y")),
        }
    }
}

/// Totals for one user over a period.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserSummary {
    pub user_id: i64,
    pub nickname: Option<String>,
    pub sessions: u64,
    /// Days with at least one session
    pub active_days: u64,
    /// Declared days off inside the period
    pub holiday_days: u64,
    pub total_duration: u64,
    pub total_viewers: u64,
    pub total_gifters: u64,
    pub total_diamonds: u64,
    pub max_viewers: u64,
    pub max_diamonds: u64,
    pub last_stream: Option<DateTime<Local>>,
}

impl UserSummary {
    fn average(&self, total: u64) -> f64 {
        if self.sessions == 0 {
            0.0
        } else {
            total as f64 / self.sessions as f64
        }
    }

    pub fn avg_duration(&self) -> f64 {
        self.average(self.total_duration)
    }

    pub fn avg_viewers(&self) -> f64 {
        self.average(self.total_viewers)
    }

    pub fn avg_diamonds(&self) -> f64 {
        self.average(self.total_diamonds)
    }

    /// Nickname, or the user id when the user is not registered.
    pub fn display_name(&self) -> String {
        self.nickname
            .clone()
            .unwrap_or_else(|| format!("id{}", self.user_id))
    }
}

/// Per-user totals for the period, most diamonds first.
pub fn summarize(records: &[SessionRecord], period: &Period) -> Vec<UserSummary> {
    let mut by_user: BTreeMap<i64, (UserSummary, Vec<NaiveDate>)> = BTreeMap::new();

    for record in records
        .iter()
        .filter(|r| period.contains(r.recorded_at.date_naive()))
    {
        let (summary, days) = by_user.entry(record.user_id).or_insert_with(|| {
            (
                UserSummary {
                    user_id: record.user_id,
                    ..UserSummary::default()
                },
                Vec::new(),
            )
        });

        let stats = &record.stats;
        summary.sessions += 1;
        summary.total_duration = summary.total_duration.saturating_add(stats.duration_minutes);
        summary.total_viewers = summary.total_viewers.saturating_add(stats.viewers);
        summary.total_gifters = summary.total_gifters.saturating_add(stats.gifters);
        summary.total_diamonds = summary.total_diamonds.saturating_add(stats.diamonds);
        summary.max_viewers = summary.max_viewers.max(stats.viewers);
        summary.max_diamonds = summary.max_diamonds.max(stats.diamonds);
        if summary.last_stream.is_none_or(|last| record.recorded_at > last) {
            summary.last_stream = Some(record.recorded_at);
        }
        days.push(record.recorded_at.date_naive());
    }

    let mut summaries: Vec<UserSummary> = by_user
        .into_values()
        .map(|(mut summary, mut days)| {
            days.sort();
            days.dedup();
            summary.active_days = days.len() as u64;
            summary
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.total_diamonds
            .cmp(&a.total_diamonds)
            .then(a.user_id.cmp(&b.user_id))
    });
    summaries
}

/// The `limit` users with the most diamonds in the period.
pub fn leaderboard(records: &[SessionRecord], period: &Period, limit: usize) -> Vec<UserSummary> {
    let mut summaries = summarize(records, period);
    summaries.truncate(limit);
    summaries
}

/// Fills in nicknames from the user registry.
pub fn attach_nicknames(summaries: &mut [UserSummary], users: &UserStore) {
    for summary in summaries.iter_mut() {
        summary.nickname = users.nickname(summary.user_id).map(str::to_string);
    }
}

/// Counts each user's declared days off inside the period.
pub fn attach_holidays(summaries: &mut [UserSummary], holidays: &HolidayStore, period: &Period) {
    for summary in summaries.iter_mut() {
        summary.holiday_days = holidays
            .list(summary.user_id)
            .into_iter()
            .filter(|date| period.contains(*date))
            .count() as u64;
    }
}

/// One user's totals for one day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DailyRow {
    pub date: NaiveDate,
    pub sessions: u64,
    pub total_duration: u64,
    pub total_viewers: u64,
    pub total_gifters: u64,
    pub total_diamonds: u64,
    pub is_holiday: bool,
}

/// One row per day of the period for `user_id`, including days without sessions.
pub fn daily_breakdown(records: &[SessionRecord], user_id: i64, period: &Period) -> Vec<DailyRow> {
    let mut rows: BTreeMap<NaiveDate, DailyRow> = period
        .days()
        .map(|date| {
            (
                date,
                DailyRow {
                    date,
                    ..DailyRow::default()
                },
            )
        })
        .collect();

    for record in records.iter().filter(|r| r.user_id == user_id) {
        if let Some(row) = rows.get_mut(&record.recorded_at.date_naive()) {
            row.sessions += 1;
            row.total_duration = row.total_duration.saturating_add(record.stats.duration_minutes);
            row.total_viewers = row.total_viewers.saturating_add(record.stats.viewers);
            row.total_gifters = row.total_gifters.saturating_add(record.stats.gifters);
            row.total_diamonds = row.total_diamonds.saturating_add(record.stats.diamonds);
        }
    }

    rows.into_values().collect()
}

/// Flags the rows that fall on one of the user's days off.
pub fn mark_holidays(rows: &mut [DailyRow], user_id: i64, holidays: &HolidayStore) {
    for row in rows.iter_mut() {
        row.is_holiday = holidays.contains(user_id, row.date);
    }
}

/// Per-day rows for one user, as exported in the all-users package.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserDailyReport {
    pub user_id: i64,
    pub nickname: Option<String>,
    pub rows: Vec<DailyRow>,
}

/// Daily rows for every registered user and every user with sessions in the
/// period, ordered by user id.
pub fn all_users_daily(
    records: &[SessionRecord],
    users: &UserStore,
    holidays: &HolidayStore,
    period: &Period,
) -> Vec<UserDailyReport> {
    let user_ids: BTreeSet<i64> = users
        .all()
        .into_iter()
        .map(|u| u.user_id)
        .chain(
            records
                .iter()
                .filter(|r| period.contains(r.recorded_at.date_naive()))
                .map(|r| r.user_id),
        )
        .collect();

    user_ids
        .into_iter()
        .map(|user_id| {
            let mut rows = daily_breakdown(records, user_id, period);
            mark_holidays(&mut rows, user_id, holidays);
            UserDailyReport {
                user_id,
                nickname: users.nickname(user_id).map(str::to_string),
                rows,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::ParsedStatistics;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn session(
        user_id: i64,
        day: NaiveDate,
        hour: u32,
        duration: u64,
        viewers: u64,
        diamonds: u64,
    ) -> SessionRecord {
        SessionRecord {
            user_id,
            recorded_at: Local
                .from_local_datetime(&day.and_hms_opt(hour, 0, 0).unwrap())
                .earliest()
                .unwrap(),
            stats: ParsedStatistics {
                duration_minutes: duration,
                viewers,
                gifters: viewers / 10,
                diamonds,
            },
            source: "test".to_string(),
        }
    }

    #[test]
    fn test_period_parse() {
        let anchor = date(2025, 3, 14);
        assert_eq!(Period::parse("day", anchor).unwrap(), Period::Day(anchor));
        assert_eq!(Period::parse("Week", anchor).unwrap(), Period::Week(anchor));
        assert_eq!(
            Period::parse("month", anchor).unwrap(),
            Period::Month { year: 2025, month: 3 }
        );
        assert_eq!(
            Period::parse("days:30", anchor).unwrap(),
            Period::LastDays { days: 30, until: anchor }
        );
        assert!(Period::parse("days:0", anchor).is_err());
        assert!(Period::parse("days:x", anchor).is_err());
        assert!(Period::parse("year", anchor).is_err());
    }

    #[test]
    fn test_period_parse_rejects_huge_day_counts() {
        let anchor = date(2026, 10, 16);
        let err = Period::parse("days:4000000000", anchor).unwrap_err();
        assert!(err.to_string().contains("at most"));
        assert!(Period::parse("days:3661", anchor).is_err());

        let longest = Period::parse("days:3660", anchor).unwrap();
        assert_eq!(longest.days().count(), 3660);
    }

    #[test]
    fn test_ranges_near_the_calendar_edge_clamp() {
        let early = NaiveDate::MIN + Days::new(2);
        assert_eq!(Period::Week(early).range().0, NaiveDate::MIN);

        let constructed = Period::LastDays {
            days: u32::MAX,
            until: date(2026, 10, 16),
        };
        assert_eq!(constructed.range().0, NaiveDate::MIN);
        assert!(constructed.contains(date(2000, 1, 1)));
    }

    #[test]
    fn test_period_ranges() {
        let anchor = date(2025, 3, 14);
        assert_eq!(Period::Day(anchor).range(), (anchor, date(2025, 3, 15)));
        assert_eq!(Period::Week(anchor).range(), (date(2025, 3, 8), date(2025, 3, 15)));
        assert_eq!(
            Period::Month { year: 2025, month: 12 }.range(),
            (date(2025, 12, 1), date(2026, 1, 1))
        );
        assert_eq!(
            Period::LastDays { days: 1, until: anchor }.range(),
            (anchor, date(2025, 3, 15))
        );
        assert_eq!(Period::Week(anchor).days().count(), 7);
        assert_eq!(Period::Month { year: 2024, month: 2 }.days().count(), 29);
    }

    #[test]
    fn test_period_display() {
        assert_eq!(Period::Day(date(2025, 3, 4)).to_string(), "04.03.2025");
        assert_eq!(Period::Month { year: 2025, month: 3 }.to_string(), "03.2025");
        assert_eq!(
            Period::Week(date(2025, 3, 14)).to_string(),
            "08.03.2025 - 14.03.2025"
        );
    }

    #[test]
    fn test_summarize_groups_and_sorts_by_diamonds() {
        let d = date(2025, 3, 14);
        let records = vec![
            session(1, d, 10, 60, 100, 500),
            session(2, d, 11, 120, 300, 9000),
            session(1, d, 20, 30, 50, 700),
            session(1, d - Days::new(1), 20, 90, 80, 100),
        ];

        let summaries = summarize(&records, &Period::Week(d));
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].user_id, 2);

        let first = &summaries[1];
        assert_eq!(first.sessions, 3);
        assert_eq!(first.active_days, 2);
        assert_eq!(first.total_duration, 180);
        assert_eq!(first.total_diamonds, 1300);
        assert_eq!(first.max_viewers, 100);
        assert_eq!(first.max_diamonds, 700);
        assert_eq!(first.avg_duration(), 60.0);
        assert_eq!(first.last_stream, Some(records[2].recorded_at));
    }

    #[test]
    fn test_summarize_respects_period() {
        let d = date(2025, 3, 14);
        let records = vec![
            session(1, d, 10, 60, 100, 500),
            session(1, d - Days::new(1), 10, 60, 100, 500),
            session(1, d + Days::new(1), 10, 60, 100, 500),
        ];

        let summaries = summarize(&records, &Period::Day(d));
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].sessions, 1);
        assert!(summarize(&records, &Period::Day(date(2025, 1, 1))).is_empty());
    }

    #[test]
    fn test_leaderboard_limit() {
        let d = date(2025, 3, 14);
        let records: Vec<SessionRecord> = (1..=5)
            .map(|id| session(id, d, 12, 60, 100, id as u64 * 100))
            .collect();

        let top: Vec<i64> = leaderboard(&records, &Period::Day(d), 3)
            .iter()
            .map(|s| s.user_id)
            .collect();
        assert_eq!(top, vec![5, 4, 3]);
    }

    #[test]
    fn test_daily_breakdown_includes_empty_days() {
        let d = date(2025, 3, 14);
        let records = vec![
            session(1, d, 10, 60, 100, 500),
            session(1, d, 18, 30, 40, 200),
            session(2, d, 10, 60, 100, 500),
            session(1, d - Days::new(2), 10, 45, 10, 10),
        ];

        let rows = daily_breakdown(&records, 1, &Period::LastDays { days: 3, until: d });
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].date, date(2025, 3, 12));
        assert_eq!(rows[0].sessions, 1);
        assert_eq!(rows[1].sessions, 0);
        assert_eq!(rows[1].total_diamonds, 0);
        assert_eq!(rows[2].sessions, 2);
        assert_eq!(rows[2].total_duration, 90);
        assert_eq!(rows[2].total_diamonds, 700);
    }

    #[test]
    fn test_attach_holidays_counts_days_in_period() {
        let dir = tempfile::tempdir().unwrap();
        let mut holidays = HolidayStore::open(dir.path().join("holidays.json")).unwrap();
        let d = date(2025, 3, 14);
        holidays.add(1, d - Days::new(1)).unwrap();
        holidays.add(1, d - Days::new(3)).unwrap();
        holidays.add(1, d - Days::new(30)).unwrap();
        holidays.add(2, d).unwrap();

        let records = vec![session(1, d, 10, 60, 100, 500)];
        let period = Period::Week(d);
        let mut summaries = summarize(&records, &period);
        attach_holidays(&mut summaries, &holidays, &period);

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].holiday_days, 2);
        assert_eq!(summaries[0].active_days, 1);
    }

    #[test]
    fn test_mark_holidays() {
        let dir = tempfile::tempdir().unwrap();
        let mut holidays = HolidayStore::open(dir.path().join("holidays.json")).unwrap();
        let d = date(2025, 3, 14);
        holidays.add(1, d - Days::new(1)).unwrap();
        holidays.add(2, d).unwrap();

        let period = Period::LastDays { days: 3, until: d };
        let mut rows = daily_breakdown(&[], 1, &period);
        mark_holidays(&mut rows, 1, &holidays);

        let flags: Vec<bool> = rows.iter().map(|r| r.is_holiday).collect();
        assert_eq!(flags, vec![false, true, false]);
    }

    #[test]
    fn test_all_users_daily_covers_registered_and_active_users() {
        let dir = tempfile::tempdir().unwrap();
        let mut users = UserStore::open(dir.path().join("users.json")).unwrap();
        users.register(3, "registered").unwrap();
        let mut holidays = HolidayStore::open(dir.path().join("holidays.json")).unwrap();
        let d = date(2025, 3, 14);
        holidays.add(3, d).unwrap();

        let records = vec![
            session(5, d, 10, 60, 100, 500),
            session(9, d - Days::new(10), 10, 60, 100, 500),
        ];
        let reports = all_users_daily(&records, &users, &holidays, &Period::Day(d));

        let ids: Vec<i64> = reports.iter().map(|r| r.user_id).collect();
        assert_eq!(ids, vec![3, 5]);

        assert_eq!(reports[0].nickname.as_deref(), Some("registered"));
        assert_eq!(reports[0].rows.len(), 1);
        assert!(reports[0].rows[0].is_holiday);
        assert_eq!(reports[0].rows[0].sessions, 0);

        assert_eq!(reports[1].nickname, None);
        assert_eq!(reports[1].rows[0].total_diamonds, 500);
        assert!(!reports[1].rows[0].is_holiday);
    }

    #[test]
    fn test_attach_nicknames() {
        let dir = tempfile::tempdir().unwrap();
        let mut users = UserStore::open(dir.path().join("users.json")).unwrap();
        users.register(1, "streamer").unwrap();

        let d = date(2025, 3, 14);
        let records = vec![session(1, d, 10, 60, 100, 500), session(2, d, 10, 60, 100, 400)];
        let mut summaries = summarize(&records, &Period::Day(d));
        attach_nicknames(&mut summaries, &users);

        assert_eq!(summaries[0].display_name(), "streamer");
        assert_eq!(summaries[1].display_name(), "id2");
    }
}
