//! Stream duration parsing from bilingual (Ukrainian/English) OCR text.
//!
//! Each rule is a separate function so rules can be added or removed without
//! touching the others. Rules run per text in precedence order; a rule whose
//! bounds check fails falls through to the next rule on the same text.

use regex::Regex;
use std::sync::LazyLock;
use tracing::info;

/// The `N хв хв` value that is a known misreading of `3 год 25 хв`.
const KNOWN_DOUBLED_VALUE: u64 = 27;
const KNOWN_DOUBLED_MINUTES: u64 = 3 * 60 + 25;

/// Words that mark a text as talking about the broadcast duration.
const DURATION_KEYWORDS: [&str; 4] = ["тривалість", "трансляц", "ефір", "live"];

static UKR_HOURS_MINUTES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9]+)\s*год\s*([0-9]+)\s*хв").expect("ukrainian duration pattern is valid")
});

static DOUBLED_MINUTES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9]+)\s*хв\s*хв").expect("doubled minutes pattern is valid")
});

static LABELED_MINUTES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)тривалість[:\s]*([0-9]+)").expect("labeled duration pattern is valid")
});

static COMPACT_UKR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9]+)год([0-9]+)").expect("compact duration pattern is valid")
});

static ENG_HOURS_MINUTES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9]+)\s*hours?\s*([0-9]+)\s*min")
        .expect("english duration pattern is valid")
});

static CLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{1,2}):([0-9]{2})").expect("clock pattern is valid"));

static ENG_HOURS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9]+)\s*hours?").expect("english hours pattern is valid")
});

/// Which rule produced a duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationRule {
    /// `3 год 25 хв`
    UkrainianHoursMinutes,
    /// `27 хв хв`, the known misreading of `3 год 25 хв`
    DoubledMinutesKnownCase,
    /// `2N хв хв` / `3N хв хв` rebuilt as hours and tens of minutes
    DoubledMinutesReconstructed,
    /// `N хв хв` with N >= 180, taken literally
    DoubledMinutesLong,
    /// `N хв хв` next to a duration keyword, taken literally
    DoubledMinutesWithContext,
    /// `тривалість: N`
    LabeledMinutes,
    /// `3год25`
    CompactUkrainian,
    /// `3 hours 40 min`
    EnglishHoursMinutes,
    /// `3:40`
    Clock,
    /// `3 hours`
    EnglishHours,
}

/// A parsed duration and the rule that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationMatch {
    pub minutes: u64,
    pub rule: DurationRule,
    /// Literal number the rule consumed and that must not be reused as a statistic.
    pub consumed_literal: Option<u64>,
}

impl DurationMatch {
    fn new(minutes: u64, rule: DurationRule) -> Self {
        Self {
            minutes,
            rule,
            consumed_literal: None,
        }
    }
}

fn capture_number(caps: &regex::Captures<'_>, index: usize) -> Option<u64> {
    caps.get(index)?.as_str().parse().ok()
}

/// Hours and minutes from two capture groups, bounded to a plausible clock value.
fn hours_minutes(pattern: &Regex, text: &str) -> Option<u64> {
    let caps = pattern.captures(text)?;
    let hours = capture_number(&caps, 1)?;
    let minutes = capture_number(&caps, 2)?;
    (hours <= 24 && minutes <= 59).then_some(hours * 60 + minutes)
}

fn ukrainian_hours_minutes(text: &str) -> Option<DurationMatch> {
    hours_minutes(&UKR_HOURS_MINUTES, text)
        .map(|m| DurationMatch::new(m, DurationRule::UkrainianHoursMinutes))
}

/// OCR misreads the hour count and duplicates the minutes unit: `27 хв хв`.
fn doubled_minutes(text: &str) -> Option<DurationMatch> {
    let caps = DOUBLED_MINUTES.captures(text)?;
    let value = capture_number(&caps, 1)?;

    if value == KNOWN_DOUBLED_VALUE {
        return Some(DurationMatch {
            minutes: KNOWN_DOUBLED_MINUTES,
            rule: DurationRule::DoubledMinutesKnownCase,
            consumed_literal: Some(value),
        });
    }

    if (20..=35).contains(&value) {
        let hours = value / 10;
        let minute_tens = value % 10;
        if (1..=5).contains(&hours) {
            // Ones digit of the minutes is lost; 5 is the midpoint guess.
            return Some(DurationMatch::new(
                hours * 60 + minute_tens * 10 + 5,
                DurationRule::DoubledMinutesReconstructed,
            ));
        }
    }

    if value >= 180 {
        return Some(DurationMatch::new(value, DurationRule::DoubledMinutesLong));
    }

    let lowered = text.to_lowercase();
    if DURATION_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return Some(DurationMatch::new(
            value,
            DurationRule::DoubledMinutesWithContext,
        ));
    }

    None
}

fn labeled_minutes(text: &str) -> Option<DurationMatch> {
    let caps = LABELED_MINUTES.captures(text)?;
    let minutes = capture_number(&caps, 1)?;
    (5..=500)
        .contains(&minutes)
        .then(|| DurationMatch::new(minutes, DurationRule::LabeledMinutes))
}

fn compact_ukrainian(text: &str) -> Option<DurationMatch> {
    hours_minutes(&COMPACT_UKR, text).map(|m| DurationMatch::new(m, DurationRule::CompactUkrainian))
}

fn english_hours_minutes(text: &str) -> Option<DurationMatch> {
    hours_minutes(&ENG_HOURS_MINUTES, text)
        .map(|m| DurationMatch::new(m, DurationRule::EnglishHoursMinutes))
}

fn clock(text: &str) -> Option<DurationMatch> {
    hours_minutes(&CLOCK, text).map(|m| DurationMatch::new(m, DurationRule::Clock))
}

fn english_hours(text: &str) -> Option<DurationMatch> {
    let caps = ENG_HOURS.captures(text)?;
    let hours = capture_number(&caps, 1)?;
    (hours <= 24).then(|| DurationMatch::new(hours * 60, DurationRule::EnglishHours))
}

/// Rules in precedence order.
const RULES: [fn(&str) -> Option<DurationMatch>; 7] = [
    ukrainian_hours_minutes,
    doubled_minutes,
    labeled_minutes,
    compact_ukrainian,
    english_hours_minutes,
    clock,
    english_hours,
];

/// Parses the duration from a single text.
pub fn parse_duration_text(text: &str) -> Option<DurationMatch> {
    RULES.iter().find_map(|rule| rule(text))
}

/// Returns the duration from the first text any rule matches.
///
/// Order matters: the extractor output order decides which text wins.
pub fn parse_duration(texts: &[String]) -> Option<DurationMatch> {
    let found = texts.iter().find_map(|text| parse_duration_text(text));

    if let Some(m) = &found {
        info!(minutes = m.minutes, rule = ?m.rule, "duration found");
    }

    found
}
