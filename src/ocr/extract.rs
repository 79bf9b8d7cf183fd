//! Extraction of the viewers / gifters / diamonds triad from OCR text.
//!
//! Strategies run in decreasing confidence:
//! - Exact combined pattern: `<mag> <int> <mag>`, on-screen order kept
//! - Labeled Ukrainian pattern: numbers followed by their field names
//! - Generic triple: any three numeric tokens, assigned by magnitude
//! - Global salvage: every plausible number in every text, assigned by magnitude

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::{debug, info};

use super::duration::parse_duration;
use super::number::parse_number_value;

/// Upper bounds a candidate triad must respect before it is accepted.
const MAX_CANDIDATE_VIEWERS: u64 = 100_000;
const MAX_CANDIDATE_GIFTERS: u64 = 10_000;
const MAX_CANDIDATE_DIAMONDS: u64 = 50_000;

/// Range of values the salvage strategy keeps.
const SALVAGE_MIN: u64 = 10;
const SALVAGE_MAX: u64 = 100_000;

static EXACT_COMBINED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9]+(?:\.[0-9]+)?[KМКM])\s+([0-9]+)\s+([0-9]+(?:\.[0-9]+)?[KМКM])")
        .expect("exact combined pattern is valid")
});

static LABELED_UKRAINIAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)([0-9]+(?:[.,][0-9]+)?[KМКM])\s+глядач.*?([0-9]+)\s+дарувальник.*?([0-9]+(?:[.,][0-9]+)?[KМКM])\s+діамант",
    )
    .expect("labeled ukrainian pattern is valid")
});

static GENERIC_TRIPLES: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(
            r"(?i)([0-9]+(?:\.[0-9]+)?[KМКM]?)\s+([0-9]+(?:\.[0-9]+)?[KМКM]?)\s+([0-9]+(?:\.[0-9]+)?[KМКM]?)",
        )
        .expect("generic triple pattern is valid"),
        Regex::new(
            r"(?i)([0-9]+(?:[.,][0-9]+)?[KМКM]?)\s+([0-9]+(?:[.,][0-9]+)?[KМКM]?)\s+([0-9]+(?:[.,][0-9]+)?[KМКM]?)",
        )
        .expect("generic triple pattern with commas is valid"),
    ]
});

static NUMERIC_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[0-9]+(?:[.,][0-9]+)?[KМКM]?").expect("numeric token pattern is valid")
});

/// The four numbers read from one statistics screenshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedStatistics {
    pub duration_minutes: u64,
    pub viewers: u64,
    pub gifters: u64,
    pub diamonds: u64,
}

/// Viewers, gifters and diamonds as found together on screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Triad {
    pub viewers: u64,
    pub gifters: u64,
    pub diamonds: u64,
}

impl Triad {
    fn within_candidate_bounds(&self) -> bool {
        self.viewers <= MAX_CANDIDATE_VIEWERS
            && self.gifters <= MAX_CANDIDATE_GIFTERS
            && self.diamonds <= MAX_CANDIDATE_DIAMONDS
    }

    /// Largest value is viewers, second diamonds, third gifters.
    ///
    /// Missing positions stay 0.
    fn by_magnitude(values: &[u64]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        Self {
            viewers: sorted.first().copied().unwrap_or(0),
            diamonds: sorted.get(1).copied().unwrap_or(0),
            gifters: sorted.get(2).copied().unwrap_or(0),
        }
    }
}

/// Which strategy located the triad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorStrategy {
    ExactCombinedPattern,
    LabeledUkrainianPattern,
    GenericTriplePattern,
    GlobalSalvage,
}

/// Parses an on-screen ordered triad, accepting it only when all values are
/// positive and plausible.
fn ordered_triad(pattern: &Regex, text: &str) -> Option<Triad> {
    let caps = pattern.captures(text)?;
    let triad = Triad {
        viewers: parse_number_value(&caps[1]),
        gifters: parse_number_value(&caps[2]),
        diamonds: parse_number_value(&caps[3]),
    };

    let positive = triad.viewers > 0 && triad.gifters > 0 && triad.diamonds > 0;
    (positive && triad.within_candidate_bounds()).then_some(triad)
}

pub fn exact_combined(text: &str) -> Option<Triad> {
    ordered_triad(&EXACT_COMBINED, text)
}

pub fn labeled_ukrainian(text: &str) -> Option<Triad> {
    ordered_triad(&LABELED_UKRAINIAN, text)
}

/// Keeps digits, whitespace, separators and the thousand/million suffixes.
///
/// Lowercase Cyrillic `к`/`м` are dropped: they are common inside the field
/// labels and would split otherwise adjacent numbers.
fn strip_to_numbers(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_digit()
                || c.is_whitespace()
                || matches!(c, '.' | ',' | 'K' | 'k' | 'M' | 'К' | 'М')
            {
                c
            } else {
                ' '
            }
        })
        .collect()
}

/// Any three numeric tokens in a row, assigned by magnitude.
pub fn generic_triple(text: &str, excluded: Option<u64>) -> Option<Triad> {
    let clean = strip_to_numbers(text);

    for pattern in GENERIC_TRIPLES.iter() {
        for caps in pattern.captures_iter(&clean) {
            let values: Vec<u64> = (1..=3)
                .map(|i| parse_number_value(&caps[i]))
                .filter(|&v| Some(v) != excluded)
                .collect();

            if values.len() < 2 || values.iter().any(|&v| v == 0) {
                continue;
            }

            let triad = Triad::by_magnitude(&values);
            if triad.within_candidate_bounds() {
                debug!(
                    tokens = %format!("{} {} {}", &caps[1], &caps[2], &caps[3]),
                    ?triad,
                    "generic triple accepted"
                );
                return Some(triad);
            }
        }
    }

    None
}

/// Every plausible number across all texts, deduplicated and assigned by magnitude.
pub fn global_salvage(texts: &[String], excluded: Option<u64>) -> Option<Triad> {
    let numbers: BTreeSet<u64> = texts
        .iter()
        .flat_map(|text| NUMERIC_TOKEN.find_iter(text))
        .map(|m| parse_number_value(m.as_str()))
        .filter(|&v| (SALVAGE_MIN..=SALVAGE_MAX).contains(&v) && Some(v) != excluded)
        .collect();

    if numbers.is_empty() {
        return None;
    }

    let values: Vec<u64> = numbers.into_iter().rev().collect();
    debug!(candidates = ?values.iter().take(10).collect::<Vec<_>>(), "salvage candidates");
    Some(Triad::by_magnitude(&values))
}

/// Finds the triad, trying each strategy in order until one yields viewers.
///
/// `excluded` is a literal already consumed by the duration parser.
pub fn locate_triad(texts: &[String], excluded: Option<u64>) -> Option<(LocatorStrategy, Triad)> {
    let found = texts
        .iter()
        .find_map(|text| {
            exact_combined(text)
                .map(|t| (LocatorStrategy::ExactCombinedPattern, t))
                .or_else(|| {
                    labeled_ukrainian(text).map(|t| (LocatorStrategy::LabeledUkrainianPattern, t))
                })
        })
        .or_else(|| {
            texts
                .iter()
                .find_map(|text| generic_triple(text, excluded))
                .map(|t| (LocatorStrategy::GenericTriplePattern, t))
        })
        .or_else(|| {
            info!("no number group found, salvaging individual numbers");
            global_salvage(texts, excluded).map(|t| (LocatorStrategy::GlobalSalvage, t))
        });

    if let Some((strategy, triad)) = &found {
        info!(?strategy, ?triad, "statistics triad located");
    }

    found
}

/// Runs the duration parser and the triad locator over the same texts.
pub fn find_statistics(texts: &[String]) -> ParsedStatistics {
    let duration = parse_duration(texts);
    let excluded = duration.and_then(|d| d.consumed_literal);
    let triad = locate_triad(texts, excluded)
        .map(|(_, triad)| triad)
        .unwrap_or_default();

    let stats = ParsedStatistics {
        duration_minutes: duration.map(|d| d.minutes).unwrap_or(0),
        viewers: triad.viewers,
        gifters: triad.gifters,
        diamonds: triad.diamonds,
    };

    info!(
        duration = stats.duration_minutes,
        viewers = stats.viewers,
        gifters = stats.gifters,
        diamonds = stats.diamonds,
        "final statistics"
    );

    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_combined_keeps_screen_order() {
        let triad = exact_combined("LIVE 4.9K 61 18.9K").unwrap();
        assert_eq!(
            triad,
            Triad {
                viewers: 4900,
                gifters: 61,
                diamonds: 18900
            }
        );
    }

    #[test]
    fn test_exact_combined_with_dropped_points() {
        let triad = exact_combined("49K 61 39K").unwrap();
        assert_eq!(triad.viewers, 4900);
        assert_eq!(triad.gifters, 61);
        assert_eq!(triad.diamonds, 3900);

        // 189K diamonds is out of candidate bounds
        assert_eq!(exact_combined("49K 61 189K"), None);
    }

    #[test]
    fn test_exact_combined_rejects_out_of_bounds() {
        assert_eq!(exact_combined("3K 26 51K"), None);
        assert_eq!(exact_combined("3K 0 5K"), None);
    }

    #[test]
    fn test_labeled_ukrainian() {
        let text = "3K глядачів\nщось\n26 дарувальників\n5.5K діамантів";
        let triad = labeled_ukrainian(text).unwrap();
        assert_eq!(
            triad,
            Triad {
                viewers: 3000,
                gifters: 26,
                diamonds: 5500
            }
        );
    }

    #[test]
    fn test_generic_triple_sorts_by_magnitude() {
        let triad = generic_triple("Глядачі 61 Діаманти 4900 Дарувальники 18900", None).unwrap();
        assert_eq!(triad.viewers, 18900);
        assert_eq!(triad.diamonds, 4900);
        assert_eq!(triad.gifters, 61);
    }

    #[test]
    fn test_generic_triple_excludes_duration_literal() {
        let triad = generic_triple("27 хв хв\n1200 35 800", Some(27)).unwrap();
        assert_eq!(triad.viewers, 1200);
        assert_eq!(triad.diamonds, 35);
        assert_eq!(triad.gifters, 0);
    }

    #[test]
    fn test_generic_triple_skips_out_of_bounds_match() {
        let triad = generic_triple("200000 5 7 1200 35 800", None).unwrap();
        assert_eq!(
            triad,
            Triad {
                viewers: 1200,
                gifters: 35,
                diamonds: 800
            }
        );
    }

    #[test]
    fn test_out_of_bounds_triples_fall_through_to_salvage() {
        let panel = texts(&["200000 300000 400000", "Глядачі 750"]);
        assert_eq!(generic_triple(&panel[0], None), None);

        let (strategy, triad) = locate_triad(&panel, None).unwrap();
        assert_eq!(strategy, LocatorStrategy::GlobalSalvage);
        assert_eq!(
            triad,
            Triad {
                viewers: 750,
                gifters: 0,
                diamonds: 0
            }
        );
    }

    #[test]
    fn test_global_salvage_assigns_by_magnitude() {
        let found = locate_triad(
            &texts(&["Глядачі: 500", "Діаманти: 12000", "Дарувальники: 40"]),
            None,
        )
        .unwrap();
        assert_eq!(found.0, LocatorStrategy::GlobalSalvage);
        assert_eq!(
            found.1,
            Triad {
                viewers: 12000,
                gifters: 40,
                diamonds: 500
            }
        );
    }

    #[test]
    fn test_global_salvage_filters_and_dedupes() {
        let triad = global_salvage(&texts(&["5 500 500", "200000", "12"]), None).unwrap();
        assert_eq!(triad.viewers, 500);
        assert_eq!(triad.diamonds, 12);
        assert_eq!(triad.gifters, 0);
    }

    #[test]
    fn test_global_salvage_single_value() {
        let triad = global_salvage(&texts(&["viewers 250"]), None).unwrap();
        assert_eq!(
            triad,
            Triad {
                viewers: 250,
                gifters: 0,
                diamonds: 0
            }
        );
        assert_eq!(global_salvage(&texts(&["27 abc"]), Some(27)), None);
    }

    #[test]
    fn test_exact_pattern_preferred_over_later_texts() {
        let found = locate_triad(&texts(&["1200 35 800", "4.9K 61 18.9K"]), None).unwrap();
        assert_eq!(found.0, LocatorStrategy::ExactCombinedPattern);
        assert_eq!(found.1.viewers, 4900);
    }

    #[test]
    fn test_nothing_located() {
        assert_eq!(locate_triad(&texts(&["no numbers here", "5"]), None), None);
    }

    #[test]
    fn test_find_statistics_round_trip_texts() {
        let stats = find_statistics(&texts(&["3 год 25 хв", "4.9K 61 18.9K"]));
        assert_eq!(
            stats,
            ParsedStatistics {
                duration_minutes: 205,
                viewers: 4900,
                gifters: 61,
                diamonds: 18900
            }
        );
    }

    #[test]
    fn test_find_statistics_doubled_minutes_not_reused() {
        let stats = find_statistics(&texts(&["27 хв хв", "Глядачі 640", "Діаманти 1300"]));
        assert_eq!(stats.duration_minutes, 205);
        assert_eq!(stats.viewers, 1300);
        assert_eq!(stats.diamonds, 640);
        assert_eq!(stats.gifters, 0);
    }
}
