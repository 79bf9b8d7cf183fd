//! Numeric token normalization.
//!
//! Turns tokens such as `4.9K`, `189K` or `61` into integer magnitudes.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Two digits directly followed by a magnitude suffix, e.g. `49K`.
static DROPPED_POINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9])([0-9])([KkMmКкМм])$").expect("dropped point pattern is valid")
});

static THOUSANDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+)(?:[.,]([0-9]+))?[KkКк]$").expect("thousands pattern is valid")
});

static MILLIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+)(?:[.,]([0-9]+))?[MmМм]$").expect("millions pattern is valid")
});

static PLAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+)(?:[.,]([0-9]+))?$").expect("plain number pattern is valid")
});

static LOOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+)").expect("loose number pattern is valid"));

/// Returns true for characters that survive token cleaning.
fn is_number_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '.' | ',' | 'K' | 'k' | 'M' | 'm' | 'К' | 'к' | 'М' | 'м')
}

/// Re-inserts a decimal point dropped by OCR before a trailing 9.
///
/// `49K` becomes `4.9K`; `34K` is plausible as written and stays as is.
fn recover_dropped_point(clean: &str) -> Option<String> {
    let caps = DROPPED_POINT.captures(clean)?;
    if &caps[2] != "9" {
        return None;
    }

    Some(format!("{}.{}{}", &caps[1], &caps[2], &caps[3]))
}

/// Parses a run of ASCII digits, saturating on overflow.
fn parse_digits(digits: &str) -> u64 {
    digits.parse::<u64>().unwrap_or(u64::MAX)
}

/// Scales `integer.fraction` by `10^exponent` using integer arithmetic.
///
/// Fraction digits beyond the multiplier's precision are truncated.
fn scale(integer: &str, fraction: Option<&str>, exponent: u32) -> u64 {
    let multiplier = 10u64.pow(exponent);
    let whole = parse_digits(integer).saturating_mul(multiplier);

    let fraction_value = match fraction {
        Some(frac) if exponent > 0 => {
            let mut digits: String = frac.chars().take(exponent as usize).collect();
            while digits.len() < exponent as usize {
                digits.push('0');
            }
            parse_digits(&digits)
        }
        _ => 0,
    };

    whole.saturating_add(fraction_value)
}

/// Returns the best-guess integer value of an OCR token, or 0 when nothing parses.
pub fn parse_number_value(token: &str) -> u64 {
    let mut clean: String = token.chars().filter(|&c| is_number_char(c)).collect();
    if clean.is_empty() {
        return 0;
    }

    if let Some(corrected) = recover_dropped_point(&clean) {
        debug!(from = %clean, to = %corrected, "recovered dropped decimal point");
        clean = corrected;
    }

    let anchored = [(&*THOUSANDS, 3), (&*MILLIONS, 6), (&*PLAIN, 0)];
    for (pattern, exponent) in anchored {
        if let Some(caps) = pattern.captures(&clean) {
            let fraction = caps.get(2).map(|m| m.as_str());
            return scale(&caps[1], fraction, exponent);
        }
    }

    // OCR garbage around the number survives cleaning; take the first digit run.
    match LOOSE.captures(&clean) {
        Some(caps) => parse_digits(&caps[1]),
        None => {
            debug!(token, "no number found in token");
            0
        }
    }
}
