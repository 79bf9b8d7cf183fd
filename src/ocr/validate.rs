//! Sanity bounds for parsed statistics.
//!
//! Partial recognition (some fields 0) is accepted; implausible magnitudes and
//! internal inconsistencies are not. Fields are unsigned so negative values
//! cannot occur.

use thiserror::Error;
use tracing::{info, warn};

use super::extract::ParsedStatistics;

/// Longest plausible TikTok Live session.
pub const MAX_DURATION_MINUTES: u64 = 12 * 60;
pub const MAX_VIEWERS: u64 = 500_000;
pub const MAX_DIAMONDS: u64 = 100_000;
/// Viewer counts below this (and above 0) are OCR noise.
pub const MIN_VIEWERS: u64 = 5;

/// Why a parsed result was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("all values are 0")]
    AllZero,
    #[error("duration {0} min is out of range")]
    DurationOutOfRange(u64),
    #[error("viewers {0} is out of range")]
    ViewersOutOfRange(u64),
    #[error("gifters {gifters} exceed viewers {viewers}")]
    GiftersExceedViewers { gifters: u64, viewers: u64 },
    #[error("diamonds {0} is out of range")]
    DiamondsOutOfRange(u64),
    #[error("viewers {0} is too low to be real")]
    ViewersImplausiblyLow(u64),
}

/// Checks bounds and cross-field consistency.
pub fn validate_stats(stats: &ParsedStatistics) -> Result<(), ValidationError> {
    let result = check(stats);
    match &result {
        Ok(()) => info!(?stats, "statistics passed validation"),
        Err(e) => warn!(?stats, reason = %e, "statistics failed validation"),
    }
    result
}

fn check(stats: &ParsedStatistics) -> Result<(), ValidationError> {
    let ParsedStatistics {
        duration_minutes,
        viewers,
        gifters,
        diamonds,
    } = *stats;

    if duration_minutes == 0 && viewers == 0 && gifters == 0 && diamonds == 0 {
        return Err(ValidationError::AllZero);
    }
    if duration_minutes > MAX_DURATION_MINUTES {
        return Err(ValidationError::DurationOutOfRange(duration_minutes));
    }
    if viewers > MAX_VIEWERS {
        return Err(ValidationError::ViewersOutOfRange(viewers));
    }
    if viewers > 0 && gifters > viewers {
        return Err(ValidationError::GiftersExceedViewers { gifters, viewers });
    }
    if diamonds > MAX_DIAMONDS {
        return Err(ValidationError::DiamondsOutOfRange(diamonds));
    }
    if viewers > 0 && viewers < MIN_VIEWERS {
        return Err(ValidationError::ViewersImplausiblyLow(viewers));
    }
    Ok(())
}
