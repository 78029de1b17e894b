//! Window-delay advice: is data arriving later than the configured delay?

use adval_core::Period;
use chrono::{DateTime, TimeDelta, Utc};

/// Whole minutes between `latest` and `now`, never negative.
pub fn minutes_behind(now: DateTime<Utc>, latest: DateTime<Utc>) -> u64 {
    (now - latest).num_minutes().max(0) as u64
}

/// Recommend a larger window delay when the newest data point is older than
/// `now - configured`. A missing configured delay counts as zero.
pub fn recommend_window_delay(
    now: DateTime<Utc>,
    latest: DateTime<Utc>,
    configured: Option<Period>,
) -> Option<Period> {
    let delay = configured.map(|p| p.to_delta()).unwrap_or(TimeDelta::zero());
    if now - latest > delay {
        Some(Period::minutes(minutes_behind(now, latest)))
    } else {
        None
    }
}
