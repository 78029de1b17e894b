//! Full-bucket rate: the fraction of expected buckets holding at least one
//! document.

use adval_core::ValidationSettings;
use chrono::{DateTime, TimeDelta, Utc};

use crate::source::BucketCount;

/// Expected number of buckets for a sample window at the given interval.
///
/// `max(training_window_hours * 60 / interval, min_samples)`, never below one.
pub fn sample_count(interval_minutes: u64, settings: &ValidationSettings) -> u64 {
    let interval = interval_minutes.max(1);
    (settings.training_window_hours * 60 / interval).max(settings.min_samples.max(1))
}

/// Length of `samples` buckets of `interval_minutes`, `None` when it does
/// not fit a [`TimeDelta`].
pub fn sample_span(samples: u64, interval_minutes: u64) -> Option<TimeDelta> {
    let minutes = samples.checked_mul(interval_minutes)?;
    TimeDelta::try_minutes(i64::try_from(minutes).ok()?)
}

/// Window `[end - samples * interval, end]` for a probe at `interval_minutes`.
///
/// `None` when the window would start before the earliest representable
/// instant.
pub fn sample_bounds(
    end: DateTime<Utc>,
    samples: u64,
    interval_minutes: u64,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = end.checked_sub_signed(sample_span(samples, interval_minutes)?)?;
    Some((start, end))
}

/// Fraction of `expected` buckets with a positive count, clamped to `[0, 1]`.
///
/// Backends may return one bucket more than expected when the window edge is
/// not aligned to the interval, so the numerator is capped.
pub fn full_bucket_rate(buckets: &[BucketCount], expected: u64) -> f64 {
    let expected = expected.max(1);
    let non_empty = buckets.iter().filter(|b| b.doc_count > 0).count() as u64;
    non_empty.min(expected) as f64 / expected as f64
}
