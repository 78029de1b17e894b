//! Adaptive interval search.
//!
//! Probes the data at the declared interval, then at longer intervals
//! (× growth multiplier) until the ceiling, then at shorter ones
//! (× shrink multiplier from the declared interval) until the shrink budget
//! is spent. The first interval whose full-bucket rate clears the threshold
//! wins. Rounds are strictly sequential and the deadline is checked between
//! rounds only.

mod machine;

pub use machine::{IntervalSearch, Phase, Transition};

use adval_core::{Period, ValidationSettings};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::probe::{Probe, Scope};
use crate::source::SourceError;

/// How an interval search ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Found(Period),
    Exhausted,
    TimedOut,
    /// A probe response carried no aggregation.
    MissingAggregation,
}

/// Drive an [`IntervalSearch`] against the data source until it terminates.
pub(crate) async fn search_interval(
    probe: &Probe<'_>,
    scope: &Scope,
    original_minutes: u64,
    settings: &ValidationSettings,
    clock: &dyn Clock,
) -> Result<SearchOutcome, SourceError> {
    let now = clock.now();
    let deadline = i64::try_from(settings.timeout_ms)
        .ok()
        .and_then(TimeDelta::try_milliseconds)
        .and_then(|budget| now.checked_add_signed(budget))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    let mut search = IntervalSearch::new(original_minutes, settings, deadline);

    loop {
        let minutes = search.candidate();
        let Some(rate) = probe.rate(scope, minutes).await? else {
            return Ok(SearchOutcome::MissingAggregation);
        };

        search = match search.advance(rate, clock.now()) {
            Transition::Probe(next) => {
                debug!(
                    from = minutes,
                    to = next.candidate(),
                    phase = ?next.phase(),
                    rate,
                    "interval too sparse, retrying"
                );
                next
            }
            Transition::Found(found) => {
                info!(interval_minutes = found, rate, "interval search found a dense interval");
                return Ok(SearchOutcome::Found(Period::minutes(found)));
            }
            Transition::Exhausted => {
                info!(original_minutes, "interval search exhausted");
                return Ok(SearchOutcome::Exhausted);
            }
            Transition::TimedOut => {
                info!(original_minutes, "timed out getting interval recommendation");
                return Ok(SearchOutcome::TimedOut);
            }
        };
    }
}
