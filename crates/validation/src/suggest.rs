//! Parameter suggestions: detection interval, history length, window delay.
//!
//! Requested suggestions run concurrently and share nothing mutable. When
//! both `interval` and `history` are requested, the interval is searched once
//! and the history is counted in units of the suggested interval.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use adval_core::{DetectorConfig, Period, TimeConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::interval::{search_interval, SearchOutcome};
use crate::outcome::{SparsityCause, ValidationError};
use crate::probe::{Probe, Scope};
use crate::source::SourceError;
use crate::validator::{sample_window, ModelValidator, Prepared};
use crate::window_delay::minutes_behind;

// ── Names ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestName {
    Interval,
    History,
    WindowDelay,
}

impl FromStr for SuggestName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "interval" | "detection_interval" => Ok(SuggestName::Interval),
            "history" | "history_interval" => Ok(SuggestName::History),
            "window_delay" | "windowDelay" => Ok(SuggestName::WindowDelay),
            other => Err(format!("unknown parameter '{other}'")),
        }
    }
}

impl fmt::Display for SuggestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SuggestName::Interval => "interval",
            SuggestName::History => "history",
            SuggestName::WindowDelay => "window_delay",
        };
        f.write_str(name)
    }
}

/// Parse a comma-separated parameter list. Blank and unknown entries are
/// dropped; nothing left is an error.
pub fn parse_suggest_names(raw: &str) -> Result<BTreeSet<SuggestName>, SuggestError> {
    let mut names = BTreeSet::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        match entry.parse::<SuggestName>() {
            Ok(name) => {
                names.insert(name);
            }
            Err(e) => debug!(entry, error = %e, "ignoring suggestion parameter"),
        }
    }
    if names.is_empty() {
        return Err(SuggestError::NoParameters);
    }
    Ok(names)
}

// ── Result ──────────────────────────────────────────────────────────

/// Suggested values, one per requested parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSuggestions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<TimeConfig>,
    /// Number of intervals of history the data covers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<u64>,
    #[serde(rename = "windowDelay", default, skip_serializing_if = "Option::is_none")]
    pub window_delay: Option<TimeConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum SuggestError {
    #[error("No valid parameter to suggest")]
    NoParameters,

    #[error("No interval recommendation was found")]
    NoIntervalFound,

    #[error("Timed out searching for an interval recommendation")]
    Timeout,

    #[error("No historical data found for the configured time field")]
    NoData,

    #[error("No entity was found with the given categorical fields")]
    NoCategoryEntity,

    #[error("Invalid detector: {0}")]
    InvalidDetector(String),

    #[error("Suggestion failed: {0}")]
    InternalError(String),

    #[error(transparent)]
    Upstream(#[from] SourceError),
}

impl From<SparsityCause> for SuggestError {
    fn from(cause: SparsityCause) -> Self {
        match cause {
            SparsityCause::NoCategoryEntity => SuggestError::NoCategoryEntity,
            SparsityCause::NoHistoricalData => SuggestError::NoData,
            other => SuggestError::InternalError(other.message().to_string()),
        }
    }
}

impl From<ValidationError> for SuggestError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Upstream(e) => SuggestError::Upstream(e),
            ValidationError::InvalidDetector(msg) => SuggestError::InvalidDetector(msg),
        }
    }
}

// ── Suggesters ──────────────────────────────────────────────────────

impl ModelValidator {
    /// Suggest every requested parameter. Any failure fails the request.
    pub async fn suggest(
        &self,
        detector: &DetectorConfig,
        names: &BTreeSet<SuggestName>,
    ) -> Result<ParameterSuggestions, SuggestError> {
        if names.is_empty() {
            return Err(SuggestError::NoParameters);
        }
        let want_interval = names.contains(&SuggestName::Interval);
        let want_history = names.contains(&SuggestName::History);
        let want_delay = names.contains(&SuggestName::WindowDelay);

        let interval_and_history = async {
            let interval = if want_interval {
                Some(self.suggest_interval(detector).await?)
            } else {
                None
            };
            let history = if want_history {
                let basis = interval
                    .or_else(|| detector.interval())
                    .unwrap_or(Period::minutes(1));
                Some(self.suggest_history(detector, basis).await?)
            } else {
                None
            };
            Ok::<_, SuggestError>((interval, history))
        };
        let window_delay = async {
            if want_delay {
                self.suggest_window_delay(detector).await.map(Some)
            } else {
                Ok(None)
            }
        };

        let (interval_and_history, window_delay) = tokio::join!(interval_and_history, window_delay);
        let (interval, history) = interval_and_history?;
        let window_delay = window_delay?;

        info!(detector = %detector.name, ?interval, ?history, ?window_delay, "parameter suggestions ready");
        Ok(ParameterSuggestions {
            interval: interval.map(TimeConfig::from),
            history,
            window_delay: window_delay.map(TimeConfig::from),
        })
    }

    /// Search for a dense interval starting from the declared one (one
    /// minute when none is declared).
    pub async fn suggest_interval(&self, detector: &DetectorConfig) -> Result<Period, SuggestError> {
        let start = detector.interval().map(|p| p.to_minutes()).unwrap_or(1).max(1);

        let baseline = match self.prepare(detector).await? {
            Prepared::Ready(baseline) => baseline,
            Prepared::Sparse(cause) => return Err(cause.into()),
        };

        let samples = sample_window(&baseline, start, &self.settings)?;
        let probe = Probe::new(self.source.as_ref(), detector, baseline.end, samples);
        let scope = Scope::filtered()
            .with_entity(baseline.entity)
            .with_features(detector.feature_fields());

        match search_interval(&probe, &scope, start, &self.settings, self.clock.as_ref()).await? {
            SearchOutcome::Found(found) => Ok(found),
            SearchOutcome::Exhausted => Err(SuggestError::NoIntervalFound),
            SearchOutcome::TimedOut => Err(SuggestError::Timeout),
            SearchOutcome::MissingAggregation => Err(SuggestError::InternalError(
                "search response carried no bucket aggregation".into(),
            )),
        }
    }

    /// Number of `interval`s between the earliest and latest data point,
    /// clamped to `[1, max_history_intervals]`.
    pub async fn suggest_history(&self, detector: &DetectorConfig, interval: Period) -> Result<u64, SuggestError> {
        let indices = &detector.indices;
        let field = &detector.time_field;
        let (latest, earliest) = tokio::try_join!(
            self.source.latest_timestamp(indices, field),
            self.source.earliest_timestamp(indices, field),
        )?;
        let (Some(latest), Some(earliest)) = (latest, earliest) else {
            return Err(SuggestError::NoData);
        };

        let span_ms = (latest - earliest).num_milliseconds().max(0) as u64;
        let step_ms = interval.to_minutes().max(1) * 60_000;
        let intervals = span_ms.div_ceil(step_ms);
        Ok(intervals.clamp(1, self.settings.max_history_intervals.max(1)))
    }

    /// Whole minutes between the latest data point and now.
    pub async fn suggest_window_delay(&self, detector: &DetectorConfig) -> Result<Period, SuggestError> {
        let latest = self
            .source
            .latest_timestamp(&detector.indices, &detector.time_field)
            .await?
            .ok_or(SuggestError::NoData)?;
        Ok(Period::minutes(minutes_behind(self.clock.now(), latest)))
    }
}
