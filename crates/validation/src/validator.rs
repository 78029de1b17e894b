//! `ModelValidator`: the validation entry point.
//!
//! One run is strictly sequential: top entity (multi-entity only), latest
//! timestamp, interval search, then either the root-cause cascade or the
//! window-delay advisor. Each run produces exactly one outcome.

use std::sync::Arc;

use adval_core::{CoreError, DetectorConfig, ValidationSettings};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::cascade::{diagnose, CascadeOutcome};
use crate::clock::{Clock, SystemClock};
use crate::density::{sample_bounds, sample_count, sample_span};
use crate::entity::{resolve_top_entity, TopEntity};
use crate::interval::{search_interval, SearchOutcome};
use crate::outcome::{SparsityCause, ValidationError, ValidationOutcome};
use crate::probe::{Probe, Scope};
use crate::source::{DataSource, SourceError};
use crate::window_delay::recommend_window_delay;

/// What a single run delivers through its completion channel.
pub type ValidationReport = Result<ValidationOutcome, ValidationError>;

const MISSING_AGGREGATION: &str = "Failed to get a bucket aggregation from the search response.";

/// How deep a validation goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ValidationType {
    /// Structural checks only; no data is queried.
    Detector,
    /// Structural checks plus data density and freshness.
    #[default]
    Model,
}

/// Facts every data-driven check starts from.
#[derive(Debug, Clone)]
pub(crate) struct Baseline {
    pub entity: TopEntity,
    pub latest: DateTime<Utc>,
    /// `min(now, latest)`: right edge of every sample window.
    pub end: DateTime<Utc>,
}

pub(crate) enum Prepared {
    Ready(Baseline),
    Sparse(SparsityCause),
}

/// Runs validations against a [`DataSource`]. Cheap to clone; independent
/// runs share nothing mutable.
#[derive(Clone)]
pub struct ModelValidator {
    pub(crate) source: Arc<dyn DataSource>,
    pub(crate) settings: ValidationSettings,
    pub(crate) clock: Arc<dyn Clock>,
}

impl ModelValidator {
    /// Fails when `settings` would let the interval search run unbounded.
    pub fn new(source: Arc<dyn DataSource>, settings: ValidationSettings) -> Result<Self, CoreError> {
        settings.validate()?;
        Ok(Self {
            source,
            settings,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run one validation on a background task. The receiver yields exactly
    /// one report; a panicking run surfaces as a closed channel.
    pub fn spawn(&self, detector: DetectorConfig, kind: ValidationType) -> oneshot::Receiver<ValidationReport> {
        let (tx, rx) = oneshot::channel();
        let validator = self.clone();
        tokio::spawn(async move {
            let report = validator.validate(&detector, kind).await;
            if tx.send(report).is_err() {
                debug!(detector = %detector.name, "validation receiver dropped before completion");
            }
        });
        rx
    }

    /// Validate a detector and return its single outcome.
    ///
    /// Backend failures are returned as [`ValidationError::Upstream`] without
    /// retries; everything user-actionable is a [`ValidationOutcome`].
    pub async fn validate(&self, detector: &DetectorConfig, kind: ValidationType) -> ValidationReport {
        check_structure(detector)?;
        if kind == ValidationType::Detector {
            return Ok(ValidationOutcome::Success);
        }

        let declared = declared_minutes(detector, &self.settings)?;
        info!(detector = %detector.name, interval_minutes = declared, "starting model validation");

        let baseline = match self.prepare(detector).await? {
            Prepared::Ready(baseline) => baseline,
            Prepared::Sparse(cause) => {
                info!(detector = %detector.name, cause = ?cause, "validation stopped before interval search");
                return Ok(ValidationOutcome::Sparsity(cause));
            }
        };

        let samples = sample_window(&baseline, declared, &self.settings)?;
        let probe = Probe::new(self.source.as_ref(), detector, baseline.end, samples);
        let scope = Scope::filtered()
            .with_entity(baseline.entity.clone())
            .with_features(detector.feature_fields());

        let outcome = match search_interval(&probe, &scope, declared, &self.settings, self.clock.as_ref()).await? {
            SearchOutcome::Found(found) if found.to_minutes() == declared => self.check_window_delay(detector, &baseline),
            SearchOutcome::Found(found) => ValidationOutcome::IntervalRecommendation(found),
            SearchOutcome::TimedOut => ValidationOutcome::Timeout,
            SearchOutcome::MissingAggregation => ValidationOutcome::InternalError(MISSING_AGGREGATION.into()),
            SearchOutcome::Exhausted => match diagnose(&probe, declared, &self.settings).await? {
                CascadeOutcome::Sparse(stage) => ValidationOutcome::Sparsity(stage.cause()),
                CascadeOutcome::Passed => self.check_window_delay(detector, &baseline),
                CascadeOutcome::MissingAggregation => ValidationOutcome::InternalError(MISSING_AGGREGATION.into()),
            },
        };

        info!(detector = %detector.name, outcome = ?outcome, "model validation finished");
        Ok(outcome)
    }

    /// Resolve the top entity and the latest data point.
    pub(crate) async fn prepare(&self, detector: &DetectorConfig) -> Result<Prepared, SourceError> {
        let entity = resolve_top_entity(self.source.as_ref(), detector, None).await?;

        let latest = self
            .source
            .latest_timestamp(&detector.indices, &detector.time_field)
            .await?;
        let latest = match latest {
            Some(ts) if ts.timestamp_millis() > 0 => ts,
            _ => return Ok(Prepared::Sparse(SparsityCause::NoHistoricalData)),
        };

        if detector.is_multi_entity() && entity.is_empty() {
            return Ok(Prepared::Sparse(SparsityCause::NoCategoryEntity));
        }

        let end = self.clock.now().min(latest);
        Ok(Prepared::Ready(Baseline { entity, latest, end }))
    }

    fn check_window_delay(&self, detector: &DetectorConfig, baseline: &Baseline) -> ValidationOutcome {
        match recommend_window_delay(self.clock.now(), baseline.latest, detector.window_delay_period()) {
            Some(delay) => {
                warn!(
                    detector = %detector.name,
                    suggested_minutes = delay.interval,
                    "data arrives later than the configured window delay"
                );
                ValidationOutcome::WindowDelayRecommendation(delay)
            }
            None => ValidationOutcome::Success,
        }
    }
}

/// Checks that need no data.
pub(crate) fn check_structure(detector: &DetectorConfig) -> Result<(), ValidationError> {
    if detector.time_field.trim().is_empty() {
        return Err(ValidationError::InvalidDetector("time_field is empty".into()));
    }
    if detector.indices.iter().all(|i| i.trim().is_empty()) {
        return Err(ValidationError::InvalidDetector("no indices configured".into()));
    }
    Ok(())
}

/// Declared detection interval in whole minutes, at least one. Intervals
/// whose sample window cannot be expressed as a duration are rejected.
fn declared_minutes(detector: &DetectorConfig, settings: &ValidationSettings) -> Result<u64, ValidationError> {
    let minutes = detector
        .interval()
        .map(|p| p.to_minutes().max(1))
        .ok_or_else(|| ValidationError::InvalidDetector("detection_interval is not set".into()))?;
    match sample_span(sample_count(minutes, settings), minutes) {
        Some(_) => Ok(minutes),
        None => Err(interval_too_long(minutes)),
    }
}

/// Sample count at `minutes`, provided the whole window ends at
/// `baseline.end` and starts inside the representable time range.
pub(crate) fn sample_window(
    baseline: &Baseline,
    minutes: u64,
    settings: &ValidationSettings,
) -> Result<u64, ValidationError> {
    let samples = sample_count(minutes, settings);
    match sample_bounds(baseline.end, samples, minutes) {
        Some(_) => Ok(samples),
        None => Err(interval_too_long(minutes)),
    }
}

fn interval_too_long(minutes: u64) -> ValidationError {
    ValidationError::InvalidDetector(format!(
        "detection_interval of {minutes} minutes is too long to sample"
    ))
}
