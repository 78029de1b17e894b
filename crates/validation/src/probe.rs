//! Density probes: build one bucket query for a given scope and interval and
//! turn the response into a full-bucket rate.

use adval_core::DetectorConfig;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::density::{full_bucket_rate, sample_bounds};
use crate::entity::TopEntity;
use crate::source::{BucketQuery, DataSource, SourceError};

/// Which parts of the detector configuration a probe applies.
#[derive(Debug, Clone, Default)]
pub(crate) struct Scope {
    pub filter: bool,
    pub entity: TopEntity,
    pub features: Vec<String>,
}

impl Scope {
    /// No filter, no entity, no feature predicate.
    pub fn raw() -> Self {
        Self::default()
    }

    pub fn filtered() -> Self {
        Self {
            filter: true,
            ..Self::default()
        }
    }

    pub fn with_entity(mut self, entity: TopEntity) -> Self {
        self.entity = entity;
        self
    }

    pub fn with_features(mut self, features: Vec<String>) -> Self {
        self.features = features;
        self
    }
}

/// Fixed inputs for every probe of one validation run.
pub(crate) struct Probe<'a> {
    source: &'a dyn DataSource,
    detector: &'a DetectorConfig,
    end: DateTime<Utc>,
    sample_count: u64,
}

impl<'a> Probe<'a> {
    pub fn new(
        source: &'a dyn DataSource,
        detector: &'a DetectorConfig,
        end: DateTime<Utc>,
        sample_count: u64,
    ) -> Self {
        Self {
            source,
            detector,
            end,
            sample_count,
        }
    }

    pub fn source(&self) -> &'a dyn DataSource {
        self.source
    }

    pub fn detector(&self) -> &'a DetectorConfig {
        self.detector
    }

    /// Bucket query for `scope` at `interval_minutes`. Fails when the sample
    /// window does not fit the representable time range.
    pub fn query(&self, scope: &Scope, interval_minutes: u64) -> Result<BucketQuery, SourceError> {
        let (start, end) = sample_bounds(self.end, self.sample_count, interval_minutes).ok_or_else(|| {
            SourceError::InvalidQuery(format!(
                "{} buckets of {interval_minutes}m before {} exceed the supported time range",
                self.sample_count, self.end
            ))
        })?;
        Ok(BucketQuery {
            indices: self.detector.indices.clone(),
            time_field: self.detector.time_field.clone(),
            filter: if scope.filter {
                self.detector.filter_query.clone()
            } else {
                None
            },
            entity: scope.entity.clone(),
            exists: scope.features.clone(),
            start,
            end,
            interval_minutes,
        })
    }

    /// Full-bucket rate at `interval_minutes`, `None` when the response had
    /// no aggregation.
    pub async fn rate(&self, scope: &Scope, interval_minutes: u64) -> Result<Option<f64>, SourceError> {
        let query = self.query(scope, interval_minutes)?;
        let Some(buckets) = self.source.bucket_counts(&query).await? else {
            tracing::warn!(detector = %self.detector.name, "unexpected missing bucket aggregation");
            return Ok(None);
        };
        let rate = full_bucket_rate(&buckets, self.sample_count);
        debug!(
            detector = %self.detector.name,
            interval_minutes,
            buckets = buckets.len(),
            rate,
            "density probe"
        );
        Ok(Some(rate))
    }
}
