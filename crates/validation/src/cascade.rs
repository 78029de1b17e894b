//! Sparsity root-cause cascade.
//!
//! Runs only after the interval search is exhausted. Re-probes the data at
//! the declared interval, adding one configuration element per stage, and
//! blames the first stage whose rate drops below the configuration-level
//! threshold.

use adval_core::ValidationSettings;
use serde::Serialize;
use tracing::info;

use crate::entity::{resolve_top_entity, TopEntity};
use crate::outcome::SparsityCause;
use crate::probe::{Probe, Scope};
use crate::source::SourceError;

/// Cascade stages in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    RawData,
    FilterQuery,
    CategoryField,
    FeatureQuery,
}

impl Stage {
    pub const ORDER: [Stage; 4] = [
        Stage::RawData,
        Stage::FilterQuery,
        Stage::CategoryField,
        Stage::FeatureQuery,
    ];

    pub fn cause(self) -> SparsityCause {
        match self {
            Stage::RawData => SparsityCause::RawData,
            Stage::FilterQuery => SparsityCause::FilterQuery,
            Stage::CategoryField => SparsityCause::CategoryField,
            Stage::FeatureQuery => SparsityCause::FeatureQuery,
        }
    }

    /// Stages that apply to a detector; the category stage only runs for
    /// multi-entity detectors.
    pub fn applicable(multi_entity: bool) -> impl Iterator<Item = Stage> {
        Self::ORDER
            .into_iter()
            .filter(move |s| multi_entity || *s != Stage::CategoryField)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeOutcome {
    /// Every stage reached the threshold.
    Passed,
    Sparse(Stage),
    /// A probe response carried no aggregation.
    MissingAggregation,
}

/// Run the cascade. Stops at the first sparse stage or the first backend
/// failure.
pub(crate) async fn diagnose(
    probe: &Probe<'_>,
    declared_minutes: u64,
    settings: &ValidationSettings,
) -> Result<CascadeOutcome, SourceError> {
    let detector = probe.detector();
    let threshold = settings.config_success_rate;
    let mut entity = TopEntity::default();

    for stage in Stage::applicable(detector.is_multi_entity()) {
        let scope = match stage {
            Stage::RawData => Scope::raw(),
            Stage::FilterQuery => Scope::filtered(),
            Stage::CategoryField => {
                entity = resolve_top_entity(probe.source(), detector, detector.filter_query.as_ref()).await?;
                if entity.is_empty() {
                    info!(detector = %detector.name, "no entity left after filter, category field too sparse");
                    return Ok(CascadeOutcome::Sparse(stage));
                }
                Scope::filtered().with_entity(entity.clone())
            }
            Stage::FeatureQuery => Scope::filtered()
                .with_entity(entity.clone())
                .with_features(detector.feature_fields()),
        };

        let Some(rate) = probe.rate(&scope, declared_minutes).await? else {
            return Ok(CascadeOutcome::MissingAggregation);
        };
        if rate < threshold {
            info!(detector = %detector.name, stage = ?stage, rate, threshold, "sparsity root cause found");
            return Ok(CascadeOutcome::Sparse(stage));
        }
    }

    Ok(CascadeOutcome::Passed)
}
