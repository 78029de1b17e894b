//! Validation outcomes, the user-facing issues they map to, and errors.

use adval_core::Period;
use serde::{Deserialize, Serialize};

use crate::source::SourceError;

// ── Outcome ─────────────────────────────────────────────────────────

/// The single result of one model-validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum ValidationOutcome {
    /// Data is dense enough at the declared interval and arrives in time.
    Success,
    /// A different interval is dense enough.
    IntervalRecommendation(Period),
    /// Data arrives later than the configured window delay allows.
    WindowDelayRecommendation(Period),
    Sparsity(SparsityCause),
    /// The interval search ran out of time: density is unknown, not bad.
    Timeout,
    /// The backend answered without the expected aggregation.
    InternalError(String),
}

/// Which part of the configuration makes the data too sparse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SparsityCause {
    /// No document carries the time field.
    NoHistoricalData,
    /// No complete combination of category values exists.
    NoCategoryEntity,
    RawData,
    FilterQuery,
    CategoryField,
    FeatureQuery,
}

/// Configuration element an issue points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    TimeField,
    Indices,
    FilterQuery,
    Category,
    FeatureAttributes,
    DetectionInterval,
    WindowDelay,
    ModelValidation,
}

/// A user-actionable finding derived from an outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested: Option<Period>,
}

const UNEXPECTED_FAILURE: &str = "Model validation experienced issues completing.";

impl SparsityCause {
    pub fn kind(self) -> IssueKind {
        match self {
            SparsityCause::NoHistoricalData => IssueKind::TimeField,
            SparsityCause::NoCategoryEntity | SparsityCause::CategoryField => IssueKind::Category,
            SparsityCause::RawData => IssueKind::Indices,
            SparsityCause::FilterQuery => IssueKind::FilterQuery,
            SparsityCause::FeatureQuery => IssueKind::FeatureAttributes,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            SparsityCause::NoHistoricalData => {
                "There isn't enough historical data found with the current time field selected."
            }
            SparsityCause::NoCategoryEntity => "No entity was found with the given categorical fields.",
            SparsityCause::RawData => {
                "Source index data is potentially too sparse for model training. \
                 Consider changing the interval length or ingesting more data."
            }
            SparsityCause::FilterQuery => {
                "Data is too sparse after the data filter is applied. Consider changing the data filter."
            }
            SparsityCause::CategoryField => {
                "Data is too sparse with the selected category fields. \
                 Consider revising the category fields or ingesting more data."
            }
            SparsityCause::FeatureQuery => {
                "Data is most likely too sparse when the feature queries are applied. \
                 Consider revising the feature queries."
            }
        }
    }
}

impl ValidationOutcome {
    /// The issue to show the user, `None` on success.
    pub fn issue(&self) -> Option<ValidationIssue> {
        let issue = match self {
            ValidationOutcome::Success => return None,
            ValidationOutcome::IntervalRecommendation(p) => ValidationIssue {
                kind: IssueKind::DetectionInterval,
                message: format!("We suggest using a detector interval of: {}", p.interval),
                suggested: Some(*p),
            },
            ValidationOutcome::WindowDelayRecommendation(p) => ValidationIssue {
                kind: IssueKind::WindowDelay,
                message: format!("We suggest using a window delay value of at least: {}", p.interval),
                suggested: Some(*p),
            },
            ValidationOutcome::Sparsity(cause) => ValidationIssue {
                kind: cause.kind(),
                message: cause.message().to_string(),
                suggested: None,
            },
            ValidationOutcome::Timeout => ValidationIssue {
                kind: IssueKind::ModelValidation,
                message: format!("{UNEXPECTED_FAILURE} Timed out searching for a dense interval."),
                suggested: None,
            },
            ValidationOutcome::InternalError(detail) => ValidationIssue {
                kind: IssueKind::ModelValidation,
                message: format!("{UNEXPECTED_FAILURE} {detail}"),
                suggested: None,
            },
        };
        Some(issue)
    }
}

// ── Errors ──────────────────────────────────────────────────────────

/// Failures that are not validation findings.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// The backend query itself failed; passed through untouched.
    #[error(transparent)]
    Upstream(#[from] SourceError),

    #[error("Invalid detector: {0}")]
    InvalidDetector(String),
}
