//! Data-source abstraction and the query shapes the engine issues.
//!
//! Validation needs four capabilities from the search backend. They are
//! expressed as the [`DataSource`] trait so the engine stays transport-free;
//! the OpenSearch client crate injects the real implementation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entity::TopEntity;

/// Abstraction over the search backend.
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    /// Run a bucketed count aggregation (date histogram with empty buckets kept).
    ///
    /// Returns `None` when the response carried no aggregation at all.
    async fn bucket_counts(&self, query: &BucketQuery) -> Result<Option<Vec<BucketCount>>, SourceError>;

    /// Group documents by the category fields and return the buckets.
    ///
    /// Returns `None` when the response carried no aggregation at all.
    async fn top_entities(&self, query: &TopValuesQuery) -> Result<Option<Vec<EntityBucket>>, SourceError>;

    /// Most recent value of the time field, `None` when there is no data.
    async fn latest_timestamp(
        &self,
        indices: &[String],
        time_field: &str,
    ) -> Result<Option<DateTime<Utc>>, SourceError>;

    /// Oldest value of the time field, `None` when there is no data.
    async fn earliest_timestamp(
        &self,
        indices: &[String],
        time_field: &str,
    ) -> Result<Option<DateTime<Utc>>, SourceError>;
}

/// One density probe: count documents per fixed interval over `[start, end]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketQuery {
    pub indices: Vec<String>,
    pub time_field: String,
    /// The detector's own filter query, opaque to the engine.
    pub filter: Option<serde_json::Value>,
    /// `field == value` predicates for the selected top entity.
    pub entity: TopEntity,
    /// Fields that must exist on every counted document.
    pub exists: Vec<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub interval_minutes: u64,
}

/// A single histogram bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BucketCount {
    pub start: DateTime<Utc>,
    pub doc_count: u64,
}

/// Grouping aggregation over one or more category fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopValuesQuery {
    pub indices: Vec<String>,
    pub fields: Vec<String>,
    pub filter: Option<serde_json::Value>,
    /// Upper bound on the number of groups the backend should consider.
    pub size: usize,
}

/// One group from a [`TopValuesQuery`]. A `None` value means the backend
/// returned a missing/null key for that field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityBucket {
    pub key: BTreeMap<String, Option<String>>,
    pub doc_count: u64,
}

/// Errors raised by a [`DataSource`].
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Search query failed: {0}")]
    QueryFailed(String),

    #[error("Search query timed out after {0}ms")]
    Timeout(u64),

    #[error("Malformed search response: {0}")]
    MalformedResponse(String),

    /// The query could not be built, so nothing was sent.
    #[error("Invalid search query: {0}")]
    InvalidQuery(String),
}
