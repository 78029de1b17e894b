//! Shared fixtures for integration tests: an in-memory document store that
//! answers the engine's queries, a rate-scripted source keyed on query
//! shape, and a fixed clock.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use adval_core::{DetectorConfig, FeatureAttribute, Period, TimeConfig};
use adval_validation::{
    BucketCount, BucketQuery, Clock, DataSource, EntityBucket, SourceError, TopValuesQuery,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde_json::Value;

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Detector over `metrics` with `env == prod` filter, a `cpu` feature and
/// 10-minute interval and window delay.
pub fn detector(categories: &[&str]) -> DetectorConfig {
    DetectorConfig {
        name: "it-detector".into(),
        description: Some("integration".into()),
        time_field: "@timestamp".into(),
        indices: vec!["metrics".into()],
        filter_query: Some(serde_json::json!({"term": {"env": "prod"}})),
        feature_attributes: vec![FeatureAttribute {
            feature_name: "cpu_max".into(),
            feature_enabled: true,
            aggregation_query: serde_json::json!({"cpu_max": {"max": {"field": "cpu"}}}),
        }],
        category_field: categories.iter().map(|s| s.to_string()).collect(),
        detection_interval: Some(TimeConfig::from(Period::minutes(10))),
        window_delay: Some(TimeConfig::from(Period::minutes(10))),
    }
}

// ── In-memory documents ─────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Doc {
    pub at: DateTime<Utc>,
    pub fields: BTreeMap<String, String>,
}

impl Doc {
    pub fn at(at: DateTime<Utc>) -> Self {
        Self {
            at,
            fields: BTreeMap::new(),
        }
    }

    pub fn field(mut self, name: &str, value: &str) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }
}

/// Evenly spaced documents from `from` up to (not including) `to`.
pub fn series(from: DateTime<Utc>, to: DateTime<Utc>, every: TimeDelta, make: impl Fn(usize, Doc) -> Doc) -> Vec<Doc> {
    let mut docs = Vec::new();
    let mut at = from;
    let mut i = 0;
    while at < to {
        docs.push(make(i, Doc::at(at)));
        at += every;
        i += 1;
    }
    docs
}

/// Answers engine queries by scanning a document list. Supports `term` and
/// `match_all` filters only.
#[derive(Default)]
pub struct MemorySource {
    docs: Vec<Doc>,
    bucket_queries: AtomicUsize,
    entity_queries: AtomicUsize,
}

impl MemorySource {
    pub fn new(docs: Vec<Doc>) -> Self {
        Self {
            docs,
            ..Self::default()
        }
    }

    pub fn bucket_queries(&self) -> usize {
        self.bucket_queries.load(Ordering::SeqCst)
    }

    pub fn entity_queries(&self) -> usize {
        self.entity_queries.load(Ordering::SeqCst)
    }

    fn matches_filter(doc: &Doc, filter: Option<&Value>) -> Result<bool, SourceError> {
        let Some(filter) = filter else {
            return Ok(true);
        };
        if filter.get("match_all").is_some() {
            return Ok(true);
        }
        let term = filter
            .get("term")
            .and_then(Value::as_object)
            .ok_or_else(|| SourceError::QueryFailed(format!("unsupported filter: {filter}")))?;
        Ok(term.iter().all(|(field, expected)| {
            let expected = expected.get("value").unwrap_or(expected);
            doc.fields.get(field).map(String::as_str) == expected.as_str()
        }))
    }
}

#[async_trait]
impl DataSource for MemorySource {
    async fn bucket_counts(&self, query: &BucketQuery) -> Result<Option<Vec<BucketCount>>, SourceError> {
        self.bucket_queries.fetch_add(1, Ordering::SeqCst);
        let step = TimeDelta::minutes(query.interval_minutes.max(1) as i64);
        let n = ((query.end - query.start).num_minutes() / step.num_minutes()).max(0) as usize;
        let mut counts = vec![0u64; n];

        for doc in &self.docs {
            if doc.at < query.start || doc.at >= query.end || !Self::matches_filter(doc, query.filter.as_ref())? {
                continue;
            }
            if query.entity.iter().any(|(f, v)| doc.fields.get(f).map(String::as_str) != Some(v)) {
                continue;
            }
            if query.exists.iter().any(|f| !doc.fields.contains_key(f)) {
                continue;
            }
            let idx = ((doc.at - query.start).num_minutes() / step.num_minutes()) as usize;
            if let Some(c) = counts.get_mut(idx) {
                *c += 1;
            }
        }

        Ok(Some(
            counts
                .into_iter()
                .enumerate()
                .map(|(i, doc_count)| BucketCount {
                    start: query.start + step * i as i32,
                    doc_count,
                })
                .collect(),
        ))
    }

    async fn top_entities(&self, query: &TopValuesQuery) -> Result<Option<Vec<EntityBucket>>, SourceError> {
        self.entity_queries.fetch_add(1, Ordering::SeqCst);
        let mut groups: BTreeMap<Vec<Option<String>>, u64> = BTreeMap::new();
        for doc in &self.docs {
            if !Self::matches_filter(doc, query.filter.as_ref())? {
                continue;
            }
            let key: Vec<Option<String>> = query.fields.iter().map(|f| doc.fields.get(f).cloned()).collect();
            if key.iter().all(Option::is_none) {
                continue;
            }
            *groups.entry(key).or_default() += 1;
        }

        let buckets = groups
            .into_iter()
            .take(query.size)
            .map(|(values, doc_count)| EntityBucket {
                key: query.fields.iter().cloned().zip(values).collect(),
                doc_count,
            })
            .collect();
        Ok(Some(buckets))
    }

    async fn latest_timestamp(&self, _indices: &[String], _field: &str) -> Result<Option<DateTime<Utc>>, SourceError> {
        Ok(self.docs.iter().map(|d| d.at).max())
    }

    async fn earliest_timestamp(&self, _indices: &[String], _field: &str) -> Result<Option<DateTime<Utc>>, SourceError> {
        Ok(self.docs.iter().map(|d| d.at).min())
    }
}

// ── Rate-scripted source ────────────────────────────────────────────

/// Serves a fixed number of full buckets per query shape:
/// raw (no filter), filtered, filtered + entity, and anything with feature
/// predicates. Buckets beyond `full` are empty.
pub struct ShapeSource {
    pub raw: usize,
    pub filtered: usize,
    pub entity: usize,
    pub features: usize,
    pub entities: Option<Vec<EntityBucket>>,
    pub latest: Option<DateTime<Utc>>,
    pub bucket_queries: AtomicUsize,
}

impl ShapeSource {
    fn full_for(&self, query: &BucketQuery) -> usize {
        if !query.exists.is_empty() {
            self.features
        } else if !query.entity.is_empty() {
            self.entity
        } else if query.filter.is_some() {
            self.filtered
        } else {
            self.raw
        }
    }
}

#[async_trait]
impl DataSource for ShapeSource {
    async fn bucket_counts(&self, query: &BucketQuery) -> Result<Option<Vec<BucketCount>>, SourceError> {
        self.bucket_queries.fetch_add(1, Ordering::SeqCst);
        let step = TimeDelta::minutes(query.interval_minutes.max(1) as i64);
        let n = ((query.end - query.start).num_minutes() / step.num_minutes()).max(0) as usize;
        let full = self.full_for(query);
        Ok(Some(
            (0..n)
                .map(|i| BucketCount {
                    start: query.start + step * i as i32,
                    doc_count: u64::from(i < full),
                })
                .collect(),
        ))
    }

    async fn top_entities(&self, _query: &TopValuesQuery) -> Result<Option<Vec<EntityBucket>>, SourceError> {
        Ok(self.entities.clone())
    }

    async fn latest_timestamp(&self, _indices: &[String], _field: &str) -> Result<Option<DateTime<Utc>>, SourceError> {
        Ok(self.latest)
    }

    async fn earliest_timestamp(&self, _indices: &[String], _field: &str) -> Result<Option<DateTime<Utc>>, SourceError> {
        Ok(self.latest.map(|l| l - TimeDelta::days(3)))
    }
}
