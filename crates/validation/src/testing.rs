//! Test doubles: a scripted [`DataSource`] and a manual [`Clock`].

use std::sync::Mutex;

use adval_core::{DetectorConfig, FeatureAttribute, Period, TimeConfig};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use crate::clock::Clock;
use crate::source::{BucketCount, BucketQuery, DataSource, EntityBucket, SourceError, TopValuesQuery};

/// Reference "now" for unit tests.
pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// Detector with a 10-minute interval, a 10-minute window delay, one filter,
/// one feature on `cpu`, and the given category fields.
pub(crate) fn detector(categories: &[&str]) -> DetectorConfig {
    DetectorConfig {
        name: "unit-detector".into(),
        description: None,
        time_field: "timestamp".into(),
        indices: vec!["logs".into()],
        filter_query: Some(serde_json::json!({"term": {"env": "prod"}})),
        feature_attributes: vec![FeatureAttribute {
            feature_name: "cpu_avg".into(),
            feature_enabled: true,
            aggregation_query: serde_json::json!({"cpu_avg": {"avg": {"field": "cpu"}}}),
        }],
        category_field: categories.iter().map(|s| s.to_string()).collect(),
        detection_interval: Some(TimeConfig::from(Period::minutes(10))),
        window_delay: Some(TimeConfig::from(Period::minutes(10))),
    }
}

pub(crate) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(crate) fn at(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub(crate) fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().unwrap();
        *now += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

type BucketResponder = Box<dyn Fn(&BucketQuery, usize) -> Result<Option<f64>, SourceError> + Send + Sync>;

#[derive(Clone)]
enum EntityScript {
    Respond(Option<Vec<EntityBucket>>),
    Fail(String),
}

/// A [`DataSource`] whose bucket responses are scripted as full-bucket rates.
///
/// A rate `r` is materialized as `round(r * n)` non-empty buckets out of the
/// `n` buckets spanned by the query window. Every query is recorded.
pub(crate) struct ScriptedSource {
    responder: BucketResponder,
    entities: EntityScript,
    latest: Option<DateTime<Utc>>,
    earliest: Option<DateTime<Utc>>,
    bucket_calls: Mutex<Vec<BucketQuery>>,
    entity_calls: Mutex<Vec<TopValuesQuery>>,
}

impl ScriptedSource {
    /// Dense data everywhere; latest point one minute before [`t0`].
    pub(crate) fn new() -> Self {
        Self {
            responder: Box::new(|_, _| Ok(Some(1.0))),
            entities: EntityScript::Respond(Some(Vec::new())),
            latest: Some(t0() - TimeDelta::minutes(1)),
            earliest: Some(t0() - TimeDelta::days(7)),
            bucket_calls: Mutex::new(Vec::new()),
            entity_calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_bucket_responder<F>(mut self, f: F) -> Self
    where
        F: Fn(&BucketQuery, usize) -> Result<Option<f64>, SourceError> + Send + Sync + 'static,
    {
        self.responder = Box::new(f);
        self
    }

    /// Rates served in call order; the last one repeats.
    pub(crate) fn with_rates(self, rates: Vec<f64>) -> Self {
        self.with_bucket_responder(move |_, call| {
            Ok(rates.get(call).or(rates.last()).copied())
        })
    }

    pub(crate) fn with_rate_fn<F>(self, f: F) -> Self
    where
        F: Fn(&BucketQuery) -> f64 + Send + Sync + 'static,
    {
        self.with_bucket_responder(move |q, _| Ok(Some(f(q))))
    }

    pub(crate) fn with_entities(mut self, buckets: Option<Vec<EntityBucket>>) -> Self {
        self.entities = EntityScript::Respond(buckets);
        self
    }

    pub(crate) fn failing_entities(mut self, msg: &str) -> Self {
        self.entities = EntityScript::Fail(msg.to_string());
        self
    }

    pub(crate) fn with_latest(mut self, latest: Option<DateTime<Utc>>) -> Self {
        self.latest = latest;
        self
    }

    pub(crate) fn with_earliest(mut self, earliest: Option<DateTime<Utc>>) -> Self {
        self.earliest = earliest;
        self
    }

    pub(crate) fn bucket_calls(&self) -> Vec<BucketQuery> {
        self.bucket_calls.lock().unwrap().clone()
    }

    pub(crate) fn entity_calls(&self) -> Vec<TopValuesQuery> {
        self.entity_calls.lock().unwrap().clone()
    }
}

/// Materialize a rate as bucket counts over the query window.
pub(crate) fn buckets_for_rate(query: &BucketQuery, rate: f64) -> Vec<BucketCount> {
    let interval = query.interval_minutes.max(1) as i64;
    let n = ((query.end - query.start).num_minutes() / interval).max(0) as usize;
    let full = ((rate.clamp(0.0, 1.0)) * n as f64).round() as usize;
    (0..n)
        .map(|i| BucketCount {
            start: query.start + TimeDelta::minutes(i as i64 * interval),
            doc_count: if i < full { 1 } else { 0 },
        })
        .collect()
}

#[async_trait::async_trait]
impl DataSource for ScriptedSource {
    async fn bucket_counts(&self, query: &BucketQuery) -> Result<Option<Vec<BucketCount>>, SourceError> {
        let call = {
            let mut calls = self.bucket_calls.lock().unwrap();
            calls.push(query.clone());
            calls.len() - 1
        };
        let rate = (self.responder)(query, call)?;
        Ok(rate.map(|r| buckets_for_rate(query, r)))
    }

    async fn top_entities(&self, query: &TopValuesQuery) -> Result<Option<Vec<EntityBucket>>, SourceError> {
        self.entity_calls.lock().unwrap().push(query.clone());
        match &self.entities {
            EntityScript::Respond(buckets) => Ok(buckets.clone()),
            EntityScript::Fail(msg) => Err(SourceError::QueryFailed(msg.clone())),
        }
    }

    async fn latest_timestamp(
        &self,
        _indices: &[String],
        _time_field: &str,
    ) -> Result<Option<DateTime<Utc>>, SourceError> {
        Ok(self.latest)
    }

    async fn earliest_timestamp(
        &self,
        _indices: &[String],
        _time_field: &str,
    ) -> Result<Option<DateTime<Utc>>, SourceError> {
        Ok(self.earliest)
    }
}
