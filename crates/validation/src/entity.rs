//! Top-entity resolution for categorical detectors.
//!
//! A multi-entity detector trains one model per combination of category
//! values. Validation uses the most populated combination as a stand-in for
//! the whole population.

use std::collections::BTreeMap;

use adval_core::DetectorConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::source::{DataSource, EntityBucket, SourceError, TopValuesQuery};

/// Cap on the number of category combinations the backend groups over.
pub const MAX_ENTITY_BUCKETS: usize = 1000;

/// Selected value per category field. Empty means "no usable entity".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopEntity(BTreeMap<String, String>);

impl TopEntity {
    pub fn from_pairs<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Find the most populated entity of the detector's category fields.
///
/// `filter` restricts the population (the root-cause cascade passes the
/// detector filter; the initial lookup passes none). Backend failures are
/// returned as-is; there are no retries here.
pub async fn resolve_top_entity(
    source: &dyn DataSource,
    detector: &DetectorConfig,
    filter: Option<&serde_json::Value>,
) -> Result<TopEntity, SourceError> {
    let fields = &detector.category_field;
    if fields.is_empty() {
        return Ok(TopEntity::default());
    }

    let query = TopValuesQuery {
        indices: detector.indices.clone(),
        fields: fields.clone(),
        filter: filter.cloned(),
        size: MAX_ENTITY_BUCKETS,
    };

    let Some(buckets) = source.top_entities(&query).await? else {
        debug!(detector = %detector.name, "top entity response had no aggregation");
        return Ok(TopEntity::default());
    };

    let entity = select_top_entity(fields, &buckets);
    debug!(
        detector = %detector.name,
        groups = buckets.len(),
        found = !entity.is_empty(),
        "resolved top entity"
    );
    Ok(entity)
}

/// Pick the bucket with the highest document count (first one wins on ties)
/// and project it onto `fields`.
///
/// Returns an empty entity when there are no buckets or when any requested
/// field is missing or null in the winning key; a partial entity is never
/// returned.
pub fn select_top_entity(fields: &[String], buckets: &[EntityBucket]) -> TopEntity {
    // Single-field terms buckets arrive in ascending count order and
    // multi-field composite buckets arrive already sorted and truncated, so
    // a first-wins max covers both.
    let best = buckets.iter().fold(None::<&EntityBucket>, |best, b| match best {
        Some(current) if current.doc_count >= b.doc_count => Some(current),
        _ => Some(b),
    });
    let Some(best) = best else {
        return TopEntity::default();
    };

    let mut selected = BTreeMap::new();
    for field in fields {
        match best.key.get(field) {
            Some(Some(value)) => {
                selected.insert(field.clone(), value.clone());
            }
            _ => return TopEntity::default(),
        }
    }
    TopEntity(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{detector, ScriptedSource};

    fn bucket(pairs: &[(&str, Option<&str>)], doc_count: u64) -> EntityBucket {
        EntityBucket {
            key: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
                .collect(),
            doc_count,
        }
    }

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn single_field_picks_max_count() {
        let buckets = vec![
            bucket(&[("category", Some("a2"))], 1),
            bucket(&[("category", Some("a1"))], 9),
        ];
        let top = select_top_entity(&fields(&["category"]), &buckets);
        assert_eq!(top.get("category"), Some("a1"));
    }

    #[test]
    fn ties_resolve_to_first_bucket() {
        let buckets = vec![
            bucket(&[("host", Some("h1"))], 4),
            bucket(&[("host", Some("h2"))], 4),
        ];
        let top = select_top_entity(&fields(&["host"]), &buckets);
        assert_eq!(top.get("host"), Some("h1"));
    }

    #[test]
    fn multi_field_returns_every_field() {
        let buckets = vec![bucket(&[("host", Some("h1")), ("region", Some("eu"))], 30)];
        let top = select_top_entity(&fields(&["host", "region"]), &buckets);
        assert_eq!(top.get("host"), Some("h1"));
        assert_eq!(top.get("region"), Some("eu"));
    }

    #[test]
    fn null_value_yields_empty_entity() {
        let buckets = vec![bucket(&[("host", Some("h1")), ("region", None)], 30)];
        assert!(select_top_entity(&fields(&["host", "region"]), &buckets).is_empty());
    }

    #[test]
    fn missing_field_yields_empty_entity() {
        let buckets = vec![bucket(&[("host", Some("h1"))], 30)];
        assert!(select_top_entity(&fields(&["host", "region"]), &buckets).is_empty());
    }

    #[test]
    fn no_buckets_yields_empty_entity() {
        assert!(select_top_entity(&fields(&["host"]), &[]).is_empty());
    }

    #[tokio::test]
    async fn single_entity_detector_skips_backend() {
        let source = ScriptedSource::new();
        let d = detector(&[]);
        let top = resolve_top_entity(&source, &d, None).await.unwrap();
        assert!(top.is_empty());
        assert_eq!(source.entity_calls().len(), 0);
    }

    #[tokio::test]
    async fn query_carries_fields_filter_and_cap() {
        let source = ScriptedSource::new()
            .with_entities(Some(vec![bucket(&[("host", Some("h9"))], 2)]));
        let d = detector(&["host"]);
        let filter = serde_json::json!({"term": {"env": "prod"}});
        let top = resolve_top_entity(&source, &d, Some(&filter)).await.unwrap();
        assert_eq!(top.get("host"), Some("h9"));

        let calls = source.entity_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].fields, vec!["host".to_string()]);
        assert_eq!(calls[0].filter.as_ref(), Some(&filter));
        assert_eq!(calls[0].size, MAX_ENTITY_BUCKETS);
    }

    #[tokio::test]
    async fn missing_aggregation_yields_empty_entity() {
        let source = ScriptedSource::new().with_entities(None);
        let top = resolve_top_entity(&source, &detector(&["host"]), None).await.unwrap();
        assert!(top.is_empty());
    }

    #[tokio::test]
    async fn backend_failure_propagates() {
        let source = ScriptedSource::new().failing_entities("index_not_found_exception");
        let err = resolve_top_entity(&source, &detector(&["host"]), None).await.unwrap_err();
        assert!(matches!(err, SourceError::QueryFailed(msg) if msg.contains("index_not_found")));
    }
}
