//! Query DSL bodies for the engine's four capabilities.
//!
//! Every body is a `size: 0` aggregation search; hits are never read.

use adval_validation::{BucketQuery, TopValuesQuery};
use serde_json::{json, Value};

/// Aggregation names shared with the response parsers.
pub(crate) const DENSITY_AGG: &str = "density";
pub(crate) const ENTITY_AGG: &str = "top_entities";
pub(crate) const ENTITY_SORT_AGG: &str = "top_by_count";
pub(crate) const LATEST_AGG: &str = "latest";
pub(crate) const EARLIEST_AGG: &str = "earliest";

/// `bool.filter` clauses: optional detector filter, entity terms, field
/// existence, and an optional time range.
fn bool_filter(filter: Option<&Value>, extra: Vec<Value>) -> Value {
    let mut clauses: Vec<Value> = filter.cloned().into_iter().collect();
    clauses.extend(extra);
    if clauses.is_empty() {
        return json!({ "match_all": {} });
    }
    json!({ "bool": { "filter": clauses } })
}

/// Date histogram over `[start, end)` with empty buckets kept.
pub fn density_body(query: &BucketQuery) -> Value {
    let start = query.start.timestamp_millis();
    let end = query.end.timestamp_millis();

    let mut extra = vec![json!({
        "range": {
            &query.time_field: { "gte": start, "lt": end, "format": "epoch_millis" }
        }
    })];
    extra.extend(
        query
            .entity
            .iter()
            .map(|(field, value)| json!({ "term": { field: value } })),
    );
    extra.extend(
        query
            .exists
            .iter()
            .map(|field| json!({ "exists": { "field": field } })),
    );

    json!({
        "size": 0,
        "query": bool_filter(query.filter.as_ref(), extra),
        "aggs": {
            DENSITY_AGG: {
                "date_histogram": {
                    "field": query.time_field,
                    "fixed_interval": format!("{}m", query.interval_minutes.max(1)),
                    "min_doc_count": 0,
                    "extended_bounds": { "min": start, "max": (end - 1).max(start) },
                    "hard_bounds": { "min": start, "max": end }
                }
            }
        }
    })
}

/// Most populated category value(s).
///
/// One field uses a `terms` aggregation ordered by ascending count (the
/// caller picks the max); several fields use a `composite` aggregation
/// sorted by descending count and cut to one bucket.
pub fn top_entities_body(query: &TopValuesQuery) -> Value {
    let agg = match query.fields.as_slice() {
        [field] => json!({
            "terms": {
                "field": field,
                "size": query.size,
                "order": { "_count": "asc" }
            }
        }),
        fields => {
            let sources: Vec<Value> = fields
                .iter()
                .map(|f| json!({ f: { "terms": { "field": f } } }))
                .collect();
            json!({
                "composite": { "size": query.size, "sources": sources },
                "aggs": {
                    ENTITY_SORT_AGG: {
                        "bucket_sort": {
                            "sort": [{ "_count": { "order": "desc" } }],
                            "size": 1
                        }
                    }
                }
            })
        }
    };

    json!({
        "size": 0,
        "query": bool_filter(query.filter.as_ref(), Vec::new()),
        "aggs": { ENTITY_AGG: agg }
    })
}

/// `max` (latest) or `min` (earliest) of the time field.
pub fn timestamp_body(time_field: &str, latest: bool) -> Value {
    let (name, op) = if latest { (LATEST_AGG, "max") } else { (EARLIEST_AGG, "min") };
    json!({
        "size": 0,
        "aggs": { name: { op: { "field": time_field } } }
    })
}
