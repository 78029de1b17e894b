//! Response parsers. A missing aggregation yields `None`; a present but
//! ill-shaped one is an error.

use adval_validation::{BucketCount, EntityBucket};
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::dsl::{DENSITY_AGG, ENTITY_AGG};
use crate::error::OpenSearchError;

fn aggregation<'a>(body: &'a Value, name: &str) -> Option<&'a Value> {
    body.get("aggregations").and_then(|aggs| aggs.get(name))
}

fn buckets<'a>(agg: &'a Value, name: &str) -> Result<&'a Vec<Value>, OpenSearchError> {
    agg.get("buckets")
        .and_then(Value::as_array)
        .ok_or_else(|| OpenSearchError::Parse(format!("aggregation '{name}' has no buckets array")))
}

fn doc_count(bucket: &Value) -> Result<u64, OpenSearchError> {
    bucket
        .get("doc_count")
        .and_then(Value::as_u64)
        .ok_or_else(|| OpenSearchError::Parse("bucket without doc_count".into()))
}

/// Key values arrive as strings, numbers or booleans; `null` means missing.
fn key_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

pub fn parse_density(body: &Value) -> Result<Option<Vec<BucketCount>>, OpenSearchError> {
    let Some(agg) = aggregation(body, DENSITY_AGG) else {
        return Ok(None);
    };
    buckets(agg, DENSITY_AGG)?
        .iter()
        .map(|b| {
            let key = b
                .get("key")
                .and_then(Value::as_i64)
                .ok_or_else(|| OpenSearchError::Parse("histogram bucket without numeric key".into()))?;
            let start = DateTime::from_timestamp_millis(key)
                .ok_or_else(|| OpenSearchError::Parse(format!("bucket key {key} out of range")))?;
            Ok(BucketCount {
                start,
                doc_count: doc_count(b)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// `terms` buckets carry a scalar key for the single field; `composite`
/// buckets carry an object keyed by field name.
pub fn parse_entities(body: &Value, fields: &[String]) -> Result<Option<Vec<EntityBucket>>, OpenSearchError> {
    let Some(agg) = aggregation(body, ENTITY_AGG) else {
        return Ok(None);
    };
    buckets(agg, ENTITY_AGG)?
        .iter()
        .map(|b| {
            let raw_key = b.get("key").unwrap_or(&Value::Null);
            let key = match raw_key {
                Value::Object(map) => fields
                    .iter()
                    .map(|f| (f.clone(), map.get(f).and_then(key_to_string)))
                    .collect(),
                scalar => match fields {
                    [field] => [(field.clone(), key_to_string(scalar))].into_iter().collect(),
                    _ => {
                        return Err(OpenSearchError::Parse(
                            "scalar bucket key for a multi-field grouping".into(),
                        ))
                    }
                },
            };
            Ok(EntityBucket {
                key,
                doc_count: doc_count(b)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// `max`/`min` aggregation value in epoch millis; `null` when no document has
/// the field.
pub fn parse_timestamp(body: &Value, name: &str) -> Result<Option<DateTime<Utc>>, OpenSearchError> {
    let Some(agg) = aggregation(body, name) else {
        return Ok(None);
    };
    match agg.get("value") {
        None | Some(Value::Null) => Ok(None),
        Some(v) => {
            let millis = v
                .as_f64()
                .ok_or_else(|| OpenSearchError::Parse(format!("'{name}' value is not a number")))?;
            Ok(DateTime::from_timestamp_millis(millis as i64))
        }
    }
}
