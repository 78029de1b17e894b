use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::period::{Period, TimeConfig};

/// A candidate anomaly-detector definition, as submitted for validation.
///
/// Only the fields the validation engine reads are modelled; anything else
/// in the source document is ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectorConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub time_field: String,
    pub indices: Vec<String>,
    #[serde(default)]
    pub filter_query: Option<serde_json::Value>,
    #[serde(default)]
    pub feature_attributes: Vec<FeatureAttribute>,
    #[serde(default, alias = "category_fields")]
    pub category_field: Vec<String>,
    #[serde(default)]
    pub detection_interval: Option<TimeConfig>,
    #[serde(default)]
    pub window_delay: Option<TimeConfig>,
}

/// One feature definition. The aggregation query is kept opaque; only the
/// fields it reads are extracted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureAttribute {
    pub feature_name: String,
    #[serde(default = "default_enabled")]
    pub feature_enabled: bool,
    pub aggregation_query: serde_json::Value,
}

fn default_enabled() -> bool {
    true
}

impl DetectorConfig {
    /// Parse a detector from YAML or JSON (JSON is valid YAML).
    pub fn from_yaml_str(raw: &str) -> Result<Self, CoreError> {
        let detector: DetectorConfig = serde_yaml::from_str(raw)?;
        detector.check()?;
        Ok(detector)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CoreError> {
        let detector: DetectorConfig = serde_json::from_str(raw)?;
        detector.check()?;
        Ok(detector)
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&raw),
            _ => Self::from_yaml_str(&raw),
        }
    }

    fn check(&self) -> Result<(), CoreError> {
        if self.time_field.trim().is_empty() {
            return Err(CoreError::InvalidDetector("time_field must not be empty".into()));
        }
        if self.indices.is_empty() {
            return Err(CoreError::InvalidDetector("at least one index is required".into()));
        }
        Ok(())
    }

    pub fn is_multi_entity(&self) -> bool {
        !self.category_field.is_empty()
    }

    pub fn interval(&self) -> Option<Period> {
        self.detection_interval.map(|t| t.period)
    }

    pub fn window_delay_period(&self) -> Option<Period> {
        self.window_delay.map(|t| t.period)
    }

    /// Field names read by enabled features, in declaration order, deduplicated.
    pub fn feature_fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        for feature in self.feature_attributes.iter().filter(|f| f.feature_enabled) {
            collect_fields(&feature.aggregation_query, &mut fields);
        }
        fields
    }
}

// Walks an aggregation body and collects every string under a "field" key.
fn collect_fields(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, v) in map {
                match (key.as_str(), v) {
                    ("field", serde_json::Value::String(name)) => {
                        if !out.contains(name) {
                            out.push(name.clone());
                        }
                    }
                    _ => collect_fields(v, out),
                }
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_fields(item, out);
            }
        }
        _ => {}
    }
}
