use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_parse<T: FromStr>(profile: &str, key: &str, default: T) -> T {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub opensearch: OpenSearchConfig,
    pub validation: ValidationSettings,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `ADVAL_PROFILE`. When set (e.g. `PROD`), every key
    /// is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Result<Self, CoreError> {
        let profile = env_or("ADVAL_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Result<Self, CoreError> {
        let p = profile.to_uppercase();
        let p = p.as_str();
        let validation = ValidationSettings::from_env_profiled(p);
        validation.validate()?;
        Ok(Self {
            profile: p.to_string(),
            opensearch: OpenSearchConfig::from_env_profiled(p),
            validation,
        })
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        let v = &self.validation;
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  opensearch:  url={}, auth={}, timeout_ms={}",
            self.opensearch.base_url(),
            self.opensearch.username.is_some(),
            self.opensearch.request_timeout_ms
        );
        tracing::info!(
            "  validation:  interval_rate={}, config_rate={}, ceiling={}m, shrink_budget={}, timeout_ms={}",
            v.interval_success_rate,
            v.config_success_rate,
            v.max_interval_minutes,
            v.max_shrink_attempts,
            v.timeout_ms
        );
    }
}

// ── OpenSearch / Elasticsearch ────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenSearchConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub use_ssl: bool,
    pub request_timeout_ms: u64,
}

impl OpenSearchConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "OPENSEARCH_HOST", "localhost"),
            port: profiled_env_parse(p, "OPENSEARCH_PORT", 9200),
            username: profiled_env_opt(p, "OPENSEARCH_USERNAME"),
            password: profiled_env_opt(p, "OPENSEARCH_PASSWORD"),
            use_ssl: profiled_env_or(p, "OPENSEARCH_USE_SSL", "false") == "true",
            request_timeout_ms: profiled_env_parse(p, "OPENSEARCH_TIMEOUT_MS", 10_000),
        }
    }

    pub fn base_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

// ── Validation tunables ───────────────────────────────────────

/// Thresholds and search bounds for model validation.
///
/// Passed explicitly into the engine; nothing in the engine reads ambient
/// settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    /// Full-bucket rate an interval must exceed to be recommended.
    pub interval_success_rate: f64,
    /// Lower rate each root-cause stage must reach.
    pub config_success_rate: f64,
    /// Applied while growing the candidate interval (> 1).
    pub growth_multiplier: f64,
    /// Applied while shrinking the candidate interval (< 1).
    pub shrink_multiplier: f64,
    /// Growth stops once the next candidate reaches this length.
    pub max_interval_minutes: u64,
    /// Shrink rounds allowed after growth gives up.
    pub max_shrink_attempts: u32,
    /// Wall-clock budget for the interval search.
    pub timeout_ms: u64,
    pub training_window_hours: u64,
    pub min_samples: u64,
    /// Cap for the history suggestion, in intervals.
    pub max_history_intervals: u64,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            interval_success_rate: 0.75,
            config_success_rate: 0.25,
            growth_multiplier: 1.2,
            shrink_multiplier: 0.8,
            max_interval_minutes: 60,
            max_shrink_attempts: 10,
            timeout_ms: 10_000,
            training_window_hours: 24,
            min_samples: 512,
            max_history_intervals: 10_000,
        }
    }
}

impl ValidationSettings {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            interval_success_rate: profiled_env_parse(p, "ADVAL_INTERVAL_SUCCESS_RATE", d.interval_success_rate),
            config_success_rate: profiled_env_parse(p, "ADVAL_CONFIG_SUCCESS_RATE", d.config_success_rate),
            growth_multiplier: profiled_env_parse(p, "ADVAL_GROWTH_MULTIPLIER", d.growth_multiplier),
            shrink_multiplier: profiled_env_parse(p, "ADVAL_SHRINK_MULTIPLIER", d.shrink_multiplier),
            max_interval_minutes: profiled_env_parse(p, "ADVAL_MAX_INTERVAL_MINUTES", d.max_interval_minutes),
            max_shrink_attempts: profiled_env_parse(p, "ADVAL_MAX_SHRINK_ATTEMPTS", d.max_shrink_attempts),
            timeout_ms: profiled_env_parse(p, "ADVAL_VALIDATE_TIMEOUT_MS", d.timeout_ms),
            training_window_hours: profiled_env_parse(p, "ADVAL_TRAINING_WINDOW_HOURS", d.training_window_hours),
            min_samples: profiled_env_parse(p, "ADVAL_MIN_SAMPLES", d.min_samples).max(1),
            max_history_intervals: profiled_env_parse(p, "ADVAL_MAX_HISTORY_INTERVALS", d.max_history_intervals),
        }
    }

    /// Reject values that break the interval search: growth must lengthen
    /// and shrinking must shorten the candidate, or the search never reaches
    /// the ceiling or the shrink floor.
    pub fn validate(&self) -> Result<(), CoreError> {
        let invalid = |msg: String| Err(CoreError::InvalidSettings(msg));

        for (name, rate) in [
            ("interval_success_rate", self.interval_success_rate),
            ("config_success_rate", self.config_success_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return invalid(format!("{name} must be within [0, 1], got {rate}"));
            }
        }
        if !self.growth_multiplier.is_finite() || self.growth_multiplier <= 1.0 {
            return invalid(format!("growth_multiplier must be > 1, got {}", self.growth_multiplier));
        }
        if !(self.shrink_multiplier > 0.0 && self.shrink_multiplier < 1.0) {
            return invalid(format!("shrink_multiplier must be within (0, 1), got {}", self.shrink_multiplier));
        }
        if self.max_interval_minutes == 0 {
            return invalid("max_interval_minutes must be at least 1".into());
        }
        Ok(())
    }
}
