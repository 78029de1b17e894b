//! Model validation and parameter suggestion for anomaly-detector configs.
//!
//! This crate provides:
//! - A [`DataSource`] trait abstracting the search backend (bucketed counts,
//!   top category values, latest/earliest timestamps)
//! - Density evaluation (full-bucket rate over a fixed sample window)
//! - Top-entity resolution for categorical (multi-entity) detectors
//! - An adaptive interval search that grows, then shrinks, the candidate interval
//! - A root-cause cascade (raw data → filter → category → features) for sparse data
//! - Window-delay advice based on the latest ingested data point
//! - [`ModelValidator`], the entry point for `validate` and `suggest`
//!
//! The crate has no HTTP dependency; `adval-opensearch` supplies the real
//! [`DataSource`] implementation.

pub mod cascade;
pub mod clock;
pub mod density;
pub mod entity;
pub mod interval;
pub mod outcome;
pub mod source;
pub mod suggest;
pub mod validator;
pub mod window_delay;

mod probe;

#[cfg(test)]
pub(crate) mod testing;

pub use clock::{Clock, SystemClock};
pub use entity::TopEntity;
pub use outcome::*;
pub use source::*;
pub use suggest::{ParameterSuggestions, SuggestError, SuggestName};
pub use validator::{ModelValidator, ValidationReport, ValidationType};
