//! OpenSearch/Elasticsearch backend for `adval-validation`.
//!
//! Translates the engine's query shapes into `_search` aggregation bodies
//! and parses the responses back.

pub mod client;
pub mod dsl;
pub mod error;
pub mod parse;

pub use client::OpenSearchClient;
pub use error::OpenSearchError;
