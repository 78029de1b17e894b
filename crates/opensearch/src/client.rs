//! `reqwest` client that serves the validation engine's [`DataSource`].

use std::time::Duration;

use adval_core::OpenSearchConfig;
use adval_validation::{BucketCount, BucketQuery, DataSource, EntityBucket, SourceError, TopValuesQuery};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::dsl::{density_body, timestamp_body, top_entities_body, EARLIEST_AGG, LATEST_AGG};
use crate::error::OpenSearchError;
use crate::parse::{parse_density, parse_entities, parse_timestamp};

pub struct OpenSearchClient {
    http: Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
    timeout_ms: u64,
}

impl OpenSearchClient {
    pub fn new(config: &OpenSearchConfig) -> Result<Self, OpenSearchError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url().trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            timeout_ms: config.request_timeout_ms,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn search_url(&self, indices: &[String]) -> String {
        format!("{}/{}/_search", self.base_url, indices.join(","))
    }

    /// POST a search body and return the raw JSON response.
    pub async fn search(&self, indices: &[String], body: &Value) -> Result<Value, OpenSearchError> {
        let url = self.search_url(indices);
        debug!(url = %url, "OpenSearch request");

        let mut request = self.http.post(&url).json(body);
        if let Some(user) = &self.username {
            request = request.basic_auth(user, self.password.as_deref());
        }

        let response = request.send().await.map_err(|e| self.classify(e))?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OpenSearchError::Status { status, body });
        }
        response.json().await.map_err(|e| self.classify(e))
    }

    fn classify(&self, err: reqwest::Error) -> OpenSearchError {
        if err.is_timeout() {
            OpenSearchError::Timeout(self.timeout_ms)
        } else {
            OpenSearchError::Http(err)
        }
    }

    async fn timestamp(&self, indices: &[String], time_field: &str, latest: bool) -> Result<Option<DateTime<Utc>>, SourceError> {
        let name = if latest { LATEST_AGG } else { EARLIEST_AGG };
        let response = self.search(indices, &timestamp_body(time_field, latest)).await?;
        Ok(parse_timestamp(&response, name)?)
    }
}

#[async_trait]
impl DataSource for OpenSearchClient {
    async fn bucket_counts(&self, query: &BucketQuery) -> Result<Option<Vec<BucketCount>>, SourceError> {
        let response = self.search(&query.indices, &density_body(query)).await?;
        Ok(parse_density(&response)?)
    }

    async fn top_entities(&self, query: &TopValuesQuery) -> Result<Option<Vec<EntityBucket>>, SourceError> {
        let response = self.search(&query.indices, &top_entities_body(query)).await?;
        Ok(parse_entities(&response, &query.fields)?)
    }

    async fn latest_timestamp(&self, indices: &[String], time_field: &str) -> Result<Option<DateTime<Utc>>, SourceError> {
        self.timestamp(indices, time_field, true).await
    }

    async fn earliest_timestamp(&self, indices: &[String], time_field: &str) -> Result<Option<DateTime<Utc>>, SourceError> {
        self.timestamp(indices, time_field, false).await
    }
}
