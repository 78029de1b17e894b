use adval_validation::SourceError;

/// Errors raised by the OpenSearch client.
#[derive(Debug, thiserror::Error)]
pub enum OpenSearchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenSearch returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected response shape: {0}")]
    Parse(String),

    #[error("Request timed out after {0}ms")]
    Timeout(u64),
}

impl From<OpenSearchError> for SourceError {
    fn from(err: OpenSearchError) -> Self {
        match err {
            OpenSearchError::Timeout(ms) => SourceError::Timeout(ms),
            OpenSearchError::Parse(msg) => SourceError::MalformedResponse(msg),
            other => SourceError::QueryFailed(other.to_string()),
        }
    }
}
