use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RiotError {
    #[error("riot api rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("riot api returned 404 for {0}")]
    NotFound(String),

    #[error("riot api request failed (status={status}): {body}")]
    Status { status: StatusCode, body: String },

    #[error("riot api transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode riot payload from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl RiotError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RiotError::RateLimited { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RiotError::NotFound(_))
    }
}

/// `Retry-After` is whole seconds on Riot's edge.
pub(crate) fn parse_retry_after(raw: Option<&str>) -> Option<Duration> {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
