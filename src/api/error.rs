use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;
use tracing::error;

use crate::api::models::ApiResponse;
use crate::riot::RiotError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("riot api is rate limiting requests; try again shortly")]
    RateLimited,

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<RiotError> for ApiError {
    fn from(e: RiotError) -> Self {
        match e {
            RiotError::RateLimited { .. } => ApiError::RateLimited,
            RiotError::NotFound(what) => ApiError::NotFound(format!("not found: {what}")),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl ApiError {
    /// Keep Riot failures distinguishable after they pass through `anyhow`.
    pub fn from_pipeline(e: anyhow::Error) -> Self {
        match e.downcast::<RiotError>() {
            Ok(riot) => riot.into(),
            Err(other) => ApiError::Internal(other),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Internal details stay in the log.
        let message = match self {
            ApiError::Internal(e) => {
                error!(error = ?e, "request failed");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(ApiResponse::<()>::error(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn riot_errors_map_to_http_statuses() {
        let limited: ApiError = RiotError::RateLimited {
            retry_after: Some(Duration::from_secs(1)),
        }
        .into();
        assert_eq!(limited.status_code(), StatusCode::TOO_MANY_REQUESTS);

        let missing: ApiError = RiotError::NotFound("account Faker#KR1".into()).into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let other: ApiError = RiotError::Status {
            status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            body: "down".into(),
        }
        .into();
        assert_eq!(other.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn wrapped_riot_errors_keep_their_status() {
        let wrapped = anyhow::Error::new(RiotError::RateLimited { retry_after: None });
        assert!(matches!(ApiError::from_pipeline(wrapped), ApiError::RateLimited));
        let plain = ApiError::from_pipeline(anyhow::anyhow!("db down"));
        assert!(matches!(plain, ApiError::Internal(_)));
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = ApiError::from(anyhow::anyhow!("password=hunter2"));
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
