use chrono::{DateTime, Utc};
use http::StatusCode;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GithubApiError {
    /// Quota exhausted. Carries the reset timestamp recorded from the last
    /// successful response, plus any `Retry-After` hint the refusal carried.
    #[error("rate limit exhausted; quota resets at {reset_at}")]
    RateLimited {
        reset_at: DateTime<Utc>,
        retry_after: Option<Duration>,
    },
    #[error("resource not found: {endpoint}")]
    NotFound { endpoint: String },
    #[error("authentication failed; check the configured GitHub token")]
    AuthenticationFailed,
    #[error("github api error: {status} for {endpoint}: {body}")]
    Upstream {
        status: StatusCode,
        endpoint: String,
        body: String,
    },
}

impl GithubApiError {
    /// Errors that must terminate the whole run rather than be absorbed at
    /// the record or repository level. A `RateLimited` error that escapes the
    /// client has already exhausted its single wait-and-retry.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GithubApiError::AuthenticationFailed | GithubApiError::RateLimited { .. }
        )
    }
}
