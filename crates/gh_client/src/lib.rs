pub mod client;
pub mod error;
pub mod exec;
pub mod rate_limit;

pub use client::{GithubClient, RestGithubClient};
pub use error::GithubApiError;
pub use exec::{HttpExec, ReqwestExecutor};
pub use rate_limit::{parse_rate_limit, parse_retry_after, RateLimitState, RateLimitUpdate};
