use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use http::{header, Request, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

use crate::error::GithubApiError;
use crate::exec::HttpExec;
use crate::rate_limit::{
    parse_rate_limit, parse_retry_after, remaining_is_zero, RateLimitState,
};

/// The three endpoint families the import pipeline consumes, plus the
/// optional single-pull-request detail fetch.
#[async_trait]
pub trait GithubClient: Send + Sync {
    async fn list_org_repos(&self, org: &str, page: u32, per_page: u32) -> Result<Vec<Value>>;

    async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Value>>;

    async fn get_pull_request(&self, owner: &str, repo: &str, number: i64) -> Result<Value>;

    async fn list_pull_request_reviews(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Value>>;
}

pub struct RestGithubClient {
    exec: Arc<dyn HttpExec>,
    base: Url,
    token: String,
    user_agent: String,
    rate_limit: Mutex<RateLimitState>,
}

impl RestGithubClient {
    pub fn new(
        exec: Arc<dyn HttpExec>,
        base_url: &str,
        token: String,
        user_agent: String,
    ) -> Result<Self> {
        Ok(Self {
            exec,
            base: Url::parse(base_url)?,
            token,
            user_agent,
            rate_limit: Mutex::new(RateLimitState::new()),
        })
    }

    pub async fn rate_limit(&self) -> RateLimitState {
        self.rate_limit.lock().await.clone()
    }

    /// One GET with the quota contract applied. On throttling, wait out the
    /// reset window and re-issue the identical request exactly once; a second
    /// consecutive refusal, or a reset that already passed, propagates.
    async fn get_with_retry(&self, url: &Url) -> Result<Value> {
        let err = match self.get_json(url).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        let wait = match err.downcast_ref::<GithubApiError>() {
            Some(GithubApiError::RateLimited {
                reset_at,
                retry_after,
            }) => retry_after.or_else(|| (*reset_at - Utc::now()).to_std().ok()),
            _ => return Err(err),
        };
        let Some(wait) = wait.filter(|w| !w.is_zero()) else {
            // The recorded reset is already in the past; waiting cannot help.
            return Err(err);
        };
        warn!(
            wait_secs = wait.as_secs(),
            url = %url,
            "rate limit exhausted; waiting for quota reset"
        );
        sleep(wait).await;
        self.get_json(url).await
    }

    async fn get_json(&self, url: &Url) -> Result<Value> {
        let endpoint = url.path().trim_start_matches('/').to_string();
        debug!(endpoint = %endpoint, "dispatching GitHub request");
        let request = Request::builder()
            .method("GET")
            .uri(url.as_str())
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .header(header::ACCEPT, "application/vnd.github.v3+json")
            .header(header::USER_AGENT, self.user_agent.clone())
            .body(Vec::new())?;
        let response = self.exec.execute(request).await?;
        let status = response.status();

        if status.is_success() {
            if let Some(update) = parse_rate_limit(response.headers()) {
                self.rate_limit.lock().await.update(update);
            }
            let value: Value = serde_json::from_slice(response.body())?;
            return Ok(value);
        }

        match status {
            StatusCode::FORBIDDEN if remaining_is_zero(response.headers()) => {
                let reset_at = self.rate_limit.lock().await.reset_at;
                let retry_after = parse_retry_after(response.headers());
                Err(GithubApiError::RateLimited {
                    reset_at,
                    retry_after,
                }
                .into())
            }
            StatusCode::NOT_FOUND => Err(GithubApiError::NotFound { endpoint }.into()),
            StatusCode::UNAUTHORIZED => Err(GithubApiError::AuthenticationFailed.into()),
            _ => Err(GithubApiError::Upstream {
                status,
                endpoint,
                body: String::from_utf8_lossy(response.body()).into_owned(),
            }
            .into()),
        }
    }

    async fn get_json_array(&self, url: &Url) -> Result<Vec<Value>> {
        let value = self.get_with_retry(url).await?;
        match value {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            _ => Err(anyhow!("expected array response from {url}")),
        }
    }

    fn join(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    fn with_query(url: &mut Url, params: &[(&str, String)]) {
        let mut query_pairs = url.query_pairs_mut();
        for (key, val) in params {
            query_pairs.append_pair(key, val);
        }
    }
}

#[async_trait]
impl GithubClient for RestGithubClient {
    async fn list_org_repos(&self, org: &str, page: u32, per_page: u32) -> Result<Vec<Value>> {
        let mut url = self.join(&format!("orgs/{org}/repos"))?;
        Self::with_query(
            &mut url,
            &[
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
            ],
        );
        self.get_json_array(&url).await
    }

    async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Value>> {
        let mut url = self.join(&format!("repos/{owner}/{repo}/pulls"))?;
        Self::with_query(
            &mut url,
            &[
                ("state", "all".to_string()),
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
            ],
        );
        self.get_json_array(&url).await
    }

    async fn get_pull_request(&self, owner: &str, repo: &str, number: i64) -> Result<Value> {
        let url = self.join(&format!("repos/{owner}/{repo}/pulls/{number}"))?;
        self.get_with_retry(&url).await
    }

    async fn list_pull_request_reviews(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Value>> {
        let mut url = self.join(&format!("repos/{owner}/{repo}/pulls/{number}/reviews"))?;
        Self::with_query(
            &mut url,
            &[
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
            ],
        );
        self.get_json_array(&url).await
    }
}
