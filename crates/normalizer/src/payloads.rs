use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RepoPayload {
    pub name: String,
    pub html_url: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub archived: bool,
}

/// User object as embedded in pull-request and review payloads. The remote
/// omits `name` in embedded form, and `id` is treated as optional because the
/// payload is untrusted.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRef {
    pub id: Option<i64>,
    pub login: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullPayload {
    pub number: i64,
    pub title: String,
    pub user: Option<UserRef>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub additions: Option<i64>,
    pub deletions: Option<i64>,
    pub changed_files: Option<i64>,
    #[serde(rename = "commits")]
    pub commits_count: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewPayload {
    pub id: i64,
    pub user: Option<UserRef>,
    pub state: String,
    pub body: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub commit_id: Option<String>,
}
