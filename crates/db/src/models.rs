use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RepositoryRow {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub is_private: bool,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub github_login: String,
    pub github_id: Option<i64>,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PullRequestRow {
    pub id: i64,
    pub repository_id: i64,
    pub number: i64,
    pub title: String,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub additions: Option<i64>,
    pub deletions: Option<i64>,
    pub changed_files: Option<i64>,
    pub commits_count: Option<i64>,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReviewRow {
    pub id: i64,
    pub github_id: i64,
    pub pull_request_id: i64,
    pub user_id: i64,
    pub state: String,
    pub body: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub commit_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Keyed by `url`; mutable fields are overwritten on every sight.
#[derive(Debug, Clone)]
pub struct RepositoryUpsert {
    pub url: String,
    pub name: String,
    pub is_private: bool,
    pub is_archived: bool,
}

#[derive(Debug, Clone)]
pub struct UserCreate {
    pub github_login: String,
    pub github_id: Option<i64>,
    pub name: String,
}

/// Keyed by `(repository_id, number)`.
#[derive(Debug, Clone)]
pub struct PullRequestUpsert {
    pub repository_id: i64,
    pub number: i64,
    pub title: String,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub additions: Option<i64>,
    pub deletions: Option<i64>,
    pub changed_files: Option<i64>,
    pub commits_count: Option<i64>,
    pub author_id: i64,
}

/// Keyed by `github_id`.
#[derive(Debug, Clone)]
pub struct ReviewUpsert {
    pub github_id: i64,
    pub pull_request_id: i64,
    pub user_id: i64,
    pub state: String,
    pub body: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub commit_id: Option<String>,
}
