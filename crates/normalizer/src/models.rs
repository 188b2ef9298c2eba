use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedRepository {
    pub url: String,
    pub name: String,
    pub is_private: bool,
    pub is_archived: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedUser {
    pub github_id: Option<i64>,
    pub github_login: String,
    pub name: String,
}

/// Pull request fields ready for persistence. The author is resolved
/// separately so a record without one can be dropped before any row exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedPullRequest {
    pub repository_id: i64,
    pub number: i64,
    pub title: String,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub additions: Option<i64>,
    pub deletions: Option<i64>,
    pub changed_files: Option<i64>,
    pub commits_count: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedReview {
    pub github_id: i64,
    pub state: ReviewState,
    pub body: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub commit_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
}

impl ReviewState {
    pub const ALL: [ReviewState; 5] = [
        ReviewState::Approved,
        ReviewState::ChangesRequested,
        ReviewState::Commented,
        ReviewState::Dismissed,
        ReviewState::Pending,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewState::Approved => "APPROVED",
            ReviewState::ChangesRequested => "CHANGES_REQUESTED",
            ReviewState::Commented => "COMMENTED",
            ReviewState::Dismissed => "DISMISSED",
            ReviewState::Pending => "PENDING",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.as_str() == input)
    }
}
