use crate::models::{
    NormalizedPullRequest, NormalizedRepository, NormalizedReview, NormalizedUser, ReviewState,
};
use crate::payloads::{PullPayload, RepoPayload, ReviewPayload, UserRef};

/// Per-record rejection. Callers log these and move on to the next record;
/// they never abort a page or a pass.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("pull request #{number}: {field} must be a non-negative integer, got {value}")]
    NegativeStat {
        number: i64,
        field: &'static str,
        value: i64,
    },
    #[error("review {github_id}: unknown state {state:?}")]
    UnknownReviewState { github_id: i64, state: String },
    #[error("review {github_id}: submitted_at is required")]
    MissingSubmittedAt { github_id: i64 },
}

pub fn normalize_repo(payload: &RepoPayload) -> NormalizedRepository {
    NormalizedRepository {
        url: payload.html_url.clone(),
        name: payload.name.clone(),
        is_private: payload.private,
        is_archived: payload.archived,
    }
}

pub fn normalize_user(payload: &UserRef) -> NormalizedUser {
    NormalizedUser {
        github_id: payload.id,
        github_login: payload.login.clone(),
        name: payload
            .name
            .clone()
            .unwrap_or_else(|| payload.login.clone()),
    }
}

pub fn normalize_pull(
    payload: &PullPayload,
    repository_id: i64,
) -> Result<NormalizedPullRequest, ValidationError> {
    let stats = [
        ("additions", payload.additions),
        ("deletions", payload.deletions),
        ("changed_files", payload.changed_files),
        ("commits_count", payload.commits_count),
    ];
    for (field, stat) in stats {
        if let Some(value) = stat {
            if value < 0 {
                return Err(ValidationError::NegativeStat {
                    number: payload.number,
                    field,
                    value,
                });
            }
        }
    }

    Ok(NormalizedPullRequest {
        repository_id,
        number: payload.number,
        title: payload.title.clone(),
        closed_at: payload.closed_at,
        merged_at: payload.merged_at,
        additions: payload.additions,
        deletions: payload.deletions,
        changed_files: payload.changed_files,
        commits_count: payload.commits_count,
    })
}

pub fn normalize_review(payload: &ReviewPayload) -> Result<NormalizedReview, ValidationError> {
    let state = ReviewState::parse(&payload.state).ok_or_else(|| {
        ValidationError::UnknownReviewState {
            github_id: payload.id,
            state: payload.state.clone(),
        }
    })?;
    let submitted_at = payload
        .submitted_at
        .ok_or(ValidationError::MissingSubmittedAt {
            github_id: payload.id,
        })?;

    Ok(NormalizedReview {
        github_id: payload.id,
        state,
        body: payload.body.clone(),
        submitted_at,
        commit_id: payload.commit_id.clone(),
    })
}
