use std::sync::Arc;

use anyhow::Result;
use db::models::{PullRequestUpsert, RepositoryUpsert, ReviewUpsert, UserCreate};
use db::{PullRequestRow, RepositoryRow, ReviewRow, Stores, UserRow};
use normalizer::payloads::{PullPayload, RepoPayload, ReviewPayload, UserRef};
use normalizer::{normalize_pull, normalize_repo, normalize_review, normalize_user};
use serde_json::Value;
use tracing::warn;

/// Maps one untrusted remote record onto one local row. All upserts are
/// keyed by natural keys and overwrite mutable fields, so re-importing the
/// same data is a no-op on row counts.
pub struct Reconciler {
    stores: Arc<dyn Stores>,
}

impl Reconciler {
    pub fn new(stores: Arc<dyn Stores>) -> Self {
        Self { stores }
    }

    pub async fn reconcile_repository(&self, record: &Value) -> Result<RepositoryRow> {
        let payload: RepoPayload = serde_json::from_value(record.clone())?;
        let normalized = normalize_repo(&payload);
        let row = self
            .stores
            .repositories()
            .upsert(RepositoryUpsert {
                url: normalized.url,
                name: normalized.name,
                is_private: normalized.is_private,
                is_archived: normalized.is_archived,
            })
            .await?;
        Ok(row)
    }

    /// `Ok(None)` means the record was dropped: a pull request with no
    /// resolvable author is never persisted and never counted.
    pub async fn reconcile_pull_request(
        &self,
        record: &Value,
        repository_id: i64,
    ) -> Result<Option<PullRequestRow>> {
        let payload: PullPayload = serde_json::from_value(record.clone())?;
        let Some(author_ref) = &payload.user else {
            warn!(
                number = payload.number,
                "pull request carries no author; dropping"
            );
            return Ok(None);
        };
        let author = self.resolve_user(author_ref).await?;
        let normalized = normalize_pull(&payload, repository_id)?;
        let row = self
            .stores
            .pull_requests()
            .upsert(PullRequestUpsert {
                repository_id: normalized.repository_id,
                number: normalized.number,
                title: normalized.title,
                closed_at: normalized.closed_at,
                merged_at: normalized.merged_at,
                additions: normalized.additions,
                deletions: normalized.deletions,
                changed_files: normalized.changed_files,
                commits_count: normalized.commits_count,
                author_id: author.id,
            })
            .await?;
        Ok(Some(row))
    }

    pub async fn reconcile_review(
        &self,
        record: &Value,
        pull_request_id: i64,
    ) -> Result<Option<ReviewRow>> {
        let payload: ReviewPayload = serde_json::from_value(record.clone())?;
        let Some(reviewer_ref) = &payload.user else {
            warn!(github_id = payload.id, "review carries no user; dropping");
            return Ok(None);
        };
        let reviewer = self.resolve_user(reviewer_ref).await?;
        let normalized = normalize_review(&payload)?;
        let row = self
            .stores
            .reviews()
            .upsert(ReviewUpsert {
                github_id: normalized.github_id,
                pull_request_id,
                user_id: reviewer.id,
                state: normalized.state.as_str().to_string(),
                body: normalized.body,
                submitted_at: normalized.submitted_at,
                commit_id: normalized.commit_id,
            })
            .await?;
        Ok(Some(row))
    }

    /// Unified user reconciliation for both the author and reviewer paths:
    /// the numeric id is the stable identity, login and name are display
    /// attributes refreshed on every sight. Login-keyed lookup is the
    /// fallback when the payload carries no id.
    pub async fn resolve_user(&self, user: &UserRef) -> Result<UserRow> {
        let normalized = normalize_user(user);
        let users = self.stores.users();

        let Some(github_id) = normalized.github_id else {
            if let Some(existing) = users.get_by_login(&normalized.github_login).await? {
                return Ok(existing);
            }
            let row = users
                .create(UserCreate {
                    github_login: normalized.github_login,
                    github_id: None,
                    name: normalized.name,
                })
                .await?;
            return Ok(row);
        };

        if let Some(existing) = users.get_by_github_id(github_id).await? {
            if existing.github_login != normalized.github_login
                || existing.name != normalized.name
            {
                let row = users
                    .update_profile(existing.id, &normalized.github_login, &normalized.name)
                    .await?;
                return Ok(row);
            }
            return Ok(existing);
        }

        if let Some(existing) = users.get_by_login(&normalized.github_login).await? {
            // First seen through a payload without an id; attach it now.
            let row = users.assign_github_id(existing.id, github_id).await?;
            return Ok(row);
        }

        let row = users
            .create(UserCreate {
                github_login: normalized.github_login,
                github_id: Some(github_id),
                name: normalized.name,
            })
            .await?;
        Ok(row)
    }
}
