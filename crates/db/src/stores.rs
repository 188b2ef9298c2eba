use async_trait::async_trait;

use crate::errors::Result;
use crate::models::{
    PullRequestRow, PullRequestUpsert, RepositoryRow, RepositoryUpsert, ReviewRow, ReviewUpsert,
    UserCreate, UserRow,
};

#[async_trait]
pub trait RepositoryStore: Send + Sync {
    async fn upsert(&self, repo: RepositoryUpsert) -> Result<RepositoryRow>;
    async fn get_by_url(&self, url: &str) -> Result<Option<RepositoryRow>>;
    async fn list(&self) -> Result<Vec<RepositoryRow>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_github_id(&self, github_id: i64) -> Result<Option<UserRow>>;
    async fn get_by_login(&self, login: &str) -> Result<Option<UserRow>>;
    async fn create(&self, user: UserCreate) -> Result<UserRow>;
    /// Attach a numeric id to a row first seen through the login-only path.
    async fn assign_github_id(&self, id: i64, github_id: i64) -> Result<UserRow>;
    /// Login and display name are mutable attributes of the stable id.
    async fn update_profile(&self, id: i64, login: &str, name: &str) -> Result<UserRow>;
}

#[async_trait]
pub trait PullRequestStore: Send + Sync {
    async fn upsert(&self, pull: PullRequestUpsert) -> Result<PullRequestRow>;
    async fn list_by_repository(&self, repository_id: i64) -> Result<Vec<PullRequestRow>>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn upsert(&self, review: ReviewUpsert) -> Result<ReviewRow>;
    async fn list_by_pull_request(&self, pull_request_id: i64) -> Result<Vec<ReviewRow>>;
}

pub trait Stores: Send + Sync {
    fn repositories(&self) -> &dyn RepositoryStore;
    fn users(&self) -> &dyn UserStore;
    fn pull_requests(&self) -> &dyn PullRequestStore;
    fn reviews(&self) -> &dyn ReviewStore;
}
