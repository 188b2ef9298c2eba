use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use common::config::ImporterConfig;
use db::errors::Result as DbResult;
use db::models::{
    PullRequestRow, PullRequestUpsert, RepositoryRow, RepositoryUpsert, ReviewRow, ReviewUpsert,
    UserCreate, UserRow,
};
use db::stores::{PullRequestStore, RepositoryStore, ReviewStore, Stores, UserStore};
use db::DbError;
use gh_client::{GithubApiError, GithubClient};
use serde_json::{json, Value};

pub fn test_config(org: &str) -> ImporterConfig {
    ImporterConfig {
        org: org.into(),
        default_owner: "acme".into(),
        page_size: 100,
        fetch_details: false,
        interval_secs: 0,
        run_once: true,
    }
}

pub fn repo_json(name: &str) -> Value {
    json!({
        "name": name,
        "html_url": format!("https://example.com/acme/{name}"),
        "private": false,
        "archived": false,
    })
}

pub fn pull_json(number: i64, author: Option<(i64, &str)>) -> Value {
    let user = match author {
        Some((id, login)) => json!({"id": id, "login": login}),
        None => Value::Null,
    };
    json!({
        "number": number,
        "title": format!("PR #{number}"),
        "user": user,
        "closed_at": null,
        "merged_at": null,
    })
}

pub fn review_json(id: i64, state: &str, reviewer: (i64, &str)) -> Value {
    json!({
        "id": id,
        "user": {"id": reviewer.0, "login": reviewer.1},
        "state": state,
        "body": "looked at it",
        "submitted_at": "2024-05-01T12:00:00Z",
        "commit_id": "deadbeef",
    })
}

/// Scripted remote: serves fixed record sets page by page the way the real
/// API does, and records every list call for pagination assertions.
#[derive(Default)]
pub struct ScriptedClient {
    repos: Vec<Value>,
    pulls: HashMap<String, Vec<Value>>,
    details: HashMap<(String, i64), Value>,
    reviews: HashMap<(String, i64), Vec<Value>>,
    review_404s: HashSet<(String, i64)>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repos(mut self, repos: Vec<Value>) -> Self {
        self.repos = repos;
        self
    }

    pub fn with_pulls(mut self, repo: &str, pulls: Vec<Value>) -> Self {
        self.pulls.insert(repo.into(), pulls);
        self
    }

    pub fn with_detail(mut self, repo: &str, number: i64, detail: Value) -> Self {
        self.details.insert((repo.into(), number), detail);
        self
    }

    pub fn with_reviews(mut self, repo: &str, number: i64, reviews: Vec<Value>) -> Self {
        self.reviews.insert((repo.into(), number), reviews);
        self
    }

    pub fn with_review_404(mut self, repo: &str, number: i64) -> Self {
        self.review_404s.insert((repo.into(), number));
        self
    }

    pub fn calls_matching(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn page_of(items: &[Value], page: u32, per_page: u32) -> Vec<Value> {
        let start = ((page - 1) * per_page) as usize;
        items
            .iter()
            .skip(start)
            .take(per_page as usize)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl GithubClient for ScriptedClient {
    async fn list_org_repos(&self, org: &str, page: u32, per_page: u32) -> Result<Vec<Value>> {
        self.record(format!("repos:{org}:page={page}"));
        Ok(Self::page_of(&self.repos, page, per_page))
    }

    async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Value>> {
        self.record(format!("pulls:{owner}/{repo}:page={page}"));
        let items = self
            .pulls
            .get(&format!("{owner}/{repo}"))
            .cloned()
            .unwrap_or_default();
        Ok(Self::page_of(&items, page, per_page))
    }

    async fn get_pull_request(&self, owner: &str, repo: &str, number: i64) -> Result<Value> {
        self.record(format!("pull:{owner}/{repo}:{number}"));
        self.details
            .get(&(format!("{owner}/{repo}"), number))
            .cloned()
            .ok_or_else(|| {
                GithubApiError::NotFound {
                    endpoint: format!("repos/{owner}/{repo}/pulls/{number}"),
                }
                .into()
            })
    }

    async fn list_pull_request_reviews(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Value>> {
        self.record(format!("reviews:{owner}/{repo}:{number}:page={page}"));
        let key = (format!("{owner}/{repo}"), number);
        if self.review_404s.contains(&key) {
            return Err(GithubApiError::NotFound {
                endpoint: format!("repos/{owner}/{repo}/pulls/{number}/reviews"),
            }
            .into());
        }
        let items = self.reviews.get(&key).cloned().unwrap_or_default();
        Ok(Self::page_of(&items, page, per_page))
    }
}

/// In-memory `Stores` with the same natural-key upsert semantics as the
/// Postgres implementation.
#[derive(Default)]
pub struct MemStores {
    inner: Mutex<Data>,
}

#[derive(Default)]
struct Data {
    repositories: Vec<RepositoryRow>,
    users: Vec<UserRow>,
    pull_requests: Vec<PullRequestRow>,
    reviews: Vec<ReviewRow>,
    last_id: i64,
}

impl Data {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

impl MemStores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repository_count(&self) -> usize {
        self.inner.lock().unwrap().repositories.len()
    }

    pub fn user_count(&self) -> usize {
        self.inner.lock().unwrap().users.len()
    }

    pub fn pull_request_count(&self) -> usize {
        self.inner.lock().unwrap().pull_requests.len()
    }

    pub fn review_count(&self) -> usize {
        self.inner.lock().unwrap().reviews.len()
    }

    pub fn repositories_snapshot(&self) -> Vec<RepositoryRow> {
        self.inner.lock().unwrap().repositories.clone()
    }

    pub fn users_snapshot(&self) -> Vec<UserRow> {
        self.inner.lock().unwrap().users.clone()
    }

    pub fn pull_requests_snapshot(&self) -> Vec<PullRequestRow> {
        self.inner.lock().unwrap().pull_requests.clone()
    }

    pub fn reviews_snapshot(&self) -> Vec<ReviewRow> {
        self.inner.lock().unwrap().reviews.clone()
    }
}

impl Stores for MemStores {
    fn repositories(&self) -> &dyn RepositoryStore {
        self
    }

    fn users(&self) -> &dyn UserStore {
        self
    }

    fn pull_requests(&self) -> &dyn PullRequestStore {
        self
    }

    fn reviews(&self) -> &dyn ReviewStore {
        self
    }
}

#[async_trait]
impl RepositoryStore for MemStores {
    async fn upsert(&self, repo: RepositoryUpsert) -> DbResult<RepositoryRow> {
        let mut data = self.inner.lock().unwrap();
        if let Some(existing) = data.repositories.iter_mut().find(|r| r.url == repo.url) {
            existing.name = repo.name;
            existing.is_private = repo.is_private;
            existing.is_archived = repo.is_archived;
            existing.updated_at = Utc::now();
            return Ok(existing.clone());
        }
        let id = data.next_id();
        let row = RepositoryRow {
            id,
            url: repo.url,
            name: repo.name,
            is_private: repo.is_private,
            is_archived: repo.is_archived,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        data.repositories.push(row.clone());
        Ok(row)
    }

    async fn get_by_url(&self, url: &str) -> DbResult<Option<RepositoryRow>> {
        let data = self.inner.lock().unwrap();
        Ok(data.repositories.iter().find(|r| r.url == url).cloned())
    }

    async fn list(&self) -> DbResult<Vec<RepositoryRow>> {
        Ok(self.inner.lock().unwrap().repositories.clone())
    }
}

#[async_trait]
impl UserStore for MemStores {
    async fn get_by_github_id(&self, github_id: i64) -> DbResult<Option<UserRow>> {
        let data = self.inner.lock().unwrap();
        Ok(data
            .users
            .iter()
            .find(|u| u.github_id == Some(github_id))
            .cloned())
    }

    async fn get_by_login(&self, login: &str) -> DbResult<Option<UserRow>> {
        let data = self.inner.lock().unwrap();
        Ok(data.users.iter().find(|u| u.github_login == login).cloned())
    }

    async fn create(&self, user: UserCreate) -> DbResult<UserRow> {
        let mut data = self.inner.lock().unwrap();
        let id = data.next_id();
        let row = UserRow {
            id,
            github_login: user.github_login,
            github_id: user.github_id,
            name: user.name,
            created_at: Utc::now(),
        };
        data.users.push(row.clone());
        Ok(row)
    }

    async fn assign_github_id(&self, id: i64, github_id: i64) -> DbResult<UserRow> {
        let mut data = self.inner.lock().unwrap();
        let user = data
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(DbError::NotFound)?;
        user.github_id = Some(github_id);
        Ok(user.clone())
    }

    async fn update_profile(&self, id: i64, login: &str, name: &str) -> DbResult<UserRow> {
        let mut data = self.inner.lock().unwrap();
        let user = data
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(DbError::NotFound)?;
        user.github_login = login.into();
        user.name = name.into();
        Ok(user.clone())
    }
}

#[async_trait]
impl PullRequestStore for MemStores {
    async fn upsert(&self, pull: PullRequestUpsert) -> DbResult<PullRequestRow> {
        let mut data = self.inner.lock().unwrap();
        if let Some(existing) = data
            .pull_requests
            .iter_mut()
            .find(|p| p.repository_id == pull.repository_id && p.number == pull.number)
        {
            existing.title = pull.title;
            existing.closed_at = pull.closed_at;
            existing.merged_at = pull.merged_at;
            existing.additions = pull.additions;
            existing.deletions = pull.deletions;
            existing.changed_files = pull.changed_files;
            existing.commits_count = pull.commits_count;
            existing.author_id = pull.author_id;
            existing.updated_at = Utc::now();
            return Ok(existing.clone());
        }
        let id = data.next_id();
        let row = PullRequestRow {
            id,
            repository_id: pull.repository_id,
            number: pull.number,
            title: pull.title,
            closed_at: pull.closed_at,
            merged_at: pull.merged_at,
            additions: pull.additions,
            deletions: pull.deletions,
            changed_files: pull.changed_files,
            commits_count: pull.commits_count,
            author_id: pull.author_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        data.pull_requests.push(row.clone());
        Ok(row)
    }

    async fn list_by_repository(&self, repository_id: i64) -> DbResult<Vec<PullRequestRow>> {
        let data = self.inner.lock().unwrap();
        Ok(data
            .pull_requests
            .iter()
            .filter(|p| p.repository_id == repository_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ReviewStore for MemStores {
    async fn upsert(&self, review: ReviewUpsert) -> DbResult<ReviewRow> {
        let mut data = self.inner.lock().unwrap();
        if let Some(existing) = data
            .reviews
            .iter_mut()
            .find(|r| r.github_id == review.github_id)
        {
            existing.pull_request_id = review.pull_request_id;
            existing.user_id = review.user_id;
            existing.state = review.state;
            existing.body = review.body;
            existing.submitted_at = review.submitted_at;
            existing.commit_id = review.commit_id;
            existing.updated_at = Utc::now();
            return Ok(existing.clone());
        }
        let id = data.next_id();
        let row = ReviewRow {
            id,
            github_id: review.github_id,
            pull_request_id: review.pull_request_id,
            user_id: review.user_id,
            state: review.state,
            body: review.body,
            submitted_at: review.submitted_at,
            commit_id: review.commit_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        data.reviews.push(row.clone());
        Ok(row)
    }

    async fn list_by_pull_request(&self, pull_request_id: i64) -> DbResult<Vec<ReviewRow>> {
        let data = self.inner.lock().unwrap();
        Ok(data
            .reviews
            .iter()
            .filter(|r| r.pull_request_id == pull_request_id)
            .cloned()
            .collect())
    }
}
