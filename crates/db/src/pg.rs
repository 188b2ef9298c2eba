use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::time::{sleep, Duration};
use tracing::{instrument, warn};

use crate::errors::{DbError, Result};
use crate::models::{
    PullRequestRow, PullRequestUpsert, RepositoryRow, RepositoryUpsert, ReviewRow, ReviewUpsert,
    UserCreate, UserRow,
};
use crate::stores::{PullRequestStore, RepositoryStore, ReviewStore, Stores, UserStore};

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(DbError::Migration)
}

#[derive(Clone)]
pub struct PgDatabase {
    pool: PgPool,
    repository_store: Arc<PgRepositoryStore>,
    user_store: Arc<PgUserStore>,
    pull_request_store: Arc<PgPullRequestStore>,
    review_store: Arc<PgReviewStore>,
}

impl PgDatabase {
    pub async fn connect(database_url: &str) -> Result<Self> {
        const MAX_ATTEMPTS: u32 = 5;
        const BASE_DELAY_MS: u64 = 500;

        let mut attempts = 0;
        loop {
            match PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
            {
                Ok(pool) => {
                    run_migrations(&pool).await?;
                    return Ok(Self::from_pool(pool));
                }
                Err(err) => {
                    attempts += 1;
                    if attempts >= MAX_ATTEMPTS {
                        return Err(DbError::Query(err));
                    }

                    let exp = (attempts - 1).min(5);
                    let backoff = Duration::from_millis(BASE_DELAY_MS * (1u64 << exp));
                    warn!(
                        attempts,
                        error = %err,
                        wait_ms = backoff.as_millis(),
                        "database connection failed; retrying"
                    );
                    sleep(backoff).await;
                }
            }
        }
    }

    pub fn from_pool(pool: PgPool) -> Self {
        let repository_store = Arc::new(PgRepositoryStore { pool: pool.clone() });
        let user_store = Arc::new(PgUserStore { pool: pool.clone() });
        let pull_request_store = Arc::new(PgPullRequestStore { pool: pool.clone() });
        let review_store = Arc::new(PgReviewStore { pool: pool.clone() });

        Self {
            pool,
            repository_store,
            user_store,
            pull_request_store,
            review_store,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Stores for PgDatabase {
    fn repositories(&self) -> &dyn RepositoryStore {
        &*self.repository_store
    }

    fn users(&self) -> &dyn UserStore {
        &*self.user_store
    }

    fn pull_requests(&self) -> &dyn PullRequestStore {
        &*self.pull_request_store
    }

    fn reviews(&self) -> &dyn ReviewStore {
        &*self.review_store
    }
}

const REPOSITORY_COLUMNS: &str = "id, url, name, is_private, is_archived, created_at, updated_at";
const USER_COLUMNS: &str = "id, github_login, github_id, name, created_at";
const PULL_REQUEST_COLUMNS: &str = "id, repository_id, number, title, closed_at, merged_at, \
     additions, deletions, changed_files, commits_count, author_id, created_at, updated_at";
const REVIEW_COLUMNS: &str = "id, github_id, pull_request_id, user_id, state, body, \
     submitted_at, commit_id, created_at, updated_at";

#[derive(Clone)]
struct PgRepositoryStore {
    pool: PgPool,
}

#[async_trait]
impl RepositoryStore for PgRepositoryStore {
    #[instrument(skip(self, repo), fields(url = %repo.url))]
    async fn upsert(&self, repo: RepositoryUpsert) -> Result<RepositoryRow> {
        sqlx::query_as::<_, RepositoryRow>(&format!(
            r#"
            INSERT INTO repositories (url, name, is_private, is_archived)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (url) DO UPDATE
                SET name = EXCLUDED.name,
                    is_private = EXCLUDED.is_private,
                    is_archived = EXCLUDED.is_archived,
                    updated_at = now()
            RETURNING {REPOSITORY_COLUMNS}
            "#
        ))
        .bind(repo.url)
        .bind(repo.name)
        .bind(repo.is_private)
        .bind(repo.is_archived)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::Query)
    }

    async fn get_by_url(&self, url: &str) -> Result<Option<RepositoryRow>> {
        sqlx::query_as::<_, RepositoryRow>(&format!(
            "SELECT {REPOSITORY_COLUMNS} FROM repositories WHERE url = $1"
        ))
        .bind(url)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Query)
    }

    async fn list(&self) -> Result<Vec<RepositoryRow>> {
        sqlx::query_as::<_, RepositoryRow>(&format!(
            "SELECT {REPOSITORY_COLUMNS} FROM repositories ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::Query)
    }
}

#[derive(Clone)]
struct PgUserStore {
    pool: PgPool,
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn get_by_github_id(&self, github_id: i64) -> Result<Option<UserRow>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE github_id = $1"
        ))
        .bind(github_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Query)
    }

    async fn get_by_login(&self, login: &str) -> Result<Option<UserRow>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE github_login = $1"
        ))
        .bind(login)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Query)
    }

    #[instrument(skip(self, user), fields(login = %user.github_login))]
    async fn create(&self, user: UserCreate) -> Result<UserRow> {
        sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (github_login, github_id, name)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.github_login)
        .bind(user.github_id)
        .bind(user.name)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::Query)
    }

    async fn assign_github_id(&self, id: i64, github_id: i64) -> Result<UserRow> {
        sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET github_id = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(github_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Query)?
        .ok_or(DbError::NotFound)
    }

    async fn update_profile(&self, id: i64, login: &str, name: &str) -> Result<UserRow> {
        sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET github_login = $2, name = $3 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(login)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Query)?
        .ok_or(DbError::NotFound)
    }
}

#[derive(Clone)]
struct PgPullRequestStore {
    pool: PgPool,
}

#[async_trait]
impl PullRequestStore for PgPullRequestStore {
    #[instrument(skip(self, pull), fields(repository_id = pull.repository_id, number = pull.number))]
    async fn upsert(&self, pull: PullRequestUpsert) -> Result<PullRequestRow> {
        sqlx::query_as::<_, PullRequestRow>(&format!(
            r#"
            INSERT INTO pull_requests
                (repository_id, number, title, closed_at, merged_at,
                 additions, deletions, changed_files, commits_count, author_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (repository_id, number) DO UPDATE
                SET title = EXCLUDED.title,
                    closed_at = EXCLUDED.closed_at,
                    merged_at = EXCLUDED.merged_at,
                    additions = EXCLUDED.additions,
                    deletions = EXCLUDED.deletions,
                    changed_files = EXCLUDED.changed_files,
                    commits_count = EXCLUDED.commits_count,
                    author_id = EXCLUDED.author_id,
                    updated_at = now()
            RETURNING {PULL_REQUEST_COLUMNS}
            "#
        ))
        .bind(pull.repository_id)
        .bind(pull.number)
        .bind(pull.title)
        .bind(pull.closed_at)
        .bind(pull.merged_at)
        .bind(pull.additions)
        .bind(pull.deletions)
        .bind(pull.changed_files)
        .bind(pull.commits_count)
        .bind(pull.author_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::Query)
    }

    async fn list_by_repository(&self, repository_id: i64) -> Result<Vec<PullRequestRow>> {
        sqlx::query_as::<_, PullRequestRow>(&format!(
            "SELECT {PULL_REQUEST_COLUMNS} FROM pull_requests WHERE repository_id = $1 ORDER BY number"
        ))
        .bind(repository_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::Query)
    }
}

#[derive(Clone)]
struct PgReviewStore {
    pool: PgPool,
}

#[async_trait]
impl ReviewStore for PgReviewStore {
    #[instrument(skip(self, review), fields(github_id = review.github_id))]
    async fn upsert(&self, review: ReviewUpsert) -> Result<ReviewRow> {
        sqlx::query_as::<_, ReviewRow>(&format!(
            r#"
            INSERT INTO reviews
                (github_id, pull_request_id, user_id, state, body, submitted_at, commit_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (github_id) DO UPDATE
                SET pull_request_id = EXCLUDED.pull_request_id,
                    user_id = EXCLUDED.user_id,
                    state = EXCLUDED.state,
                    body = EXCLUDED.body,
                    submitted_at = EXCLUDED.submitted_at,
                    commit_id = EXCLUDED.commit_id,
                    updated_at = now()
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(review.github_id)
        .bind(review.pull_request_id)
        .bind(review.user_id)
        .bind(review.state)
        .bind(review.body)
        .bind(review.submitted_at)
        .bind(review.commit_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::Query)
    }

    async fn list_by_pull_request(&self, pull_request_id: i64) -> Result<Vec<ReviewRow>> {
        sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE pull_request_id = $1 ORDER BY submitted_at"
        ))
        .bind(pull_request_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::Query)
    }
}
