use std::env;

use anyhow::{Context, Result};
use db::pg::run_migrations;
use sqlx::{Executor, PgPool};
use url::Url;
use uuid::Uuid;

/// One throwaway database per test, created through an admin connection, so
/// integration suites run in parallel without sharing state. Tests that find
/// no connection URL in the environment skip themselves.
pub struct DbFixture {
    admin_url: Url,
}

impl DbFixture {
    pub fn from_env() -> Result<Self> {
        let raw = env::var("TEST_ADMIN_URL")
            .or_else(|_| env::var("DATABASE_URL"))
            .context("TEST_ADMIN_URL or DATABASE_URL must be set for database tests")?;
        let admin_url = Url::parse(&raw).context("invalid database URL")?;
        Ok(Self { admin_url })
    }

    pub async fn create(&self, prefix: &str) -> Result<DatabaseHandle> {
        let name = format!("{}_{}", prefix, Uuid::new_v4().simple());

        let admin_pool = PgPool::connect(self.admin_url.as_str()).await?;
        admin_pool
            .execute(format!("CREATE DATABASE \"{name}\"").as_str())
            .await?;

        // Same server, same credentials, fresh database path.
        let mut database_url = self.admin_url.clone();
        database_url.set_path(&name);
        let pool = PgPool::connect(database_url.as_str()).await?;
        run_migrations(&pool).await?;

        Ok(DatabaseHandle {
            pool,
            database_url,
            name,
            admin_url: self.admin_url.clone(),
        })
    }
}

pub struct DatabaseHandle {
    pool: PgPool,
    database_url: Url,
    name: String,
    admin_url: Url,
}

impl DatabaseHandle {
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn database_url(&self) -> &str {
        self.database_url.as_str()
    }

    /// Drops the test database. Lingering connections are terminated first so
    /// the drop cannot hang on a leaked pool handle.
    pub async fn cleanup(self) -> Result<()> {
        drop(self.pool);
        let admin_pool = PgPool::connect(self.admin_url.as_str()).await?;
        admin_pool
            .execute(
                format!(
                    "SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = '{}'",
                    self.name
                )
                .as_str(),
            )
            .await?;
        admin_pool
            .execute(format!("DROP DATABASE IF EXISTS \"{}\"", self.name).as_str())
            .await?;
        Ok(())
    }
}
