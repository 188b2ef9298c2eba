use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use common::config::ImporterConfig;
use db::{PullRequestRow, RepositoryRow, Stores};
use gh_client::{GithubApiError, GithubClient};
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::pager::Paginator;
use crate::reconcile::Reconciler;

/// Aggregate per-pass counts of successfully reconciled records. Absorbed
/// per-record failures are visible only in logs, never in these counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub repositories: u64,
    pub pull_requests: u64,
    pub reviews: u64,
}

/// Runs the three import passes in dependency order: repositories, then pull
/// requests for every stored repository, then reviews for every stored pull
/// request. A pass completes fully before the next begins.
pub struct Importer {
    config: ImporterConfig,
    client: Arc<dyn GithubClient>,
    stores: Arc<dyn Stores>,
    reconciler: Reconciler,
}

impl Importer {
    pub fn new(
        config: ImporterConfig,
        client: Arc<dyn GithubClient>,
        stores: Arc<dyn Stores>,
    ) -> Self {
        let reconciler = Reconciler::new(stores.clone());
        Self {
            config,
            client,
            stores,
            reconciler,
        }
    }

    pub async fn run(&self) -> Result<()> {
        loop {
            let summary = self.run_once().await?;
            info!(
                repositories = summary.repositories,
                pull_requests = summary.pull_requests,
                reviews = summary.reviews,
                "import run complete"
            );
            if self.config.run_once {
                break;
            }
            sleep(Duration::from_secs(self.config.interval_secs)).await;
        }
        Ok(())
    }

    #[instrument(skip(self), fields(org = %self.config.org))]
    pub async fn run_once(&self) -> Result<ImportSummary> {
        let repositories = self.import_repositories().await?;

        let mut pull_requests = 0u64;
        for repo in self.stores.repositories().list().await? {
            match self.import_pull_requests(&repo).await {
                Ok(count) => pull_requests += count,
                Err(err) if is_fatal(&err) => return Err(err),
                Err(err) => warn!(
                    repository = %repo.name,
                    error = ?err,
                    "failed to import pull requests"
                ),
            }
        }

        let mut reviews = 0u64;
        for repo in self.stores.repositories().list().await? {
            for pull in self.stores.pull_requests().list_by_repository(repo.id).await? {
                match self.import_reviews(&repo, &pull).await {
                    Ok(count) => reviews += count,
                    Err(err) if is_fatal(&err) => return Err(err),
                    Err(err) => warn!(
                        repository = %repo.name,
                        number = pull.number,
                        error = ?err,
                        "failed to import reviews"
                    ),
                }
            }
        }

        Ok(ImportSummary {
            repositories,
            pull_requests,
            reviews,
        })
    }

    async fn import_repositories(&self) -> Result<u64> {
        let mut pager = Paginator::new(self.config.page_size);
        let mut imported = 0u64;
        while let Some(page) = pager.next_page() {
            let records = self
                .client
                .list_org_repos(&self.config.org, page, self.config.page_size)
                .await?;
            pager.record_page(records.len());
            for record in &records {
                match self.reconciler.reconcile_repository(record).await {
                    Ok(_) => imported += 1,
                    Err(err) => warn!(error = ?err, "skipping repository record"),
                }
            }
        }
        info!(imported, "repository pass complete");
        Ok(imported)
    }

    #[instrument(skip(self, repo), fields(repository = %repo.name))]
    async fn import_pull_requests(&self, repo: &RepositoryRow) -> Result<u64> {
        let (owner, name) = split_repo_name(&repo.name, &self.config.default_owner);
        let mut pager = Paginator::new(self.config.page_size);
        let mut imported = 0u64;
        while let Some(page) = pager.next_page() {
            let records = self
                .client
                .list_pull_requests(owner, name, page, self.config.page_size)
                .await?;
            pager.record_page(records.len());
            for record in &records {
                let record = if self.config.fetch_details {
                    self.enrich_pull_request(owner, name, record).await?
                } else {
                    record.clone()
                };
                match self.reconciler.reconcile_pull_request(&record, repo.id).await {
                    Ok(Some(_)) => imported += 1,
                    Ok(None) => {}
                    Err(err) => warn!(error = ?err, "skipping pull request record"),
                }
            }
        }
        debug!(imported, "pull request pass complete for repository");
        Ok(imported)
    }

    /// The list endpoint omits per-PR statistics; fetch the detail record
    /// when configured. A pull request deleted upstream between listing and
    /// detail fetch keeps its list payload.
    async fn enrich_pull_request(&self, owner: &str, name: &str, record: &Value) -> Result<Value> {
        let Some(number) = record.get("number").and_then(Value::as_i64) else {
            return Ok(record.clone());
        };
        match self.client.get_pull_request(owner, name, number).await {
            Ok(detail) => Ok(detail),
            Err(err) if is_not_found(&err) => {
                debug!(number, "pull request detail gone upstream; keeping list payload");
                Ok(record.clone())
            }
            Err(err) => Err(err),
        }
    }

    async fn import_reviews(&self, repo: &RepositoryRow, pull: &PullRequestRow) -> Result<u64> {
        let (owner, name) = split_repo_name(&repo.name, &self.config.default_owner);
        let mut pager = Paginator::new(self.config.page_size);
        let mut imported = 0u64;
        while let Some(page) = pager.next_page() {
            let records = match self
                .client
                .list_pull_request_reviews(owner, name, pull.number, page, self.config.page_size)
                .await
            {
                Ok(records) => records,
                Err(err) if is_not_found(&err) => {
                    debug!(number = pull.number, "pull request gone upstream; skipping reviews");
                    return Ok(imported);
                }
                Err(err) => return Err(err),
            };
            pager.record_page(records.len());
            for record in &records {
                match self.reconciler.reconcile_review(record, pull.id).await {
                    Ok(Some(_)) => imported += 1,
                    Ok(None) => {}
                    Err(err) => warn!(error = ?err, "skipping review record"),
                }
            }
        }
        Ok(imported)
    }
}

/// The remote addresses resources by `owner/repo`, while stored repository
/// names may or may not carry the owner prefix. Owner is the first non-empty
/// segment, repo the last; a bare name gets the configured default owner.
pub fn split_repo_name<'a>(name: &'a str, default_owner: &'a str) -> (&'a str, &'a str) {
    if !name.contains('/') {
        return (default_owner, name);
    }
    let mut segments = name.split('/').filter(|s| !s.is_empty());
    let owner = segments.next().unwrap_or(default_owner);
    let repo = segments.last().unwrap_or(owner);
    (owner, repo)
}

fn is_not_found(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<GithubApiError>(),
        Some(GithubApiError::NotFound { .. })
    )
}

fn is_fatal(err: &anyhow::Error) -> bool {
    err.downcast_ref::<GithubApiError>()
        .map(GithubApiError::is_fatal)
        .unwrap_or(false)
}
