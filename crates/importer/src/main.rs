use std::sync::Arc;

use anyhow::Result;
use common::{config::AppConfig, logging};
use db::pg::PgDatabase;
use db::Stores;
use gh_client::{GithubClient, HttpExec, ReqwestExecutor, RestGithubClient};
use importer::Importer;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging("info");
    let config = AppConfig::load()?;

    let exec: Arc<dyn HttpExec> = Arc::new(ReqwestExecutor::new());
    let client: Arc<dyn GithubClient> = Arc::new(RestGithubClient::new(
        exec,
        &config.github.base_url,
        config.github.token.clone(),
        config.github.user_agent.clone(),
    )?);

    let database = Arc::new(PgDatabase::connect(&config.database.url).await?);
    let stores: Arc<dyn Stores> = database;

    let importer = Importer::new(config.importer.clone(), client, stores);
    info!(org = %config.importer.org, "importer started");
    importer.run().await?;
    Ok(())
}
