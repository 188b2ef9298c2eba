use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub github: GithubConfig,
    pub importer: ImporterConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(".")
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Config::builder()
            .add_source(
                File::with_name(
                    path.as_ref()
                        .join("config/default")
                        .to_string_lossy()
                        .as_ref(),
                )
                .required(false),
            )
            .add_source(
                File::with_name(
                    path.as_ref()
                        .join("config/local")
                        .to_string_lossy()
                        .as_ref(),
                )
                .required(false),
            )
            .add_source(Environment::default().separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default)]
    pub test_admin_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    pub token: String,
    #[serde(default = "GithubConfig::default_user_agent")]
    pub user_agent: String,
    #[serde(default = "GithubConfig::default_base_url")]
    pub base_url: String,
}

impl GithubConfig {
    fn default_user_agent() -> String {
        "gh-ingest".to_string()
    }

    fn default_base_url() -> String {
        "https://api.github.com/".to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImporterConfig {
    pub org: String,
    /// Owner assumed when a stored repository name carries no `owner/` prefix.
    #[serde(default = "ImporterConfig::default_owner")]
    pub default_owner: String,
    #[serde(default = "ImporterConfig::default_page_size")]
    pub page_size: u32,
    /// Fetch per-PR detail to fill additions/deletions/changed_files/commits,
    /// which the list endpoint omits. One extra request per pull request.
    #[serde(default)]
    pub fetch_details: bool,
    #[serde(default = "ImporterConfig::default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default)]
    pub run_once: bool,
}

impl ImporterConfig {
    fn default_owner() -> String {
        "vercel".to_string()
    }

    const fn default_page_size() -> u32 {
        100
    }

    const fn default_interval_secs() -> u64 {
        300
    }
}
