use crate::migration::{DEFAULT_GLOB, DEFAULT_MIGRATIONS_SEGMENT, DEFAULT_TABLE_NAME};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Database used when none is configured.
pub const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

fn default_glob() -> String {
    DEFAULT_GLOB.to_string()
}

fn default_table_name() -> String {
    DEFAULT_TABLE_NAME.to_string()
}

fn default_migrations_segment() -> String {
    DEFAULT_MIGRATIONS_SEGMENT.to_string()
}

/// Migrator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigratorConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Pattern matching forward scripts.
    #[serde(default = "default_glob")]
    pub glob: String,
    /// Ask the operator once before running reverse scripts.
    #[serde(default)]
    pub confirm_before_down: bool,
    #[serde(default = "default_table_name")]
    pub table_name: String,
    /// Directory name whose `down/` subdirectory holds reverse scripts.
    #[serde(default = "default_migrations_segment")]
    pub migrations_segment: String,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            glob: default_glob(),
            confirm_before_down: false,
            table_name: default_table_name(),
            migrations_segment: default_migrations_segment(),
        }
    }
}

/// Read a JSON configuration file, or `None` if it does not exist
pub async fn read_config(config_path: &Path) -> Result<Option<MigratorConfig>, ConfigError> {
    if !config_path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(config_path).await?;
    let config: MigratorConfig = serde_json::from_str(&content)?;
    Ok(Some(config))
}
