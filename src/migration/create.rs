//! Scaffolding for new migration scripts.

use super::resolver::DOWN_DIR;
use super::types::MigrationError;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::fs;
use tracing::info;

static NAME_PATTERN: OnceLock<Regex> = OnceLock::new();

fn name_pattern() -> &'static Regex {
    NAME_PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid name pattern"))
}

/// Paths of a newly created forward/reverse script pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedMigration {
    pub name: String,
    pub up_path: PathBuf,
    pub down_path: PathBuf,
}

/// Create empty forward and reverse scripts for `name` in `dir`.
///
/// The file name is prefixed with a UTC timestamp so lexical order follows
/// creation order. Existing files are never overwritten.
pub async fn create_migration(
    dir: &Path,
    name: &str,
    now: DateTime<Utc>,
) -> Result<CreatedMigration, MigrationError> {
    if !name_pattern().is_match(name) {
        return Err(MigrationError::InvalidName(name.to_string()));
    }

    let full_name = format!("{}_{}", now.format("%Y%m%d%H%M%S"), name);
    let file_name = format!("{}.sql", full_name);
    let up_path = dir.join(&file_name);
    let down_path = dir.join(DOWN_DIR).join(&file_name);

    if up_path.exists() || down_path.exists() {
        return Err(MigrationError::DuplicateMigration(full_name));
    }

    fs::create_dir_all(dir.join(DOWN_DIR)).await?;
    fs::write(&up_path, format!("-- Migration: {}\n", full_name)).await?;
    fs::write(&down_path, format!("-- Revert: {}\n", full_name)).await?;

    info!(migration = %full_name, "Created migration");

    Ok(CreatedMigration {
        name: full_name,
        up_path,
        down_path,
    })
}
