//! Durable record of applied migrations.

use super::types::{MigrationError, MigrationRecord};
use crate::database::Database;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Default name of the tracking table.
pub const DEFAULT_TABLE_NAME: &str = "schema_migrations";

/// Tracking table backed by a [`Database`].
///
/// The table has two columns: `name` (primary key) and `created` (set once on
/// insert). It is created lazily the first time applied names are read.
pub struct MigrationStore {
    db: Arc<dyn Database>,
    table_name: String,
}

impl MigrationStore {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self::with_table_name(db, DEFAULT_TABLE_NAME)
    }

    pub fn with_table_name(db: Arc<dyn Database>, table_name: impl Into<String>) -> Self {
        Self {
            db,
            table_name: table_name.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Create the tracking table if it does not exist.
    pub async fn ensure_table(&self) -> Result<(), MigrationError> {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (
  name TEXT PRIMARY KEY,
  created TEXT DEFAULT (datetime('now'))
)",
            self.table_name
        );
        self.db
            .execute_batch(&ddl)
            .await
            .map_err(MigrationError::SchemaBootstrap)?;
        info!(table = %self.table_name, "Created migration tracking table");
        Ok(())
    }

    /// Names of every applied migration.
    ///
    /// A missing tracking table is created and the read retried once; any
    /// other failure is returned unchanged.
    pub async fn executed(&self) -> Result<HashSet<String>, MigrationError> {
        let records = self.records().await?;
        Ok(records.into_iter().map(|r| r.name).collect())
    }

    /// Applied migrations with their creation timestamps, ordered by name.
    pub async fn records(&self) -> Result<Vec<MigrationRecord>, MigrationError> {
        let sql = format!(
            "SELECT name, created FROM {} ORDER BY name",
            self.table_name
        );

        let rows = match self.db.query(&sql, &[]).await {
            Ok(rows) => rows,
            Err(e) if e.is_undefined_table() => {
                debug!(table = %self.table_name, "Tracking table missing");
                self.ensure_table().await?;
                self.db.query(&sql, &[]).await?
            }
            Err(e) => return Err(e.into()),
        };

        Ok(rows
            .iter()
            .filter_map(|row| {
                row.get("name").map(|name| MigrationRecord {
                    name: name.to_string(),
                    created: row.get("created").map(str::to_string),
                })
            })
            .collect())
    }

    /// Record `name` as applied. A name that is already recorded is an error.
    pub async fn log(&self, name: &str) -> Result<(), MigrationError> {
        let sql = format!("INSERT INTO {} (name) VALUES (?)", self.table_name);
        self.db.query(&sql, &[name]).await?;
        debug!(migration = %name, "Logged migration");
        Ok(())
    }

    /// Erase the record for `name`. Erasing an absent name is not an error.
    pub async fn unlog(&self, name: &str) -> Result<(), MigrationError> {
        let sql = format!("DELETE FROM {} WHERE name = ?", self.table_name);
        self.db.query(&sql, &[name]).await?;
        debug!(migration = %name, "Unlogged migration");
        Ok(())
    }
}
