#![allow(dead_code)]

use async_trait::async_trait;
use sqlmig::database::{Database, DbError, Row, SqliteDatabase};
use sqlmig::migration::{Confirm, MigrationDescriptor};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Create a temporary directory for testing
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// `<root>/db/migrations`, with its `down/` subdirectory created
pub fn migrations_dir(root: &Path) -> PathBuf {
    let dir = root.join("db").join("migrations");
    std::fs::create_dir_all(dir.join("down")).expect("Failed to create migrations dir");
    dir
}

/// Write a forward/reverse script pair and return its descriptor
pub fn write_migration(dir: &Path, name: &str, up: &str, down: &str) -> MigrationDescriptor {
    let file_name = format!("{}.sql", name);
    let up_path = dir.join(&file_name);
    std::fs::write(&up_path, up).expect("Failed to write up script");
    std::fs::write(dir.join("down").join(&file_name), down).expect("Failed to write down script");
    MigrationDescriptor::from_path(up_path)
}

/// Forward script that creates `table` and records `name` in the `trail` table
pub fn create_table_script(name: &str, table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS trail (seq INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT);
CREATE TABLE {table} (id TEXT PRIMARY KEY);
INSERT INTO trail (name) VALUES ('{name}');"
    )
}

pub fn drop_table_script(table: &str) -> String {
    format!("DROP TABLE {table};")
}

pub async fn memory_db() -> SqliteDatabase {
    SqliteDatabase::connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database")
}

pub async fn table_exists(db: &dyn Database, table: &str) -> bool {
    let rows = db
        .query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
            &[table],
        )
        .await
        .expect("Failed to query sqlite_master");
    !rows.is_empty()
}

/// Names recorded by forward scripts in execution order
pub async fn trail(db: &dyn Database) -> Vec<String> {
    db.query("SELECT name FROM trail ORDER BY seq", &[])
        .await
        .expect("Failed to read trail")
        .iter()
        .filter_map(|row| row.get("name").map(str::to_string))
        .collect()
}

/// Database wrapper that records every call
pub struct RecordingDatabase {
    inner: SqliteDatabase,
    scripts: Mutex<Vec<String>>,
    writes: Mutex<Vec<String>>,
}

impl RecordingDatabase {
    pub async fn new() -> Self {
        Self {
            inner: memory_db().await,
            scripts: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Multi-statement scripts executed so far
    pub fn scripts(&self) -> Vec<String> {
        self.scripts.lock().unwrap().clone()
    }

    /// INSERT/DELETE statements executed so far
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Database for RecordingDatabase {
    async fn execute_batch(&self, sql: &str) -> Result<(), DbError> {
        self.scripts.lock().unwrap().push(sql.to_string());
        self.inner.execute_batch(sql).await
    }

    async fn query(&self, sql: &str, params: &[&str]) -> Result<Vec<Row>, DbError> {
        let upper = sql.trim_start().to_uppercase();
        if upper.starts_with("INSERT") || upper.starts_with("DELETE") {
            self.writes.lock().unwrap().push(sql.to_string());
        }
        self.inner.query(sql, params).await
    }
}

/// Confirmation that always gives the same answer and counts prompts
pub struct ScriptedConfirm {
    answer: bool,
    asked: Arc<AtomicUsize>,
}

impl ScriptedConfirm {
    pub fn new(answer: bool) -> (Self, Arc<AtomicUsize>) {
        let asked = Arc::new(AtomicUsize::new(0));
        (
            Self {
                answer,
                asked: asked.clone(),
            },
            asked,
        )
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}
