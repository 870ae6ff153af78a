//! SQLite client built on a single sqlx connection.

use super::{Database, DbError, DbErrorKind, Row};
use async_trait::async_trait;
use sqlx::error::{DatabaseError, ErrorKind};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, ConnectOptions, Executor as _, Row as _};
use std::str::FromStr;
use tokio::sync::Mutex;
use tracing::debug;

/// Generic SQLite result code; undefined tables are reported with it.
const SQLITE_ERROR: &str = "1";

/// A SQLite database accessed through one connection held for the whole run.
///
/// The connection is not pooled: every call waits on the same lock, so
/// statements are strictly sequential.
pub struct SqliteDatabase {
    conn: Mutex<SqliteConnection>,
}

impl SqliteDatabase {
    /// Open a connection, creating the database file if it does not exist.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(classify)?
            .create_if_missing(true);
        let conn = options.connect().await.map_err(classify)?;
        debug!(url = %url, "Connected to database");
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: SqliteConnection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn execute_batch(&self, sql: &str) -> Result<(), DbError> {
        let mut conn = self.conn.lock().await;
        conn.execute(sqlx::raw_sql(sql)).await.map_err(classify)?;
        Ok(())
    }

    async fn query(&self, sql: &str, params: &[&str]) -> Result<Vec<Row>, DbError> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind(param.to_string());
        }

        let mut conn = self.conn.lock().await;
        let rows = query.fetch_all(&mut *conn).await.map_err(classify)?;
        Ok(rows.iter().map(to_row).collect())
    }
}

fn to_row(row: &SqliteRow) -> Row {
    row.columns().iter().fold(Row::new(), |acc, column| {
        // SQLite coerces any stored value to text on read.
        let value = row
            .try_get_unchecked::<Option<String>, _>(column.ordinal())
            .ok()
            .flatten();
        acc.with(column.name(), value)
    })
}

fn classify(err: sqlx::Error) -> DbError {
    match &err {
        sqlx::Error::Database(db) => {
            let kind = if matches!(db.kind(), ErrorKind::UniqueViolation) {
                DbErrorKind::UniqueViolation
            } else if is_undefined_table(db.as_ref()) {
                DbErrorKind::UndefinedTable
            } else {
                DbErrorKind::Other
            };
            DbError::new(kind, db.message())
        }
        _ => DbError::other(err.to_string()),
    }
}

fn is_undefined_table(err: &dyn DatabaseError) -> bool {
    // SQLite has no dedicated result code for this case.
    err.code().as_deref() == Some(SQLITE_ERROR) && err.message().starts_with("no such table")
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_db() -> SqliteDatabase {
        SqliteDatabase::connect("sqlite::memory:")
            .await
            .expect("Should open in-memory database")
    }

    #[tokio::test]
    async fn test_execute_multi_statement_script() {
        let db = memory_db().await;
        db.execute_batch(
            "CREATE TABLE a (id TEXT PRIMARY KEY);
             CREATE TABLE b (id TEXT PRIMARY KEY);
             INSERT INTO a (id) VALUES ('x');",
        )
        .await
        .expect("Script should run");

        let rows = db
            .query("SELECT id FROM a WHERE id = ?", &["x"])
            .await
            .expect("Query should run");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id"), Some("x"));

        let rows = db.query("SELECT id FROM b", &[]).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_missing_table_is_classified() {
        let db = memory_db().await;
        let err = db.query("SELECT name FROM nowhere", &[]).await.unwrap_err();
        assert_eq!(err.kind, DbErrorKind::UndefinedTable);
    }

    #[tokio::test]
    async fn test_unique_violation_is_classified() {
        let db = memory_db().await;
        db.execute_batch("CREATE TABLE t (name TEXT PRIMARY KEY)")
            .await
            .unwrap();
        db.query("INSERT INTO t (name) VALUES (?)", &["a"])
            .await
            .unwrap();

        let err = db
            .query("INSERT INTO t (name) VALUES (?)", &["a"])
            .await
            .unwrap_err();
        assert_eq!(err.kind, DbErrorKind::UniqueViolation);
    }

    #[tokio::test]
    async fn test_syntax_error_is_other() {
        let db = memory_db().await;
        let err = db.execute_batch("CREATE TABLE (").await.unwrap_err();
        assert_eq!(err.kind, DbErrorKind::Other);
    }

    #[tokio::test]
    async fn test_null_columns_read_as_none() {
        let db = memory_db().await;
        let rows = db
            .query("SELECT 'x' AS label, NULL AS missing", &[])
            .await
            .unwrap();
        assert_eq!(rows[0].get("label"), Some("x"));
        assert_eq!(rows[0].get("missing"), None);
    }
}
