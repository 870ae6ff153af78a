//! Database client capabilities required by the migration engine.
//!
//! The engine only needs two things from a database: running a whole
//! script as one call, and running a parameterized statement that returns
//! rows. Errors are classified here, at the client boundary, so callers can
//! match on [`DbErrorKind`] instead of inspecting engine-specific messages.

mod sqlite;

pub use sqlite::SqliteDatabase;

use async_trait::async_trait;
use thiserror::Error;

/// Structured classification of a database failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    /// The statement referenced a table that does not exist.
    UndefinedTable,
    /// An insert or update violated a unique or primary key constraint.
    UniqueViolation,
    /// Anything else (syntax errors, I/O, connection loss...).
    Other,
}

/// Error returned by a [`Database`] call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DbError {
    pub kind: DbErrorKind,
    pub message: String,
}

impl DbError {
    pub fn new(kind: DbErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(DbErrorKind::Other, message)
    }

    pub fn is_undefined_table(&self) -> bool {
        self.kind == DbErrorKind::UndefinedTable
    }

    pub fn is_unique_violation(&self) -> bool {
        self.kind == DbErrorKind::UniqueViolation
    }
}

/// A single result row: column names with their values rendered as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    columns: Vec<(String, Option<String>)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column to the row.
    pub fn with(mut self, column: impl Into<String>, value: Option<String>) -> Self {
        self.columns.push((column.into(), value));
        self
    }

    /// Value of `column`, or `None` if the column is absent or NULL.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .and_then(|(_, value)| value.as_deref())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Capability set the migration engine needs from a database client.
#[async_trait]
pub trait Database: Send + Sync {
    /// Execute arbitrary, possibly multi-statement SQL text as a single call.
    async fn execute_batch(&self, sql: &str) -> Result<(), DbError>;

    /// Execute a parameterized statement and return its result rows.
    async fn query(&self, sql: &str, params: &[&str]) -> Result<Vec<Row>, DbError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_get() {
        let row = Row::new()
            .with("name", Some("0001_init".to_string()))
            .with("created", None);

        assert_eq!(row.get("name"), Some("0001_init"));
        assert_eq!(row.get("created"), None);
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_error_kinds() {
        let err = DbError::new(DbErrorKind::UndefinedTable, "no such table: x");
        assert!(err.is_undefined_table());
        assert!(!err.is_unique_violation());
        assert_eq!(err.to_string(), "no such table: x");
        assert!(!DbError::other("boom").is_undefined_table());
    }
}
