//! Types for the migration system.

use crate::database::DbError;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error types for migration operations.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Migration {0} has no script path")]
    MissingPath(String),

    #[error("Failed to read migration script {path}: {source}")]
    ScriptRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Failed to create tracking table: {0}")]
    SchemaBootstrap(#[source] DbError),

    #[error("Down migration declined by operator")]
    UserDeclined,

    #[error("Unknown migration: {0}")]
    UnknownMigration(String),

    #[error("Duplicate migration name: {0}")]
    DuplicateMigration(String),

    #[error("Cannot locate reverse script for {0}")]
    ReversePath(PathBuf),

    #[error("Discovery error: {0}")]
    Discovery(String),

    #[error("Invalid migration name: {0}")]
    InvalidName(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A discovered migration: its unique name and the location of its forward script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationDescriptor {
    pub name: String,
    pub path: Option<PathBuf>,
}

impl MigrationDescriptor {
    pub fn new(name: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }

    /// Build a descriptor from a script path, naming it after the file
    /// without its trailing extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = migration_name(&path);
        Self {
            name,
            path: Some(path),
        }
    }
}

/// `0001_init.sql` -> `0001_init`, `a.b.sql` -> `a.b`.
pub fn migration_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// A row of the tracking table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRecord {
    pub name: String,
    pub created: Option<String>,
}

/// Direction of migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    /// Applying forward scripts.
    Up,
    /// Applying reverse scripts.
    Down,
}

impl fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationDirection::Up => write!(f, "up"),
            MigrationDirection::Down => write!(f, "down"),
        }
    }
}

/// Lifecycle of a single runner invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Planning,
    Executing,
    Completed,
    Aborted,
}

/// Why a run stopped without completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    UserDeclined,
}

/// Terminal outcome of a run that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Aborted { reason: AbortReason },
}

/// Result of a runner invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub direction: MigrationDirection,
    pub outcome: RunOutcome,
    /// Names of the migrations that were applied or reverted, in execution order.
    pub migrations: Vec<String>,
}

impl RunReport {
    pub fn is_completed(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }
}

/// How far a forward run goes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UpTarget {
    /// Every pending migration.
    #[default]
    All,
    /// At most this many pending migrations.
    Steps(usize),
    /// Pending migrations up to and including this name.
    To(String),
}

/// How far a reverse run goes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DownTarget {
    /// Only the most recently applied migration.
    #[default]
    LastApplied,
    /// Every applied migration.
    All,
    /// At most this many applied migrations, newest first.
    Steps(usize),
    /// Every applied migration newer than this name; the named one stays applied.
    To(String),
}
