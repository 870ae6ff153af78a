//! Turns migration descriptors into executable forward and reverse steps.

use super::confirm::ConfirmationGate;
use super::types::{MigrationDescriptor, MigrationError};
use crate::database::Database;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

/// Directory segment that holds forward scripts by default.
pub const DEFAULT_MIGRATIONS_SEGMENT: &str = "migrations";

/// Subdirectory of the migrations root that holds reverse scripts.
pub const DOWN_DIR: &str = "down";

/// Resolves descriptors against one database, guarding reverse steps with a
/// [`ConfirmationGate`].
pub struct MigrationResolver {
    db: Arc<dyn Database>,
    gate: ConfirmationGate,
    segment: String,
}

impl MigrationResolver {
    pub fn new(db: Arc<dyn Database>, gate: ConfirmationGate) -> Self {
        Self {
            db,
            gate,
            segment: DEFAULT_MIGRATIONS_SEGMENT.to_string(),
        }
    }

    /// Use a different migrations-root directory name when locating reverse scripts.
    pub fn with_segment(mut self, segment: impl Into<String>) -> Self {
        self.segment = segment.into();
        self
    }

    pub fn gate(&self) -> &ConfirmationGate {
        &self.gate
    }

    /// Bind a descriptor to this resolver.
    pub fn resolve<'a>(&'a mut self, descriptor: &'a MigrationDescriptor) -> ResolvedMigration<'a> {
        ResolvedMigration {
            resolver: self,
            descriptor,
        }
    }

    async fn run_script(&self, path: &Path) -> Result<(), MigrationError> {
        let sql = fs::read_to_string(path)
            .await
            .map_err(|source| MigrationError::ScriptRead {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(script = %path.display(), bytes = sql.len(), "Executing script");
        self.db.execute_batch(&sql).await?;
        Ok(())
    }
}

/// One migration ready to run in either direction.
pub struct ResolvedMigration<'a> {
    resolver: &'a mut MigrationResolver,
    descriptor: &'a MigrationDescriptor,
}

impl ResolvedMigration<'_> {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Execute the forward script.
    pub async fn apply(self) -> Result<(), MigrationError> {
        let path = self.script_path()?;
        self.resolver.run_script(path).await
    }

    /// Execute the reverse script, asking for confirmation first if required.
    ///
    /// Returns [`MigrationError::UserDeclined`] without touching the database
    /// when the operator refuses.
    pub async fn revert(self) -> Result<(), MigrationError> {
        let path = reverse_path(self.script_path()?, &self.resolver.segment)?;
        if !self.resolver.gate.check() {
            return Err(MigrationError::UserDeclined);
        }
        self.resolver.run_script(&path).await
    }

    fn script_path(&self) -> Result<&'_ Path, MigrationError> {
        self.descriptor
            .path
            .as_deref()
            .ok_or_else(|| MigrationError::MissingPath(self.descriptor.name.clone()))
    }
}

/// `db/migrations/0001.sql` -> `db/migrations/down/0001.sql`.
///
/// The last component equal to `segment` is the migrations root.
pub fn reverse_path(path: &Path, segment: &str) -> Result<PathBuf, MigrationError> {
    let components: Vec<Component<'_>> = path.components().collect();
    let root = components
        .iter()
        .rposition(|c| c.as_os_str() == OsStr::new(segment))
        .filter(|i| i + 1 < components.len())
        .ok_or_else(|| MigrationError::ReversePath(path.to_path_buf()))?;

    let mut reversed = PathBuf::new();
    for (i, component) in components.iter().enumerate() {
        reversed.push(component.as_os_str());
        if i == root {
            reversed.push(DOWN_DIR);
        }
    }
    Ok(reversed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_path_inserts_down_dir() {
        let path = reverse_path(Path::new("db/migrations/0001_init.sql"), "migrations").unwrap();
        assert_eq!(path, PathBuf::from("db/migrations/down/0001_init.sql"));
    }

    #[test]
    fn test_reverse_path_absolute_and_relative_root() {
        let path = reverse_path(Path::new("/srv/app/migrations/0002.sql"), "migrations").unwrap();
        assert_eq!(path, PathBuf::from("/srv/app/migrations/down/0002.sql"));

        let path = reverse_path(Path::new("migrations/0002.sql"), "migrations").unwrap();
        assert_eq!(path, PathBuf::from("migrations/down/0002.sql"));
    }

    #[test]
    fn test_reverse_path_uses_last_matching_segment() {
        let path = reverse_path(Path::new("migrations/app/migrations/0003.sql"), "migrations").unwrap();
        assert_eq!(path, PathBuf::from("migrations/app/migrations/down/0003.sql"));
    }

    #[test]
    fn test_reverse_path_custom_segment() {
        let path = reverse_path(Path::new("sql/schema/0001.sql"), "schema").unwrap();
        assert_eq!(path, PathBuf::from("sql/schema/down/0001.sql"));
    }

    #[test]
    fn test_reverse_path_without_segment() {
        let result = reverse_path(Path::new("sql/0001.sql"), "migrations");
        assert!(matches!(result, Err(MigrationError::ReversePath(_))));

        // A file literally named like the segment has no root directory.
        let result = reverse_path(Path::new("sql/migrations"), "migrations");
        assert!(matches!(result, Err(MigrationError::ReversePath(_))));
    }
}
