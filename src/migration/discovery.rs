//! Finds migration scripts on disk.

use super::types::{MigrationDescriptor, MigrationError};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Glob used when none is configured.
pub const DEFAULT_GLOB: &str = "db/migrations/*.sql";

/// Expand `pattern` into descriptors sorted by name. Directories are skipped.
pub fn discover(pattern: &str) -> Result<Vec<MigrationDescriptor>, MigrationError> {
    let paths = glob::glob(pattern)
        .map_err(|e| MigrationError::Discovery(format!("invalid pattern {}: {}", pattern, e)))?;

    let mut descriptors = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| MigrationError::Discovery(e.to_string()))?;
        if path.is_file() {
            descriptors.push(MigrationDescriptor::from_path(path));
        }
    }

    descriptors.sort_by(|a, b| a.name.cmp(&b.name));
    debug!(pattern = %pattern, count = descriptors.len(), "Discovered migrations");
    Ok(descriptors)
}

/// Leading directories of `pattern` that contain no wildcard.
///
/// `db/migrations/*.sql` -> `db/migrations`.
pub fn base_dir(pattern: &str) -> PathBuf {
    Path::new(pattern)
        .components()
        .take_while(|c| !c.as_os_str().to_string_lossy().contains(['*', '?', '[']))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_discover_sorted_and_skips_down_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let migrations = temp_dir.path().join("migrations");
        fs::create_dir_all(migrations.join("down")).unwrap();
        for name in ["0002_b.sql", "0001_a.sql", "notes.txt"] {
            fs::write(migrations.join(name), "").unwrap();
        }
        fs::write(migrations.join("down").join("0001_a.sql"), "").unwrap();

        let pattern = format!("{}/*.sql", migrations.display());
        let descriptors = discover(&pattern).unwrap();

        let names: Vec<&str> = descriptors.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["0001_a", "0002_b"]);
        assert_eq!(descriptors[0].path, Some(migrations.join("0001_a.sql")));
    }

    #[test]
    fn test_discover_no_matches() {
        let temp_dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/migrations/*.sql", temp_dir.path().display());
        assert!(discover(&pattern).unwrap().is_empty());
    }

    #[test]
    fn test_base_dir() {
        assert_eq!(base_dir("db/migrations/*.sql"), PathBuf::from("db/migrations"));
        assert_eq!(base_dir("/srv/migrations/[0-9]*.sql"), PathBuf::from("/srv/migrations"));
        assert_eq!(base_dir("*.sql"), PathBuf::new());
    }

    #[test]
    fn test_discover_invalid_pattern() {
        let result = discover("db/[migrations/*.sql");
        assert!(matches!(result, Err(MigrationError::Discovery(_))));
    }
}
