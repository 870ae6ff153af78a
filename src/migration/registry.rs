//! Migration registry for planning forward and reverse runs.

use super::types::{DownTarget, MigrationDescriptor, MigrationError, UpTarget};
use std::collections::{BTreeMap, HashSet};

/// Snapshot of the discovered migrations.
///
/// The registry keeps descriptors ordered by name. Lexical order of names is
/// the only execution order; there is no dependency resolution.
#[derive(Debug, Clone, Default)]
pub struct MigrationRegistry {
    migrations: BTreeMap<String, MigrationDescriptor>,
}

impl MigrationRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a discovered set, in any order.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = MigrationDescriptor>,
    ) -> Result<Self, MigrationError> {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.register(descriptor)?;
        }
        Ok(registry)
    }

    /// Register a migration. Names must be unique.
    pub fn register(&mut self, descriptor: MigrationDescriptor) -> Result<(), MigrationError> {
        if self.migrations.contains_key(&descriptor.name) {
            return Err(MigrationError::DuplicateMigration(descriptor.name));
        }
        self.migrations.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&MigrationDescriptor> {
        self.migrations.get(name)
    }

    /// All registered names in ascending order.
    pub fn names(&self) -> Vec<String> {
        self.migrations.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Discovered migrations not yet applied, ascending by name, limited by `target`.
    pub fn pending(
        &self,
        applied: &HashSet<String>,
        target: &UpTarget,
    ) -> Result<Vec<MigrationDescriptor>, MigrationError> {
        let pending: Vec<&MigrationDescriptor> = self
            .migrations
            .values()
            .filter(|m| !applied.contains(&m.name))
            .collect();

        let selected = match target {
            UpTarget::All => pending,
            UpTarget::Steps(n) => pending.into_iter().take(*n).collect(),
            UpTarget::To(name) => {
                let end = pending
                    .iter()
                    .position(|m| &m.name == name)
                    .ok_or_else(|| MigrationError::UnknownMigration(name.clone()))?;
                pending.into_iter().take(end + 1).collect()
            }
        };

        Ok(selected.into_iter().cloned().collect())
    }

    /// Applied migrations to revert, descending by name, limited by `target`.
    ///
    /// Every selected name must have a discovered descriptor, otherwise its
    /// reverse script cannot be located and nothing is planned.
    pub fn revertible(
        &self,
        applied: &HashSet<String>,
        target: &DownTarget,
    ) -> Result<Vec<MigrationDescriptor>, MigrationError> {
        let mut executed: Vec<&String> = applied.iter().collect();
        executed.sort_unstable_by(|a, b| b.cmp(a));

        let selected: Vec<&String> = match target {
            DownTarget::LastApplied => executed.into_iter().take(1).collect(),
            DownTarget::All => executed,
            DownTarget::Steps(n) => executed.into_iter().take(*n).collect(),
            DownTarget::To(name) => {
                if !applied.contains(name) {
                    return Err(MigrationError::UnknownMigration(name.clone()));
                }
                executed.into_iter().take_while(|n| *n > name).collect()
            }
        };

        selected
            .into_iter()
            .map(|name| {
                self.get(name)
                    .cloned()
                    .ok_or_else(|| MigrationError::UnknownMigration(name.clone()))
            })
            .collect()
    }
}
