//! Migration executor for running migrations.

use super::registry::MigrationRegistry;
use super::resolver::MigrationResolver;
use super::storage::MigrationStore;
use super::types::{
    AbortReason, DownTarget, MigrationDescriptor, MigrationDirection, MigrationError,
    MigrationRecord, RunOutcome, RunReport, RunState, UpTarget,
};
use std::collections::HashSet;
use tracing::{error, info, warn};

/// Executor for running migrations.
///
/// Steps run strictly one at a time. The store is updated only after a
/// step's script succeeds, so a failure never leaves the tracking table
/// ahead of the schema. The first failure stops the run; steps that already
/// succeeded stay recorded and a later run resumes from there.
pub struct MigrationExecutor {
    store: MigrationStore,
    resolver: MigrationResolver,
    state: RunState,
}

impl MigrationExecutor {
    /// Create a new executor over the given store and resolver.
    pub fn new(store: MigrationStore, resolver: MigrationResolver) -> Self {
        Self {
            store,
            resolver,
            state: RunState::Idle,
        }
    }

    /// State reached by the most recent run.
    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn store(&self) -> &MigrationStore {
        &self.store
    }

    pub fn resolver(&self) -> &MigrationResolver {
        &self.resolver
    }

    /// Names of every applied migration.
    pub async fn executed(&self) -> Result<HashSet<String>, MigrationError> {
        self.store.executed().await
    }

    /// Applied migrations with their timestamps, ordered by name.
    pub async fn records(&self) -> Result<Vec<MigrationRecord>, MigrationError> {
        self.store.records().await
    }

    /// Discovered migrations that have not been applied yet, in execution order.
    pub async fn pending(
        &self,
        descriptors: &[MigrationDescriptor],
    ) -> Result<Vec<MigrationDescriptor>, MigrationError> {
        self.plan_up(descriptors, &UpTarget::All).await
    }

    /// Apply pending migrations in ascending name order.
    pub async fn up(
        &mut self,
        descriptors: &[MigrationDescriptor],
        target: &UpTarget,
    ) -> Result<RunReport, MigrationError> {
        self.state = RunState::Planning;
        let plan = match self.plan_up(descriptors, target).await {
            Ok(plan) => plan,
            Err(e) => return Err(self.fail(e)),
        };

        info!(count = plan.len(), "Starting up migration");
        self.state = RunState::Executing;

        let mut applied = Vec::new();
        for migration in &plan {
            info!(migration = %migration.name, "Applying migration");

            if let Err(e) = self.step_up(migration).await {
                error!(migration = %migration.name, error = %e, "Migration failed");
                return Err(self.fail(e));
            }

            applied.push(migration.name.clone());
        }

        self.state = RunState::Completed;
        info!(count = applied.len(), "Up migration completed");

        Ok(RunReport {
            direction: MigrationDirection::Up,
            outcome: RunOutcome::Completed,
            migrations: applied,
        })
    }

    /// Revert applied migrations in descending name order.
    ///
    /// A declined confirmation ends the run with an aborted outcome before any
    /// reverse script executes.
    pub async fn down(
        &mut self,
        descriptors: &[MigrationDescriptor],
        target: &DownTarget,
    ) -> Result<RunReport, MigrationError> {
        self.state = RunState::Planning;
        let plan = match self.plan_down(descriptors, target).await {
            Ok(plan) => plan,
            Err(e) => return Err(self.fail(e)),
        };

        info!(count = plan.len(), "Starting down migration");
        self.state = RunState::Executing;

        let mut reverted = Vec::new();
        for migration in &plan {
            info!(migration = %migration.name, "Reverting migration");

            match self.step_down(migration).await {
                Ok(()) => reverted.push(migration.name.clone()),
                Err(MigrationError::UserDeclined) => {
                    warn!("Down migration cancelled");
                    self.state = RunState::Aborted;
                    return Ok(RunReport {
                        direction: MigrationDirection::Down,
                        outcome: RunOutcome::Aborted {
                            reason: AbortReason::UserDeclined,
                        },
                        migrations: reverted,
                    });
                }
                Err(e) => {
                    error!(migration = %migration.name, error = %e, "Migration failed");
                    return Err(self.fail(e));
                }
            }
        }

        self.state = RunState::Completed;
        info!(count = reverted.len(), "Down migration completed");

        Ok(RunReport {
            direction: MigrationDirection::Down,
            outcome: RunOutcome::Completed,
            migrations: reverted,
        })
    }

    async fn plan_up(
        &self,
        descriptors: &[MigrationDescriptor],
        target: &UpTarget,
    ) -> Result<Vec<MigrationDescriptor>, MigrationError> {
        let registry = MigrationRegistry::from_descriptors(descriptors.iter().cloned())?;
        let applied = self.store.executed().await?;
        registry.pending(&applied, target)
    }

    async fn plan_down(
        &self,
        descriptors: &[MigrationDescriptor],
        target: &DownTarget,
    ) -> Result<Vec<MigrationDescriptor>, MigrationError> {
        let registry = MigrationRegistry::from_descriptors(descriptors.iter().cloned())?;
        let applied = self.store.executed().await?;
        registry.revertible(&applied, target)
    }

    async fn step_up(&mut self, migration: &MigrationDescriptor) -> Result<(), MigrationError> {
        self.resolver.resolve(migration).apply().await?;
        self.store.log(&migration.name).await
    }

    async fn step_down(&mut self, migration: &MigrationDescriptor) -> Result<(), MigrationError> {
        self.resolver.resolve(migration).revert().await?;
        self.store.unlog(&migration.name).await
    }

    fn fail(&mut self, e: MigrationError) -> MigrationError {
        self.state = RunState::Aborted;
        e
    }
}
