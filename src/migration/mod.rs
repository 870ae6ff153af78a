//! Migration system.
//!
//! Applies and reverts versioned SQL scripts in lexical name order while
//! recording progress in a tracking table.
//!
//! # Overview
//!
//! - `MigrationStore` keeps the set of applied names and creates its table on demand
//! - `MigrationResolver` turns a descriptor into forward/reverse steps and gates
//!   reverse steps behind operator confirmation
//! - `MigrationExecutor` plans a run with the `MigrationRegistry`, executes steps one
//!   at a time and updates the store after each success
//!
//! # Usage
//!
//! ```ignore
//! let descriptors = discover("db/migrations/*.sql")?;
//! let mut executor = create_executor(db, false, Box::new(AlwaysConfirm));
//! let report = executor.up(&descriptors, &UpTarget::All).await?;
//! ```

mod confirm;
mod create;
mod discovery;
mod executor;
mod registry;
mod resolver;
mod storage;
mod types;

pub use confirm::{
    AlwaysConfirm, Confirm, ConfirmationGate, ConfirmationState, StdinConfirm, DOWN_PROMPT,
};
pub use create::{create_migration, CreatedMigration};
pub use discovery::{base_dir, discover, DEFAULT_GLOB};
pub use executor::MigrationExecutor;
pub use registry::MigrationRegistry;
pub use resolver::{
    reverse_path, MigrationResolver, ResolvedMigration, DEFAULT_MIGRATIONS_SEGMENT, DOWN_DIR,
};
pub use storage::{MigrationStore, DEFAULT_TABLE_NAME};
pub use types::{
    migration_name, AbortReason, DownTarget, MigrationDescriptor, MigrationDirection,
    MigrationError, MigrationRecord, RunOutcome, RunReport, RunState, UpTarget,
};

use crate::database::Database;
use std::sync::Arc;

/// Create an executor with the default table name and migrations segment.
///
/// When `confirm_before_down` is set, the first reverse step asks `confirm`;
/// the answer holds for the lifetime of the returned executor.
pub fn create_executor(
    db: Arc<dyn Database>,
    confirm_before_down: bool,
    confirm: Box<dyn Confirm>,
) -> MigrationExecutor {
    let store = MigrationStore::new(db.clone());
    let resolver = MigrationResolver::new(db, ConfirmationGate::new(confirm_before_down, confirm));
    MigrationExecutor::new(store, resolver)
}
