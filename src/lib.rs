pub mod config;
pub mod database;
pub mod migration;

// Re-export commonly used types
pub use config::{read_config, ConfigError, MigratorConfig};
pub use database::{Database, DbError, DbErrorKind, Row, SqliteDatabase};
pub use migration::{
    create_executor, create_migration, discover, AlwaysConfirm, Confirm, ConfirmationGate,
    DownTarget, MigrationDescriptor, MigrationError, MigrationExecutor, MigrationRegistry,
    MigrationResolver, MigrationStore, RunOutcome, RunReport, RunState, StdinConfirm, UpTarget,
};
