use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlmig::config::{read_config, MigratorConfig};
use sqlmig::database::SqliteDatabase;
use sqlmig::migration::{
    base_dir, create_migration, discover, ConfirmationGate, DownTarget, MigrationExecutor,
    MigrationResolver, MigrationStore, RunOutcome, StdinConfirm, UpTarget,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_CONFIG_FILE: &str = "sqlmig.json";

/// Sqlmig - apply and revert versioned SQL migrations
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file. Ignored if it does not exist.
    #[arg(short, long, env = "SQLMIG_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Database URL, e.g. sqlite://app.db
    #[arg(long, env = "SQLMIG_DATABASE_URL")]
    database_url: Option<String>,

    /// Glob matching forward migration scripts
    #[arg(long, env = "SQLMIG_GLOB")]
    glob: Option<String>,

    /// Ask for confirmation before running reverse scripts
    #[arg(
        long,
        env = "SQLMIG_CONFIRM_BEFORE_DOWN",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    confirm_before_down: Option<bool>,

    /// Name of the tracking table
    #[arg(long, env = "SQLMIG_TABLE")]
    table: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending migrations
    Up {
        /// Apply up to and including this migration
        #[arg(long, conflicts_with = "step")]
        to: Option<String>,

        /// Apply at most this many migrations
        #[arg(long)]
        step: Option<usize>,
    },
    /// Revert applied migrations (the most recent one by default)
    Down {
        /// Revert every migration newer than this one
        #[arg(long, conflicts_with_all = ["step", "all"])]
        to: Option<String>,

        /// Revert at most this many migrations
        #[arg(long, conflicts_with = "all")]
        step: Option<usize>,

        /// Revert every applied migration
        #[arg(long)]
        all: bool,
    },
    /// List migrations that have not been applied
    Pending,
    /// List applied migrations
    Executed,
    /// Create an empty forward/reverse script pair
    Create {
        /// Migration name, prefixed with a timestamp on disk
        name: String,

        /// Directory for the forward script. Defaults to the glob's base directory.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

impl Command {
    fn up_target(to: Option<String>, step: Option<usize>) -> UpTarget {
        match (to, step) {
            (Some(name), _) => UpTarget::To(name),
            (None, Some(n)) => UpTarget::Steps(n),
            (None, None) => UpTarget::All,
        }
    }

    fn down_target(to: Option<String>, step: Option<usize>, all: bool) -> DownTarget {
        match (to, step, all) {
            (Some(name), _, _) => DownTarget::To(name),
            (None, Some(n), _) => DownTarget::Steps(n),
            (None, None, true) => DownTarget::All,
            (None, None, false) => DownTarget::LastApplied,
        }
    }
}

async fn load_config(args: &Args) -> anyhow::Result<MigratorConfig> {
    let mut config = read_config(&args.config)
        .await
        .with_context(|| format!("Failed to read config {}", args.config.display()))?
        .unwrap_or_default();

    if let Some(url) = &args.database_url {
        config.database_url = url.clone();
    }
    if let Some(glob) = &args.glob {
        config.glob = glob.clone();
    }
    if let Some(confirm) = args.confirm_before_down {
        config.confirm_before_down = confirm;
    }
    if let Some(table) = &args.table {
        config.table_name = table.clone();
    }
    Ok(config)
}

async fn connect(config: &MigratorConfig) -> anyhow::Result<MigrationExecutor> {
    let db = Arc::new(
        SqliteDatabase::connect(&config.database_url)
            .await
            .with_context(|| format!("Failed to connect to {}", config.database_url))?,
    );

    let store = MigrationStore::with_table_name(db.clone(), config.table_name.clone());
    let gate = ConfirmationGate::new(config.confirm_before_down, Box::new(StdinConfirm));
    let resolver = MigrationResolver::new(db, gate).with_segment(config.migrations_segment.clone());
    Ok(MigrationExecutor::new(store, resolver))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Parse CLI arguments
    let args = Args::parse();
    let config = load_config(&args).await?;

    match args.command {
        Command::Create { name, dir } => {
            let dir = dir.unwrap_or_else(|| base_dir(&config.glob));
            let created = create_migration(&dir, &name, chrono::Utc::now()).await?;
            println!("{}", created.up_path.display());
            println!("{}", created.down_path.display());
        }
        Command::Pending => {
            let descriptors = discover(&config.glob)?;
            let executor = connect(&config).await?;
            for migration in executor.pending(&descriptors).await? {
                println!("{}", migration.name);
            }
        }
        Command::Executed => {
            let executor = connect(&config).await?;
            for record in executor.records().await? {
                println!("{}\t{}", record.name, record.created.unwrap_or_default());
            }
        }
        Command::Up { to, step } => {
            let descriptors = discover(&config.glob)?;
            let mut executor = connect(&config).await?;
            let report = executor
                .up(&descriptors, &Command::up_target(to, step))
                .await?;
            info!(count = report.migrations.len(), "Applied migrations");
        }
        Command::Down { to, step, all } => {
            let descriptors = discover(&config.glob)?;
            let mut executor = connect(&config).await?;
            let report = executor
                .down(&descriptors, &Command::down_target(to, step, all))
                .await?;
            if let RunOutcome::Aborted { reason } = report.outcome {
                warn!(?reason, "Down migration cancelled");
                return Ok(ExitCode::FAILURE);
            }
            info!(count = report.migrations.len(), "Reverted migrations");
        }
    }

    Ok(ExitCode::SUCCESS)
}
