//! Optivault CLI
//!
//! Back up, inspect and restore one account's data held in a JSON snapshot
//! file.

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use optivault_backup::BackupConfig;
use optivault_core::Principal;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::CliConfig;

const DEFAULT_STORE_PATH: &str = "optivault-data.json";

/// Optivault CLI: back up and restore tenant data.
#[derive(Parser, Debug)]
#[command(name = "optivault", version, about)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, env = "OPTIVAULT_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Dataset snapshot file. Overrides `[store] path` from the configuration.
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Account id the operation runs for.
    #[arg(long, env = "OPTIVAULT_PRINCIPAL_ID", global = true)]
    principal_id: Option<String>,

    /// Account email, shown in backups and diagnostics only.
    #[arg(
        long,
        env = "OPTIVAULT_PRINCIPAL_EMAIL",
        default_value = "",
        global = true
    )]
    principal_email: String,

    /// Output format.
    #[arg(long, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export every collection of the account to a backup file.
    Backup(commands::backup::BackupArgs),
    /// Show what a backup file contains without restoring it.
    Inspect(commands::inspect::InspectArgs),
    /// Restore a backup file into the account.
    Restore(commands::restore::RestoreArgs),
}

/// Settings resolved from flags, environment and the configuration file.
#[derive(Debug)]
pub struct Session {
    pub backup: BackupConfig,
    pub store_path: PathBuf,
    principal_id: Option<String>,
    principal_email: String,
}

impl Session {
    /// The authenticated principal. Fails when no account id was supplied.
    pub fn principal(&self) -> anyhow::Result<Principal> {
        let id = self.principal_id.as_deref().ok_or_else(|| {
            anyhow!("no account id given; pass --principal-id or set OPTIVAULT_PRINCIPAL_ID")
        })?;
        Ok(Principal::authenticated(id, self.principal_email.as_str())?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = CliConfig::load(cli.config.as_deref())?;
    let session = Session {
        backup: config.backup_config(),
        store_path: cli
            .store
            .or(config.store.path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH)),
        principal_id: cli.principal_id,
        principal_email: cli.principal_email,
    };

    match cli.command {
        Command::Backup(args) => commands::backup::run(&session, &args, &cli.format).await,
        Command::Inspect(args) => commands::inspect::run(&args, &cli.format).await,
        Command::Restore(args) => commands::restore::run(&session, &args, &cli.format).await,
    }
}
