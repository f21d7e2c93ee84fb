//! CLI command definitions and execution
//!
//! Each command lives in its own module with an `Args` struct and an
//! `execute` function returning an exit code.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sfs_core::{ConfigManager, Keyring, ObjectStore, Transfers};
use sfs_swift::SwiftClient;
use tracing::debug;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod completions;
mod cp;
mod ls;
mod mb;
mod rm;
mod stat;

/// sfs - browse and transfer files on OpenStack Swift object storage
///
/// Containers and objects are shown as a directory tree: `/container/dir/file`.
#[derive(Parser, Debug)]
#[command(name = "sfs")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress spinner
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    /// Keyring file holding the auth token and service catalog
    #[arg(long, global = true, env = "SFS_KEYRING")]
    pub keyring: Option<PathBuf>,

    /// Region of the object store endpoint
    #[arg(long, global = true, env = "SFS_REGION")]
    pub region: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List containers, folders and objects
    Ls(ls::LsArgs),

    /// Show the type and metadata of a path
    Stat(stat::StatArgs),

    /// Create a container
    Mb(mb::MbArgs),

    /// Copy files to or from the store
    Cp(cp::CpArgs),

    /// Remove objects, folders or containers
    Rm(rm::RmArgs),

    /// Generate shell completion scripts
    Completions(completions::CompletionsArgs),
}

/// Connection overrides given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    pub keyring: Option<PathBuf>,
    pub region: Option<String>,
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let output_config = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        no_progress: cli.no_progress,
        quiet: cli.quiet,
    };
    let connect = ConnectOptions {
        keyring: cli.keyring,
        region: cli.region,
    };

    match cli.command {
        Commands::Ls(args) => ls::execute(args, &connect, output_config).await,
        Commands::Stat(args) => stat::execute(args, &connect, output_config).await,
        Commands::Mb(args) => mb::execute(args, &connect, output_config).await,
        Commands::Cp(args) => cp::execute(args, &connect, output_config).await,
        Commands::Rm(args) => rm::execute(args, &connect, output_config).await,
        Commands::Completions(args) => completions::execute(args),
    }
}

/// Load the configuration and keyring and open the store
pub fn connect(options: &ConnectOptions) -> anyhow::Result<Transfers> {
    let manager = ConfigManager::new()?;
    let mut config = manager
        .load()
        .with_context(|| format!("Failed to load {}", manager.config_path().display()))?;

    if let Some(keyring) = &options.keyring {
        config.connection.keyring = Some(keyring.clone());
    }
    if let Some(region) = &options.region {
        config.connection.region = Some(region.clone());
    }

    let keyring_path = manager.keyring_path(&config);
    let keyring = Keyring::load(&keyring_path)
        .with_context(|| format!("Failed to read keyring {}", keyring_path.display()))?;

    let region = config.connection.region.clone().ok_or_else(|| {
        sfs_core::Error::Config("No region configured, use --region or SFS_REGION".to_string())
    })?;

    debug!(keyring = %keyring_path.display(), region = %region, "connecting");
    let client = SwiftClient::new(&keyring, &region).context("Failed to open the object store")?;
    let store: Arc<dyn ObjectStore> = Arc::new(client);
    Ok(Transfers::new(store, config.transfer))
}

/// Report a failed command and map it to its exit code
pub(crate) fn fail(formatter: &Formatter, error: anyhow::Error) -> ExitCode {
    formatter.error(&format!("{error:#}"));
    ExitCode::from_error(&error)
}
