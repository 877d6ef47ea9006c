use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lifevault::cli::{
    handle_backup_command, handle_export_command, handle_inspect_command,
    handle_registry_command, handle_restore_command, BackupCommands,
};
use lifevault::config::{paths::VaultPaths, settings::VaultConfig};
use lifevault::Vault;

#[derive(Parser)]
#[command(
    name = "lifevault",
    author = "Kaylee Beyene",
    version,
    about = "Versioned backup and restore for your personal data",
    long_about = "lifevault exports goals, habits, journal entries and settings into a \
                  portable snapshot, and restores snapshots written by any earlier \
                  release, migrating them to the current schema."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Export all non-secret data as a snapshot
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Restore a snapshot (use 'latest' for the most recent backup)
    Restore {
        /// Backup filename or path
        backup: String,

        /// Actually restore; without it the backup is only inspected
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a snapshot and show its contents without restoring
    Inspect {
        /// Backup filename or path
        backup: String,
    },

    /// Rolling backup management
    #[command(subcommand)]
    Backup(BackupCommands),

    /// List registered domains and check that every stored domain is covered
    Registry,

    /// Show current configuration and paths
    Config,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let paths = VaultPaths::new()?;
    let config = VaultConfig::load_or_create(&paths)?;

    let Some(command) = cli.command else {
        println!("lifevault - versioned backup and restore");
        println!();
        println!("Run 'lifevault --help' for usage information.");
        return Ok(());
    };

    let vault = Vault::open(&paths)?;

    match command {
        Commands::Export { output, compact } => {
            handle_export_command(&vault, &config, output, compact)?;
        }
        Commands::Restore { backup, force } => {
            if let Some(report) = handle_restore_command(&vault, &paths, &config, &backup, force)? {
                if !report.overall_success {
                    bail!("no domain could be restored");
                }
            }
        }
        Commands::Inspect { backup } => {
            handle_inspect_command(&vault, &paths, &config, &backup)?;
        }
        Commands::Backup(cmd) => {
            handle_backup_command(vault.store().clone(), &paths, &config, cmd)?;
        }
        Commands::Registry => {
            handle_registry_command(vault.store())?;
        }
        Commands::Config => {
            println!("lifevault Configuration");
            println!("=======================");
            println!(
                "Base directory:   {} ({})",
                paths.base_dir().display(),
                paths.source()
            );
            println!("Data directory:   {}", paths.data_dir().display());
            println!("Backup directory: {}", paths.backup_dir().display());
            println!("Config file:      {}", paths.config_file().display());
            println!();
            println!("Schema version:   {}", vault.current_schema_version());
            println!(
                "Build:            {} ({})",
                vault.build_info().app_version,
                vault.build_info().build_id
            );
            println!(
                "Retention:        {} daily, {} monthly",
                config.backup_retention.daily_count, config.backup_retention.monthly_count
            );
            println!("Pretty exports:   {}", config.pretty_exports);
            println!("Backup before restore: {}", config.backup_before_restore);
        }
    }

    Ok(())
}
