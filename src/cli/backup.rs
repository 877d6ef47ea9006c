//! `lifevault backup ...`: rolling snapshot management

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::Subcommand;

use crate::backup::{BackupInfo, BackupManager};
use crate::config::paths::VaultPaths;
use crate::config::settings::{BackupRetention, VaultConfig};
use crate::config::BuildInfo;
use crate::error::{VaultError, VaultResult};
use crate::storage::Store;

#[derive(Subcommand, Debug)]
pub enum BackupCommands {
    /// Snapshot current data into the backup directory
    Create,

    /// List backups, newest first
    List {
        /// Show full timestamps and paths
        #[arg(short, long)]
        verbose: bool,
    },

    /// Delete backups beyond the retention policy
    Prune {
        /// Delete instead of only reporting
        #[arg(short, long)]
        force: bool,
    },
}

pub fn handle_backup_command(
    store: Arc<Store>,
    paths: &VaultPaths,
    config: &VaultConfig,
    cmd: BackupCommands,
) -> VaultResult<()> {
    let retention = &config.backup_retention;
    let manager = BackupManager::new(store, paths, retention.clone(), BuildInfo::current());

    match cmd {
        BackupCommands::Create => create(&manager),
        BackupCommands::List { verbose } => list(&manager, verbose),
        BackupCommands::Prune { force } => prune(&manager, retention, force),
    }
}

fn create(manager: &BackupManager) -> VaultResult<()> {
    let (path, pruned) = manager.create_backup_with_retention()?;
    println!("Backup created: {}", display_name(&path));
    println!("  in {}", manager.backup_dir().display());
    if !pruned.is_empty() {
        println!("Removed {} expired backup(s).", pruned.len());
    }
    Ok(())
}

fn list(manager: &BackupManager, verbose: bool) -> VaultResult<()> {
    let backups = manager.list_backups()?;
    if backups.is_empty() {
        println!("No backups in {}.", manager.backup_dir().display());
        println!("Take one with: lifevault backup create");
        return Ok(());
    }

    let now = Utc::now();
    for backup in &backups {
        let tag = if backup.is_monthly { "monthly" } else { "daily" };
        if verbose {
            println!(
                "{}  {:>9}  {:<7}  {}",
                backup.created_at.format("%Y-%m-%d %H:%M:%S%.3f"),
                human_size(backup.size_bytes),
                tag,
                backup.path.display()
            );
        } else {
            println!(
                "{:<36} {:>6} ago  {:>9}  {}",
                backup.filename,
                age(backup.created_at, now),
                human_size(backup.size_bytes),
                tag
            );
        }
    }
    println!();
    println!("Total: {} backup(s)", backups.len());
    Ok(())
}

fn prune(manager: &BackupManager, retention: &BackupRetention, force: bool) -> VaultResult<()> {
    let backups = manager.list_backups()?;
    let expired = expired_count(&backups, retention);

    println!(
        "Retention: keep {} daily and {} monthly backup(s).",
        retention.daily_count, retention.monthly_count
    );
    if expired == 0 {
        println!("Nothing to prune.");
        return Ok(());
    }

    if !force {
        println!("{} backup(s) would be deleted. Re-run with --force to delete them.", expired);
        return Ok(());
    }

    let deleted = manager.enforce_retention()?;
    println!("Deleted {} backup(s).", deleted.len());
    Ok(())
}

fn expired_count(backups: &[BackupInfo], retention: &BackupRetention) -> usize {
    let monthly = backups.iter().filter(|b| b.is_monthly).count();
    let daily = backups.len() - monthly;
    daily.saturating_sub(retention.daily_count as usize)
        + monthly.saturating_sub(retention.monthly_count as usize)
}

/// Turn `latest`, a path, or a backup filename (with or without `.json`)
/// into an existing file
pub fn resolve_backup_path(
    manager: &BackupManager,
    paths: &VaultPaths,
    backup: &str,
) -> VaultResult<PathBuf> {
    if backup.eq_ignore_ascii_case("latest") {
        return manager
            .get_latest_backup()?
            .map(|b| b.path)
            .ok_or_else(|| VaultError::backup_not_found("latest"));
    }

    let candidates = [
        PathBuf::from(backup),
        paths.backup_dir().join(backup),
        paths.backup_dir().join(format!("{}.json", backup)),
    ];
    candidates
        .into_iter()
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| VaultError::backup_not_found(backup))
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Coarsest whole unit: s, m, h, d, then 30-day months
fn age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = now.signed_duration_since(then).num_seconds().max(0);
    const UNITS: [(i64, &str); 4] = [(30 * 86_400, "mo"), (86_400, "d"), (3_600, "h"), (60, "m")];

    UNITS
        .iter()
        .find(|(size, _)| seconds >= *size)
        .map(|(size, suffix)| format!("{}{}", seconds / size, suffix))
        .unwrap_or_else(|| format!("{}s", seconds))
}

fn human_size(bytes: u64) -> String {
    match bytes {
        b if b >= 1 << 20 => format!("{:.1} MB", b as f64 / (1u64 << 20) as f64),
        b if b >= 1 << 10 => format!("{:.1} KB", b as f64 / (1u64 << 10) as f64),
        b => format!("{} B", b),
    }
}
