//! CLI commands for snapshot export, restore and inspection

use std::path::{Path, PathBuf};

use crate::backup::{BackupInspection, BackupManager, RestoreReport};
use crate::config::paths::VaultPaths;
use crate::config::settings::VaultConfig;
use crate::engine::Vault;
use crate::error::VaultResult;

use super::backup::{display_name, resolve_backup_path};

/// Export every non-secret domain, to a file or stdout
pub fn handle_export_command(
    vault: &Vault,
    config: &VaultConfig,
    output: Option<PathBuf>,
    compact: bool,
) -> VaultResult<()> {
    let pretty = config.pretty_exports && !compact;

    match output {
        Some(path) => {
            let snapshot = vault.export_to_file(&path, pretty)?;
            println!(
                "Exported {} domain(s) at schema version {} to: {}",
                snapshot.domains.len(),
                snapshot.schema_version,
                path.display()
            );
        }
        None => {
            println!("{}", vault.export_to_string(pretty)?);
        }
    }

    Ok(())
}

/// Show what a backup contains without touching any data
pub fn handle_inspect_command(
    vault: &Vault,
    paths: &VaultPaths,
    config: &VaultConfig,
    backup: &str,
) -> VaultResult<()> {
    let manager = backup_manager(vault, paths, config);
    let path = resolve_backup_path(&manager, paths, backup)?;
    let inspection = vault.inspect_file(&path)?;
    print_inspection(&path, &inspection);
    Ok(())
}

/// Restore a backup
///
/// Without `force` this only inspects. Returns the report when a restore ran.
pub fn handle_restore_command(
    vault: &Vault,
    paths: &VaultPaths,
    config: &VaultConfig,
    backup: &str,
    force: bool,
) -> VaultResult<Option<RestoreReport>> {
    let manager = backup_manager(vault, paths, config);
    let path = resolve_backup_path(&manager, paths, backup)?;

    let inspection = vault.inspect_file(&path)?;
    print_inspection(&path, &inspection);
    println!();

    if !force {
        println!("WARNING: Domains in this backup will replace your current data.");
        println!("To proceed, run again with --force flag:");
        println!("  lifevault restore {} --force", backup);
        return Ok(None);
    }

    if config.backup_before_restore {
        println!("Creating backup of current data before restore...");
        let pre_restore = manager.create_backup()?;
        println!("Pre-restore backup saved: {}", display_name(&pre_restore));
        println!();
    }

    let auto_backup = vault.attach_auto_backup(manager);

    println!("Restoring from backup...");
    let report = vault.restore_from_file(&path)?;

    for result in &report.per_domain {
        match &result.error_message {
            None => println!("  ok      {:<18} {} item(s)", result.domain.as_str(), result.item_count),
            Some(message) => println!("  FAILED  {:<18} {}", result.domain.as_str(), message),
        }
    }
    for name in &report.skipped {
        println!("  skipped {}", name);
    }
    println!();
    println!("{}", report.summary());

    match auto_backup.run_pending() {
        Ok(Some(saved)) => println!("Auto-backup saved: {}", display_name(&saved)),
        Ok(None) => {}
        Err(err) => tracing::warn!("auto-backup after restore failed: {}", err),
    }

    Ok(Some(report))
}

fn backup_manager(vault: &Vault, paths: &VaultPaths, config: &VaultConfig) -> BackupManager {
    BackupManager::new(
        vault.store().clone(),
        paths,
        config.backup_retention.clone(),
        vault.build_info().clone(),
    )
}

fn print_inspection(path: &Path, inspection: &BackupInspection) {
    println!("Backup Information");
    println!("==================");
    println!("File: {}", path.display());
    if let Some(date) = &inspection.export_date {
        println!("Exported: {}", date);
    }
    if let Some(version) = &inspection.app_version {
        println!(
            "App version: {} (build {})",
            version,
            inspection.build_id.as_deref().unwrap_or("unknown")
        );
    }
    if inspection.legacy {
        println!("Format: legacy (pre-versioning)");
    }
    println!(
        "Schema version: {}{}",
        inspection.source_version,
        if inspection.needs_migration {
            format!(" (will migrate to {})", inspection.target_version)
        } else {
            String::new()
        }
    );
    println!();
    println!("Contents:");
    for (domain, count) in &inspection.domains {
        println!("  {:<18} {} item(s)", domain, count);
    }
    for name in &inspection.undecodable {
        println!("  {:<18} unreadable, will fail", name);
    }
    for name in &inspection.skipped {
        println!("  {:<18} not recognized, will be skipped", name);
    }
}
