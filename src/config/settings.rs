//! Engine configuration
//!
//! Preferences for the backup engine itself, stored in `config.json`. These
//! are not part of the user's dataset and are never exported.

use serde::{Deserialize, Serialize};

use super::paths::VaultPaths;
use crate::error::VaultError;
use crate::storage::file_io::{read_json_optional, write_json_atomic};

/// How many dated backups survive pruning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRetention {
    pub daily_count: u32,
    /// Backups taken on the 1st of a month have their own quota
    pub monthly_count: u32,
}

impl Default for BackupRetention {
    fn default() -> Self {
        BackupRetention {
            daily_count: 30,
            monthly_count: 12,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    #[serde(default)]
    pub backup_retention: BackupRetention,

    /// Pretty-print exported snapshots
    #[serde(default = "default_pretty_exports")]
    pub pretty_exports: bool,

    /// Take a backup of current data before every CLI restore
    #[serde(default = "default_backup_before_restore")]
    pub backup_before_restore: bool,
}

fn default_pretty_exports() -> bool {
    true
}

fn default_backup_before_restore() -> bool {
    true
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            backup_retention: BackupRetention::default(),
            pretty_exports: default_pretty_exports(),
            backup_before_restore: default_backup_before_restore(),
        }
    }
}

impl VaultConfig {
    /// Read `config.json`; a missing file yields the defaults without writing one
    pub fn load_or_create(paths: &VaultPaths) -> Result<Self, VaultError> {
        let loaded = read_json_optional(paths.config_file()).map_err(|e| {
            VaultError::Config(format!("{}: {}", paths.config_file().display(), e))
        })?;
        Ok(loaded.unwrap_or_default())
    }

    pub fn save(&self, paths: &VaultPaths) -> Result<(), VaultError> {
        paths.ensure_directories()?;
        write_json_atomic(paths.config_file(), self, true)
    }
}
