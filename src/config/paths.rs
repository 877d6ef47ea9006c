//! Where lifevault keeps its files
//!
//! Everything lives under one base directory:
//!
//! ```text
//! <base>/
//!   config.json     engine preferences
//!   data/           one <domain>.json per registered domain
//!   backups/        rolling snapshots
//! ```
//!
//! The base is `$LIFEVAULT_DATA_DIR` when set, otherwise the platform config
//! directory (`$XDG_CONFIG_HOME/lifevault`, `~/.config/lifevault`, or
//! `%APPDATA%\lifevault`).

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::VaultError;

pub const DATA_DIR_ENV: &str = "LIFEVAULT_DATA_DIR";
const APP_DIR: &str = "lifevault";

/// How the base directory was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSource {
    Environment,
    PlatformDefault,
    Explicit,
}

impl fmt::Display for PathSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Environment => write!(f, "{}", DATA_DIR_ENV),
            Self::PlatformDefault => write!(f, "platform default"),
            Self::Explicit => write!(f, "explicit"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VaultPaths {
    base_dir: PathBuf,
    source: PathSource,
}

impl VaultPaths {
    /// Resolve the base directory from the process environment
    pub fn new() -> Result<Self, VaultError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve using an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, VaultError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(custom) = lookup(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self {
                base_dir: PathBuf::from(custom),
                source: PathSource::Environment,
            });
        }

        Ok(Self {
            base_dir: platform_base(&lookup)?,
            source: PathSource::PlatformDefault,
        })
    }

    /// Use a fixed base directory (tests, embedding)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            source: PathSource::Explicit,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn source(&self) -> PathSource {
        self.source
    }

    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.base_dir.join("backups")
    }

    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Create the base, data and backup directories
    pub fn ensure_directories(&self) -> Result<(), VaultError> {
        for dir in [self.base_dir.clone(), self.data_dir(), self.backup_dir()] {
            fs::create_dir_all(&dir).map_err(|e| {
                VaultError::Io(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }
}

#[cfg(not(windows))]
fn platform_base<F: Fn(&str) -> Option<String>>(lookup: &F) -> Result<PathBuf, VaultError> {
    if let Some(config_home) = lookup("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(config_home).join(APP_DIR));
    }
    lookup("HOME")
        .map(|home| PathBuf::from(home).join(".config").join(APP_DIR))
        .ok_or_else(|| VaultError::Config("HOME is not set; set LIFEVAULT_DATA_DIR".into()))
}

#[cfg(windows)]
fn platform_base<F: Fn(&str) -> Option<String>>(lookup: &F) -> Result<PathBuf, VaultError> {
    lookup("APPDATA")
        .map(|appdata| PathBuf::from(appdata).join(APP_DIR))
        .ok_or_else(|| VaultError::Config("APPDATA is not set; set LIFEVAULT_DATA_DIR".into()))
}
