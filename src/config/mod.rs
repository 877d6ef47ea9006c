//! Configuration module for lifevault
//!
//! This module provides configuration management including:
//! - XDG-compliant path resolution
//! - Engine preferences (backup retention, export formatting)
//! - Build metadata stamped into every export

pub mod build_info;
pub mod paths;
pub mod settings;

pub use build_info::BuildInfo;
pub use paths::VaultPaths;
pub use settings::{BackupRetention, VaultConfig};
