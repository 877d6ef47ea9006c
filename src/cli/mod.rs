//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the backup engine.

pub mod backup;
pub mod registry;
pub mod transfer;

pub use backup::{handle_backup_command, BackupCommands};
pub use registry::handle_registry_command;
pub use transfer::{handle_export_command, handle_inspect_command, handle_restore_command};
