//! Schema migration
//!
//! Converts backup data from any historical format up to the current schema
//! version. Versions 1 and later are chained single-hop [`MigrationStep`]s;
//! the pre-versioning legacy shape (version 0) gets one larger conversion of
//! its own.
//!
//! # Adding a schema version
//!
//! Bump [`CURRENT_SCHEMA_VERSION`] and append exactly one step to
//! `steps::all()`. Older shapes are never modeled as types; steps work on
//! untyped JSON.

mod legacy;
mod pipeline;
mod steps;

pub use crate::schema::is_legacy_format;
pub use legacy::migrate_legacy;
pub use pipeline::{MigrationPipeline, MigrationStep, Transform};

use serde_json::Value;
use thiserror::Error;

use crate::error::VaultError;

/// Schema version written by this build
pub const CURRENT_SCHEMA_VERSION: u32 = 3;

pub fn current_schema_version() -> u32 {
    CURRENT_SCHEMA_VERSION
}

/// Migrate with the standard step list
pub fn migrate(data: Value, from_version: u32, to_version: u32) -> Result<Value, MigrationError> {
    MigrationPipeline::standard().migrate(data, from_version, to_version)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MigrationError {
    /// No downgrade transforms exist
    #[error("backup schema {from} is newer than target schema {to}")]
    NewerVersion { from: u32, to: u32 },

    #[error("step {from} -> {to} failed: {reason}")]
    StepFailed { from: u32, to: u32, reason: String },

    #[error("no migration step registered from schema {from}")]
    MissingStep { from: u32 },

    #[error("invalid legacy export: {0}")]
    InvalidLegacy(String),

    #[error("invalid migration pipeline: {0}")]
    InvalidPipeline(String),
}

impl From<MigrationError> for VaultError {
    fn from(err: MigrationError) -> Self {
        match err {
            MigrationError::NewerVersion { from, to } => VaultError::VersionTooNew {
                found: from,
                current: to,
            },
            MigrationError::StepFailed { from, to, reason } => {
                VaultError::Migration { from, to, reason }
            }
            MigrationError::MissingStep { from } => VaultError::Migration {
                from,
                to: from + 1,
                reason: "no migration step registered".to_string(),
            },
            MigrationError::InvalidLegacy(reason) => VaultError::LegacyMigration(reason),
            MigrationError::InvalidPipeline(reason) => VaultError::Config(reason),
        }
    }
}
