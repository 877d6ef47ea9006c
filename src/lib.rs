//! lifevault - versioned backup, restore and schema migration for a
//! personal-data app
//!
//! Every persisted domain (goals, habits, journal entries, settings, ...)
//! can be exported into a portable snapshot and restored later, even by a
//! newer release with a different schema. Secret domains never leave the
//! device.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration, path management and build metadata
//! - `error`: Custom error types
//! - `registry`: The closed set of persisted domains
//! - `notifier`: Post-write listener fan-out
//! - `storage`: Key-value backends, generation tracking, typed repositories
//! - `models`: Typed schemas for the current version
//! - `schema`: Envelope field names and structural validation
//! - `migration`: Legacy conversion and version-by-version steps
//! - `backup`: Export, restore, rolling backups
//! - `engine`: The [`Vault`] facade
//!
//! # Example
//!
//! ```rust,ignore
//! use lifevault::{config::VaultPaths, Vault};
//!
//! let vault = Vault::open(&VaultPaths::new()?)?;
//! let snapshot = vault.export()?;
//! let report = vault.restore_snapshot(&snapshot)?;
//! println!("{}", report.summary());
//! ```

pub mod backup;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod migration;
pub mod models;
pub mod notifier;
pub mod registry;
pub mod schema;
pub mod storage;

pub use engine::Vault;
pub use error::{VaultError, VaultResult};
pub use migration::{current_schema_version, CURRENT_SCHEMA_VERSION};
pub use registry::DomainKey;
