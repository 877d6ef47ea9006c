//! Backup system for lifevault
//!
//! Portable snapshots, restore with schema migration, and automatic rolling
//! backups with configurable retention.
//!
//! # Architecture
//!
//! - `Exporter`: captures every exportable domain into a [`Snapshot`]
//! - `RestoreManager`: validates, migrates and imports a snapshot
//! - `BackupManager`: writes dated snapshots and prunes old ones
//! - `AutoBackupTrigger`: notifier listener that tells the manager when
//!   something changed
//!
//! # Snapshot Format
//!
//! A JSON object with `schemaVersion`, `exportDate`, `appVersion`, `buildId`,
//! `statistics`, and `domains`, where each domain payload is a JSON-encoded
//! string. Secret domains and redacted settings fields never appear.
//!
//! # Retention Policy
//!
//! By default, the system keeps:
//! - 30 daily backups
//! - 12 monthly backups (first backup of each month)
//!
//! # Example
//!
//! ```rust,ignore
//! use lifevault::backup::{Exporter, RestoreManager};
//!
//! let snapshot = Exporter::new(store.clone(), BuildInfo::current()).export()?;
//! let report = RestoreManager::new(store).restore_snapshot(&snapshot)?;
//! println!("{}", report.summary());
//! ```

mod export;
mod manager;
mod restore;
mod snapshot;

pub use export::Exporter;
pub use manager::{AutoBackup, AutoBackupTrigger, BackupInfo, BackupManager};
pub use restore::{BackupInspection, ImportItemResult, RestoreManager, RestoreReport, RestoreStatus};
pub use snapshot::{decode_domains, Snapshot};
