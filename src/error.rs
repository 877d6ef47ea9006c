//! Error types shared by the store, migration pipeline and restore engine

use thiserror::Error;

use crate::registry::DomainKey;

/// Every fallible vault operation returns this
#[derive(Error, Debug)]
pub enum VaultError {
    /// Raw input is not a plausible export of this app
    #[error("Not a valid backup file: {0}")]
    Structural(String),

    /// The pre-versioning export could not be converted
    #[error("Legacy backup could not be migrated: {0}")]
    LegacyMigration(String),

    /// Backup was produced by a newer release
    #[error("Backup is from a newer version (schema {found}, this app supports {current}); update the app to restore it")]
    VersionTooNew { found: u32, current: u32 },

    /// A migration step failed
    #[error("Migration from schema {from} to {to} failed: {reason}")]
    Migration { from: u32, to: u32, reason: String },

    /// Post-migration structure does not match the current schema
    #[error("Validation error: {0}")]
    Validation(String),

    /// One domain's payload could not be imported
    #[error("Failed to import '{domain}': {reason}")]
    DomainImport { domain: DomainKey, reason: String },

    /// A cached copy tried to overwrite newer data
    #[error("Stale write to '{domain}' rejected: cache is at generation {expected}, store is at {actual}; reload first")]
    StaleWrite {
        domain: DomainKey,
        expected: u64,
        actual: u64,
    },

    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem failure outside the storage backend
    #[error("I/O error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),

    /// Backend read or write failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl VaultError {
    pub fn backup_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Backup",
            identifier: identifier.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_version_too_new(&self) -> bool {
        matches!(self, Self::VersionTooNew { .. })
    }

    pub fn is_stale_write(&self) -> bool {
        matches!(self, Self::StaleWrite { .. })
    }

    /// Whether this error rejects a restore before anything is written
    pub fn aborts_restore(&self) -> bool {
        matches!(
            self,
            Self::Structural(_)
                | Self::LegacyMigration(_)
                | Self::VersionTooNew { .. }
                | Self::Migration { .. }
                | Self::Validation(_)
        )
    }
}

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Error returned by a persistence listener
///
/// Never reaches the writer; the notifier logs and drops it.
#[derive(Error, Debug)]
#[error("Listener failed: {0}")]
pub struct ListenerError(pub String);

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Result type alias for lifevault operations
pub type VaultResult<T> = Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VaultError::Config("test error".into());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_not_found_error() {
        let err = VaultError::backup_not_found("latest");
        assert_eq!(err.to_string(), "Backup not found: latest");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_version_too_new_error() {
        let err = VaultError::VersionTooNew {
            found: 4,
            current: 3,
        };
        assert!(err.is_version_too_new());
        assert!(err.aborts_restore());
        assert!(err.to_string().contains("update the app"));
    }

    #[test]
    fn test_migration_error_names_hop() {
        let err = VaultError::Migration {
            from: 1,
            to: 2,
            reason: "habits is not an array".into(),
        };
        assert_eq!(
            err.to_string(),
            "Migration from schema 1 to 2 failed: habits is not an array"
        );
    }

    #[test]
    fn test_domain_import_does_not_abort() {
        let err = VaultError::DomainImport {
            domain: DomainKey::Goals,
            reason: "bad".into(),
        };
        assert!(!err.aborts_restore());
        assert_eq!(err.to_string(), "Failed to import 'goals': bad");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let vault_err: VaultError = io_err.into();
        assert!(matches!(vault_err, VaultError::Io(_)));
    }
}
