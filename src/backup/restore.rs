//! Backup restoration
//!
//! A restore runs in two phases. Preparation (loose validation, legacy
//! conversion, domain decoding, version check, migration, strict validation)
//! either succeeds as a whole or fails before anything is written. Import
//! then writes each domain independently and records a per-domain outcome,
//! so one bad domain never blocks the others.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::snapshot::{decode_domains, Snapshot};
use crate::error::{VaultError, VaultResult};
use crate::migration::{is_legacy_format, migrate_legacy, MigrationPipeline};
use crate::models::{self, settings::merge_preserving_local};
use crate::registry::DomainKey;
use crate::schema::{
    check_structure, schema_version_of, validate_import_file, APP_VERSION_FIELD, BUILD_ID_FIELD,
    DOMAINS_FIELD, EXPORT_DATE_FIELD, SCHEMA_VERSION_FIELD,
};
use crate::storage::Store;

/// Outcome of importing one domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportItemResult {
    pub domain: DomainKey,
    pub success: bool,
    pub item_count: u64,
    pub error_message: Option<String>,
}

impl ImportItemResult {
    fn succeeded(domain: DomainKey, item_count: u64) -> Self {
        Self {
            domain,
            success: true,
            item_count,
            error_message: None,
        }
    }

    fn failed(domain: DomainKey, message: impl Into<String>) -> Self {
        Self {
            domain,
            success: false,
            item_count: 0,
            error_message: Some(message.into()),
        }
    }
}

/// Coarse outcome of a restore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStatus {
    /// Every domain in the backup was restored
    Full,
    /// Some domains were restored, some failed
    Partial,
    /// Nothing was restored
    Nothing,
}

impl fmt::Display for RestoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Partial => write!(f, "partial"),
            Self::Nothing => write!(f, "nothing restored"),
        }
    }
}

/// Aggregate result of a restore
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestoreReport {
    /// At least one domain was restored
    pub overall_success: bool,
    /// Some domains were restored and at least one failed
    pub partial_failure: bool,
    pub per_domain: Vec<ImportItemResult>,
    /// Item count per restored domain
    pub statistics: BTreeMap<String, u64>,
    /// Schema version the backup was written at (0 for legacy exports)
    pub source_version: u32,
    pub migrated: bool,
    pub legacy: bool,
    /// Snapshot keys that were ignored: unregistered names or secret domains
    pub skipped: Vec<String>,
}

impl RestoreReport {
    pub fn status(&self) -> RestoreStatus {
        if !self.overall_success {
            RestoreStatus::Nothing
        } else if self.partial_failure {
            RestoreStatus::Partial
        } else {
            RestoreStatus::Full
        }
    }

    pub fn restored(&self) -> impl Iterator<Item = &ImportItemResult> {
        self.per_domain.iter().filter(|r| r.success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ImportItemResult> {
        self.per_domain.iter().filter(|r| !r.success)
    }

    /// One-line human readable summary
    pub fn summary(&self) -> String {
        let restored: Vec<&str> = self.restored().map(|r| r.domain.as_str()).collect();
        let failed: Vec<&str> = self.failures().map(|r| r.domain.as_str()).collect();

        match self.status() {
            RestoreStatus::Full if restored.is_empty() => {
                "Backup contained no domains to restore".to_string()
            }
            RestoreStatus::Full => format!("Restored: {}", restored.join(", ")),
            RestoreStatus::Partial => format!(
                "Partially restored: {} (failed: {})",
                restored.join(", "),
                failed.join(", ")
            ),
            RestoreStatus::Nothing => format!("Nothing restored (failed: {})", failed.join(", ")),
        }
    }

    fn finish(&mut self) {
        let any_failed = self.per_domain.iter().any(|r| !r.success);
        self.overall_success =
            self.per_domain.iter().any(|r| r.success) || self.per_domain.is_empty();
        self.partial_failure = self.overall_success && any_failed;
    }
}

/// Dry-run view of a backup file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupInspection {
    pub legacy: bool,
    pub source_version: u32,
    pub target_version: u32,
    pub needs_migration: bool,
    pub export_date: Option<String>,
    pub app_version: Option<String>,
    pub build_id: Option<String>,
    /// Item count per importable domain, after migration
    pub domains: BTreeMap<String, u64>,
    pub undecodable: Vec<String>,
    pub skipped: Vec<String>,
}

/// Envelope that passed every pre-write check
struct Prepared {
    envelope: Value,
    source_version: u32,
    legacy: bool,
    migrated: bool,
    undecodable: Vec<(String, String)>,
}

/// Handles restoring from snapshots
pub struct RestoreManager {
    store: Arc<Store>,
    pipeline: MigrationPipeline,
}

impl RestoreManager {
    pub fn new(store: Arc<Store>) -> Self {
        Self::with_pipeline(store, MigrationPipeline::standard())
    }

    pub fn with_pipeline(store: Arc<Store>, pipeline: MigrationPipeline) -> Self {
        Self { store, pipeline }
    }

    pub fn target_version(&self) -> u32 {
        self.pipeline.current_version()
    }

    /// Restore from a raw backup document
    ///
    /// Domains present in the backup replace the stored copy; domains the
    /// backup does not mention are left untouched.
    pub fn restore(&self, raw: &Value) -> VaultResult<RestoreReport> {
        let prepared = self.prepare(raw)?;
        Ok(self.import(prepared))
    }

    pub fn restore_str(&self, text: &str) -> VaultResult<RestoreReport> {
        self.restore(&parse_backup(text)?)
    }

    pub fn restore_from_file(&self, path: &Path) -> VaultResult<RestoreReport> {
        self.restore(&read_backup(path)?)
    }

    pub fn restore_snapshot(&self, snapshot: &Snapshot) -> VaultResult<RestoreReport> {
        self.restore(&snapshot.to_value()?)
    }

    /// Run every pre-write check and describe what a restore would import
    pub fn inspect(&self, raw: &Value) -> VaultResult<BackupInspection> {
        let prepared = self.prepare(raw)?;
        let envelope = &prepared.envelope;
        let text_field = |field: &str| envelope.get(field).and_then(Value::as_str).map(String::from);

        let mut domains = BTreeMap::new();
        let mut skipped = Vec::new();
        for (name, payload) in domain_entries(envelope) {
            match importable_key(name) {
                Some(key) => {
                    domains.insert(key.as_str().to_string(), models::item_count(payload));
                }
                None => skipped.push(name.clone()),
            }
        }

        Ok(BackupInspection {
            legacy: prepared.legacy,
            source_version: prepared.source_version,
            target_version: self.target_version(),
            needs_migration: prepared.migrated,
            export_date: text_field(EXPORT_DATE_FIELD),
            app_version: text_field(APP_VERSION_FIELD),
            build_id: text_field(BUILD_ID_FIELD),
            domains,
            undecodable: prepared.undecodable.into_iter().map(|(name, _)| name).collect(),
            skipped,
        })
    }

    pub fn inspect_file(&self, path: &Path) -> VaultResult<BackupInspection> {
        self.inspect(&read_backup(path)?)
    }

    /// Everything up to strict validation; performs no writes
    fn prepare(&self, raw: &Value) -> VaultResult<Prepared> {
        if !validate_import_file(raw) {
            return Err(VaultError::Structural(
                "expected a JSON object with a domains object, or a legacy export".to_string(),
            ));
        }

        let legacy = is_legacy_format(raw);
        let mut envelope = if legacy {
            tracing::info!("converting legacy export");
            migrate_legacy(raw)?
        } else {
            raw.clone()
        };

        let undecodable = decode_domains(&mut envelope);

        let import_version = schema_version_of(&envelope)
            .map_err(VaultError::Structural)?
            .unwrap_or(1);
        let current = self.target_version();
        if import_version > current {
            return Err(VaultError::VersionTooNew {
                found: import_version,
                current,
            });
        }
        if let Some(object) = envelope.as_object_mut() {
            object
                .entry(SCHEMA_VERSION_FIELD)
                .or_insert_with(|| Value::from(import_version));
        }

        let migrated = legacy || import_version < current;
        if import_version < current {
            envelope = self.pipeline.migrate(envelope, import_version, current)?;
        }

        check_structure(&envelope, current).map_err(VaultError::Validation)?;

        Ok(Prepared {
            envelope,
            source_version: if legacy { 0 } else { import_version },
            legacy,
            migrated,
            undecodable,
        })
    }

    fn import(&self, prepared: Prepared) -> RestoreReport {
        let mut report = RestoreReport {
            source_version: prepared.source_version,
            migrated: prepared.migrated,
            legacy: prepared.legacy,
            ..RestoreReport::default()
        };

        tracing::info!(
            source_version = report.source_version,
            legacy = report.legacy,
            migrated = report.migrated,
            "restoring backup"
        );

        let mut pending: Vec<(String, Result<Value, String>)> = domain_entries(&prepared.envelope)
            .map(|(name, payload)| (name.clone(), Ok(payload.clone())))
            .collect();
        pending.extend(
            prepared
                .undecodable
                .into_iter()
                .map(|(name, reason)| (name, Err(reason))),
        );
        pending.sort_by(|a, b| a.0.cmp(&b.0));

        for (name, payload) in pending {
            let Some(key) = importable_key(&name) else {
                tracing::warn!(domain = %name, "skipping unregistered or secret domain");
                report.skipped.push(name);
                continue;
            };

            let result = match payload {
                Ok(payload) => match self.import_domain(key, payload) {
                    Ok(count) => {
                        report.statistics.insert(key.as_str().to_string(), count);
                        ImportItemResult::succeeded(key, count)
                    }
                    Err(err) => ImportItemResult::failed(key, err.to_string()),
                },
                Err(reason) => ImportItemResult::failed(
                    key,
                    VaultError::DomainImport { domain: key, reason }.to_string(),
                ),
            };

            if let Some(message) = &result.error_message {
                tracing::warn!(domain = %key, "domain import failed: {}", message);
            }
            report.per_domain.push(result);
        }

        report.finish();
        tracing::info!(status = %report.status(), "restore finished");
        report
    }

    fn import_domain(&self, key: DomainKey, payload: Value) -> VaultResult<u64> {
        let count = models::check_payload(key, &payload).map_err(|reason| {
            VaultError::DomainImport {
                domain: key,
                reason,
            }
        })?;

        let payload = if key.merges_on_restore() {
            let local = self.store.read(key)?;
            merge_preserving_local(key, &payload, local.as_ref())
        } else {
            payload
        };

        self.store.write(key, &payload)?;
        Ok(count)
    }
}

/// Registered, non-secret key for a snapshot name
fn importable_key(name: &str) -> Option<DomainKey> {
    name.parse::<DomainKey>().ok().filter(|key| !key.is_secret())
}

fn domain_entries(envelope: &Value) -> impl Iterator<Item = (&String, &Value)> {
    envelope
        .get(DOMAINS_FIELD)
        .and_then(Value::as_object)
        .map(Map::iter)
        .into_iter()
        .flatten()
}

fn parse_backup(text: &str) -> VaultResult<Value> {
    serde_json::from_str(text)
        .map_err(|e| VaultError::Structural(format!("backup is not valid JSON: {}", e)))
}

fn read_backup(path: &Path) -> VaultResult<Value> {
    let contents = fs::read_to_string(path)
        .map_err(|e| VaultError::Io(format!("Failed to read backup file: {}", e)))?;
    parse_backup(&contents)
}
