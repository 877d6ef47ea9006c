//! Snapshot export
//!
//! Reads every exportable domain from the store into a [`Snapshot`] stamped
//! with the current schema version and build metadata. Secret domains are
//! never read; redacted settings fields are stripped before encoding.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;

use super::snapshot::Snapshot;
use crate::config::BuildInfo;
use crate::error::{VaultError, VaultResult};
use crate::migration::CURRENT_SCHEMA_VERSION;
use crate::models::{item_count, settings::redact};
use crate::registry::exportable_keys;
use crate::storage::{write_json_atomic, Store};

pub struct Exporter {
    store: Arc<Store>,
    build_info: BuildInfo,
}

impl Exporter {
    pub fn new(store: Arc<Store>, build_info: BuildInfo) -> Self {
        Self { store, build_info }
    }

    pub fn build_info(&self) -> &BuildInfo {
        &self.build_info
    }

    /// Capture the current state of every exportable domain
    pub fn export(&self) -> VaultResult<Snapshot> {
        let mut domains = BTreeMap::new();
        let mut statistics = BTreeMap::new();

        for key in exportable_keys() {
            let Some(mut payload) = self.store.read(key)? else {
                continue;
            };
            redact(key, &mut payload);

            let encoded = serde_json::to_string(&payload).map_err(|e| {
                VaultError::Json(format!("Failed to encode {}: {}", key, e))
            })?;
            statistics.insert(key.as_str().to_string(), item_count(&payload));
            domains.insert(key, encoded);
        }

        tracing::info!(domains = domains.len(), "exported snapshot");

        Ok(Snapshot {
            schema_version: CURRENT_SCHEMA_VERSION,
            export_date: Utc::now(),
            app_version: self.build_info.app_version.clone(),
            build_id: self.build_info.build_id.clone(),
            domains,
            statistics,
        })
    }

    /// Export to any writer
    pub fn export_to_writer<W: Write>(&self, writer: W, pretty: bool) -> VaultResult<Snapshot> {
        let snapshot = self.export()?;
        if pretty {
            serde_json::to_writer_pretty(writer, &snapshot)
        } else {
            serde_json::to_writer(writer, &snapshot)
        }
        .map_err(|e| VaultError::Json(format!("Failed to write snapshot: {}", e)))?;
        Ok(snapshot)
    }

    pub fn export_to_string(&self, pretty: bool) -> VaultResult<String> {
        let mut buffer = Vec::new();
        self.export_to_writer(&mut buffer, pretty)?;
        String::from_utf8(buffer)
            .map_err(|e| VaultError::Json(format!("Snapshot is not valid UTF-8: {}", e)))
    }

    /// Export to a file, replacing it atomically
    pub fn export_to_file<P: AsRef<Path>>(&self, path: P, pretty: bool) -> VaultResult<Snapshot> {
        let snapshot = self.export()?;
        write_json_atomic(path, &snapshot, pretty)?;
        Ok(snapshot)
    }
}
