//! Library entry point
//!
//! [`Vault`] ties the store, exporter and restorer together so callers only
//! deal with one handle.

use std::path::Path;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::backup::{
    AutoBackup, BackupInspection, BackupManager, Exporter, RestoreManager, RestoreReport, Snapshot,
};
use crate::config::{BuildInfo, VaultPaths};
use crate::error::VaultResult;
use crate::migration;
use crate::registry::DomainKey;
use crate::storage::{DomainRepository, Store};

pub struct Vault {
    store: Arc<Store>,
    exporter: Exporter,
    restorer: RestoreManager,
}

impl Vault {
    pub fn new(store: Arc<Store>, build_info: BuildInfo) -> Self {
        Self {
            exporter: Exporter::new(store.clone(), build_info),
            restorer: RestoreManager::new(store.clone()),
            store,
        }
    }

    /// Open the file-backed vault under `paths`
    pub fn open(paths: &VaultPaths) -> VaultResult<Self> {
        Ok(Self::new(Arc::new(Store::open(paths)?), BuildInfo::current()))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(Store::in_memory()), BuildInfo::current())
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn build_info(&self) -> &BuildInfo {
        self.exporter.build_info()
    }

    pub fn current_schema_version(&self) -> u32 {
        migration::current_schema_version()
    }

    pub fn export(&self) -> VaultResult<Snapshot> {
        self.exporter.export()
    }

    pub fn export_to_string(&self, pretty: bool) -> VaultResult<String> {
        self.exporter.export_to_string(pretty)
    }

    pub fn export_to_file<P: AsRef<Path>>(&self, path: P, pretty: bool) -> VaultResult<Snapshot> {
        self.exporter.export_to_file(path, pretty)
    }

    pub fn restore(&self, raw: &Value) -> VaultResult<RestoreReport> {
        self.restorer.restore(raw)
    }

    pub fn restore_str(&self, text: &str) -> VaultResult<RestoreReport> {
        self.restorer.restore_str(text)
    }

    pub fn restore_snapshot(&self, snapshot: &Snapshot) -> VaultResult<RestoreReport> {
        self.restorer.restore_snapshot(snapshot)
    }

    pub fn restore_from_file(&self, path: &Path) -> VaultResult<RestoreReport> {
        self.restorer.restore_from_file(path)
    }

    /// Dry run: validate and migrate without writing
    pub fn inspect(&self, raw: &Value) -> VaultResult<BackupInspection> {
        self.restorer.inspect(raw)
    }

    pub fn inspect_file(&self, path: &Path) -> VaultResult<BackupInspection> {
        self.restorer.inspect_file(path)
    }

    /// Start tracking writes for automatic backups through `manager`
    ///
    /// The caller decides when to call [`AutoBackup::run_pending`]; nothing is
    /// written until then, and only if settings enable auto-backup.
    pub fn attach_auto_backup(&self, manager: BackupManager) -> AutoBackup {
        AutoBackup::attach(manager)
    }

    /// Typed cache over one domain, guarded against stale writes
    pub fn repository<T>(&self, domain: DomainKey) -> VaultResult<DomainRepository<T>>
    where
        T: Serialize + DeserializeOwned + Default + Clone,
    {
        DomainRepository::load(self.store.clone(), domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Goal, Settings};
    use serde_json::json;

    #[test]
    fn test_export_restore_between_vaults() {
        let source = Vault::in_memory();
        let goals = source.repository::<Vec<Goal>>(DomainKey::Goals).unwrap();
        goals
            .update(|g| g.push(Goal::new("g1").with_field("title", json!("Swim"))))
            .unwrap();
        goals.save().unwrap();

        let text = source.export_to_string(false).unwrap();

        let target = Vault::in_memory();
        let report = target.restore_str(&text).unwrap();
        assert!(report.overall_success);
        assert_eq!(
            target.store().read(DomainKey::Goals).unwrap(),
            source.store().read(DomainKey::Goals).unwrap()
        );
    }

    #[test]
    fn test_repository_goes_stale_on_restore() {
        let vault = Vault::in_memory();
        let settings = vault.repository::<Settings>(DomainKey::Settings).unwrap();
        assert_eq!(settings.get().unwrap().theme, "system");

        let snapshot = json!({
            "schemaVersion": vault.current_schema_version(),
            "exportDate": "2024-03-01T09:00:00Z",
            "appVersion": "1.0.0",
            "buildId": "dev",
            "domains": {"settings": json!({"theme": "dark"}).to_string()}
        });
        vault.restore(&snapshot).unwrap();

        settings.update(|s| s.theme = "light".to_string()).unwrap();
        assert!(settings.save().unwrap_err().is_stale_write());

        settings.reload().unwrap();
        assert_eq!(settings.get().unwrap().theme, "dark");
    }

    #[test]
    fn test_auto_backup_follows_restore() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp_dir.path().to_path_buf());
        let vault = Vault::open(&paths).unwrap();
        vault
            .store()
            .write(DomainKey::Settings, &json!({"theme": "dark", "autoBackupEnabled": true}))
            .unwrap();

        let manager = BackupManager::new(
            vault.store().clone(),
            &paths,
            Default::default(),
            vault.build_info().clone(),
        );
        let auto = vault.attach_auto_backup(manager);
        assert_eq!(auto.run_pending().unwrap(), None);

        let snapshot = json!({
            "schemaVersion": vault.current_schema_version(),
            "exportDate": "2024-03-01T09:00:00Z",
            "appVersion": "1.0.0",
            "buildId": "dev",
            "domains": {"goals": json!([{"id": "g1"}]).to_string()}
        });
        vault.restore(&snapshot).unwrap();

        let path = auto.run_pending().unwrap().unwrap();
        assert!(path.exists());
    }
}
