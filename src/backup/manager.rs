//! Rolling backups
//!
//! Writes dated snapshot files into the backup directory and prunes them
//! according to the configured retention policy. [`AutoBackupTrigger`] hooks
//! into the persistence notifier so a backup is only taken when something
//! actually changed; [`AutoBackup`] bundles the two for
//! [`Vault::attach_auto_backup`](crate::Vault::attach_auto_backup).

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Datelike, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::export::Exporter;
use crate::config::paths::VaultPaths;
use crate::config::settings::BackupRetention;
use crate::config::BuildInfo;
use crate::error::{VaultError, VaultResult};
use crate::notifier::ListenerId;
use crate::registry::DomainKey;
use crate::storage::Store;

const AUTO_BACKUP_FIELD: &str = "autoBackupEnabled";

/// A backup file found in the backup directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupInfo {
    pub filename: String,
    pub path: PathBuf,
    /// Decoded from the filename, not the file's mtime
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
    /// Taken on the first day of a month; counted against the monthly quota
    pub is_monthly: bool,
}

/// Writes snapshots into the backup directory and prunes old ones
pub struct BackupManager {
    backup_dir: PathBuf,
    store: Arc<Store>,
    exporter: Exporter,
    retention: BackupRetention,
}

impl BackupManager {
    pub fn new(
        store: Arc<Store>,
        paths: &VaultPaths,
        retention: BackupRetention,
        build_info: BuildInfo,
    ) -> Self {
        Self {
            backup_dir: paths.backup_dir(),
            exporter: Exporter::new(store.clone(), build_info),
            store,
            retention,
        }
    }

    /// Write a snapshot of the current data into the backup directory
    ///
    /// Returns the path to the created backup file.
    pub fn create_backup(&self) -> VaultResult<PathBuf> {
        fs::create_dir_all(&self.backup_dir)
            .map_err(|e| VaultError::Io(format!("Failed to create backup directory: {}", e)))?;

        let now = Utc::now();
        let filename = format!(
            "backup-{}-{:03}.json",
            now.format("%Y%m%d-%H%M%S"),
            now.timestamp_subsec_millis()
        );
        let backup_path = self.backup_dir.join(&filename);

        self.exporter.export_to_file(&backup_path, true)?;
        tracing::info!(path = %backup_path.display(), "backup created");

        Ok(backup_path)
    }

    /// Backup files in the backup directory, newest first
    ///
    /// Files whose names don't follow the backup naming scheme are ignored.
    pub fn list_backups(&self) -> VaultResult<Vec<BackupInfo>> {
        let entries = match fs::read_dir(&self.backup_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(VaultError::Io(format!(
                    "Failed to read backup directory {}: {}",
                    self.backup_dir.display(),
                    e
                )))
            }
        };

        let mut found: Vec<BackupInfo> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| parse_backup_info(&entry.path()))
            .collect();
        found.sort_unstable_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    /// Delete backups beyond the retention policy
    pub fn enforce_retention(&self) -> VaultResult<Vec<PathBuf>> {
        let (monthly, daily): (Vec<_>, Vec<_>) =
            self.list_backups()?.into_iter().partition(|b| b.is_monthly);

        let expired = daily
            .into_iter()
            .skip(self.retention.daily_count as usize)
            .chain(monthly.into_iter().skip(self.retention.monthly_count as usize));

        let mut deleted = Vec::new();
        for backup in expired {
            fs::remove_file(&backup.path)
                .map_err(|e| VaultError::Io(format!("Failed to delete old backup: {}", e)))?;
            deleted.push(backup.path);
        }

        if !deleted.is_empty() {
            tracing::debug!(count = deleted.len(), "pruned old backups");
        }
        Ok(deleted)
    }

    /// [`create_backup`](Self::create_backup) followed by pruning
    pub fn create_backup_with_retention(&self) -> VaultResult<(PathBuf, Vec<PathBuf>)> {
        let created = self.create_backup()?;
        Ok((created, self.enforce_retention()?))
    }

    pub fn backup_dir(&self) -> &PathBuf {
        &self.backup_dir
    }

    pub fn get_backup(&self, filename: &str) -> VaultResult<Option<BackupInfo>> {
        Ok(parse_backup_info(&self.backup_dir.join(filename)))
    }

    pub fn get_latest_backup(&self) -> VaultResult<Option<BackupInfo>> {
        Ok(self.list_backups()?.into_iter().next())
    }

    /// Whether the user has turned on automatic backups in settings
    pub fn auto_backup_enabled(&self) -> VaultResult<bool> {
        Ok(self
            .store
            .read(DomainKey::Settings)?
            .and_then(|settings| settings.get(AUTO_BACKUP_FIELD).and_then(Value::as_bool))
            .unwrap_or(false))
    }

    /// Take a backup if the trigger saw changes and auto-backup is enabled
    ///
    /// Pending changes are kept when auto-backup is off or the backup fails,
    /// so a later call picks them up.
    pub fn run_pending(&self, trigger: &AutoBackupTrigger) -> VaultResult<Option<PathBuf>> {
        if !trigger.is_dirty() {
            return Ok(None);
        }
        if !self.auto_backup_enabled()? {
            tracing::debug!("auto-backup disabled, keeping pending changes");
            return Ok(None);
        }

        let changed = trigger.take_pending();
        match self.create_backup_with_retention() {
            Ok((path, _)) => {
                tracing::info!(domains = changed.len(), "auto-backup taken");
                Ok(Some(path))
            }
            Err(err) => {
                trigger.mark_all(changed);
                Err(err)
            }
        }
    }
}

/// Records which domains changed since the last automatic backup
///
/// The listener only touches an in-memory set, so it never slows the writer.
#[derive(Debug, Default)]
pub struct AutoBackupTrigger {
    dirty: Mutex<BTreeSet<DomainKey>>,
}

impl AutoBackupTrigger {
    /// Create a trigger and register it with the store's notifier
    pub fn attach(store: &Store) -> (Arc<Self>, ListenerId) {
        let trigger = Arc::new(Self::default());
        let listener = trigger.clone();
        let id = store.notifier().add_listener(move |domain| {
            listener.mark(domain);
            Ok(())
        });
        (trigger, id)
    }

    /// Note a write; secret domains never end up in a backup and are ignored
    pub fn mark(&self, domain: DomainKey) {
        if !domain.is_secret() {
            self.lock().insert(domain);
        }
    }

    pub fn is_dirty(&self) -> bool {
        !self.lock().is_empty()
    }

    pub fn pending(&self) -> BTreeSet<DomainKey> {
        self.lock().clone()
    }

    pub fn take_pending(&self) -> BTreeSet<DomainKey> {
        std::mem::take(&mut *self.lock())
    }

    fn mark_all(&self, domains: BTreeSet<DomainKey>) {
        self.lock().extend(domains);
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<DomainKey>> {
        match self.dirty.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// A [`BackupManager`] paired with a trigger attached to its store
///
/// Dropping it detaches the listener.
pub struct AutoBackup {
    manager: BackupManager,
    trigger: Arc<AutoBackupTrigger>,
    listener: ListenerId,
}

impl AutoBackup {
    pub fn attach(manager: BackupManager) -> Self {
        let (trigger, listener) = AutoBackupTrigger::attach(&manager.store);
        Self {
            manager,
            trigger,
            listener,
        }
    }

    pub fn trigger(&self) -> &AutoBackupTrigger {
        &self.trigger
    }

    /// See [`BackupManager::run_pending`]
    pub fn run_pending(&self) -> VaultResult<Option<PathBuf>> {
        self.manager.run_pending(&self.trigger)
    }
}

impl Drop for AutoBackup {
    fn drop(&mut self) {
        self.manager.store.notifier().remove_listener(self.listener);
    }
}

const FILE_PREFIX: &str = "backup-";
const FILE_SUFFIX: &str = ".json";

/// `None` unless `path` is an existing file named `backup-<timestamp>.json`
fn parse_backup_info(path: &Path) -> Option<BackupInfo> {
    let filename = path.file_name()?.to_str()?.to_owned();
    let stamp = filename.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
    let created_at = parse_backup_timestamp(stamp)?;

    let metadata = fs::metadata(path).ok()?;
    if !metadata.is_file() {
        return None;
    }

    Some(BackupInfo {
        is_monthly: is_first_of_month(&created_at),
        size_bytes: metadata.len(),
        path: path.to_path_buf(),
        created_at,
        filename,
    })
}

fn is_first_of_month(timestamp: &DateTime<Utc>) -> bool {
    timestamp.day() == 1
}

/// `YYYYMMDD-HHMMSS` with an optional `-mmm` millisecond suffix
fn parse_backup_timestamp(stamp: &str) -> Option<DateTime<Utc>> {
    let (seconds, millis) = match stamp.len() {
        15 => (stamp, 0),
        19 => {
            let head = stamp.get(..15)?;
            let digits = stamp.get(15..)?.strip_prefix('-')?;
            if !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            (head, digits.parse::<i64>().ok()?)
        }
        _ => return None,
    };

    let naive = NaiveDateTime::parse_from_str(seconds, "%Y%m%d-%H%M%S").ok()?;
    Some(naive.and_utc() + Duration::milliseconds(millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::Snapshot;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_manager() -> (BackupManager, Arc<Store>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp_dir.path().to_path_buf());
        paths.ensure_directories().unwrap();

        let store = Arc::new(Store::open(&paths).unwrap());
        store.write(DomainKey::Goals, &json!([{"id": "g1"}])).unwrap();

        let retention = BackupRetention {
            daily_count: 3,
            monthly_count: 2,
        };

        let manager = BackupManager::new(store.clone(), &paths, retention, BuildInfo::current());
        (manager, store, temp_dir)
    }

    /// Drop a backup file with a chosen timestamp into the backup dir
    fn plant_backup(manager: &BackupManager, stamp: &str) -> PathBuf {
        let path = manager.backup_dir().join(format!("backup-{}.json", stamp));
        fs::write(&path, "{}").unwrap();
        path
    }

    #[test]
    fn test_create_backup_is_a_snapshot() {
        let (manager, _store, _temp) = create_test_manager();

        let backup_path = manager.create_backup().unwrap();
        assert!(backup_path.to_string_lossy().contains("backup-"));

        let contents = fs::read_to_string(&backup_path).unwrap();
        let snapshot: Snapshot = serde_json::from_str(&contents).unwrap();
        assert!(snapshot.contains(DomainKey::Goals));
    }

    #[test]
    fn test_list_backups_newest_first() {
        let (manager, _store, _temp) = create_test_manager();

        plant_backup(&manager, "20240310-080000-000");
        plant_backup(&manager, "20240312-080000-000");
        plant_backup(&manager, "20240311-080000-000");
        fs::write(manager.backup_dir().join("notes.json"), "{}").unwrap();
        fs::write(
            manager.backup_dir().join("backup-22222222222222éxyz.json"),
            "{}",
        )
        .unwrap();

        let backups = manager.list_backups().unwrap();
        assert_eq!(backups.len(), 3);
        assert_eq!(backups[0].filename, "backup-20240312-080000-000.json");
        assert_eq!(backups[2].filename, "backup-20240310-080000-000.json");
    }

    #[test]
    fn test_retention_policy() {
        let (manager, _store, _temp) = create_test_manager();

        for day in 10..15 {
            plant_backup(&manager, &format!("202403{}-080000", day));
        }
        for month in 1..=3 {
            plant_backup(&manager, &format!("20240{}01-080000", month));
        }

        let deleted = manager.enforce_retention().unwrap();
        assert_eq!(deleted.len(), 3); // 5 - 3 daily, 3 - 2 monthly

        let remaining = manager.list_backups().unwrap();
        assert_eq!(remaining.len(), 5);
        assert!(!manager.backup_dir().join("backup-20240101-080000.json").exists());
        assert!(!manager.backup_dir().join("backup-20240310-080000.json").exists());
    }

    #[test]
    fn test_get_latest_backup() {
        let (manager, _store, _temp) = create_test_manager();

        assert!(manager.get_latest_backup().unwrap().is_none());

        let path = manager.create_backup().unwrap();
        let latest = manager.get_latest_backup().unwrap().unwrap();
        assert_eq!(latest.path, path);

        let by_name = manager.get_backup(&latest.filename).unwrap().unwrap();
        assert_eq!(by_name.path, path);
        assert!(manager.get_backup("backup-19990101-000000.json").unwrap().is_none());
    }

    #[test]
    fn test_parse_backup_timestamp() {
        let timestamp = parse_backup_timestamp("20251127-143022").unwrap();
        assert_eq!(timestamp.year(), 2025);
        assert_eq!(timestamp.month(), 11);
        assert_eq!(timestamp.day(), 27);

        let timestamp = parse_backup_timestamp("20251127-143022-456").unwrap();
        assert_eq!(timestamp.timestamp_subsec_millis(), 456);

        assert!(parse_backup_timestamp("20251127").is_none());
        assert!(parse_backup_timestamp("22222222222222éxyz").is_none());
        assert!(parse_backup_timestamp("20251327-143022").is_none());
    }

    #[test]
    fn test_trigger_ignores_secret_domains() {
        let store = Store::in_memory();
        let (trigger, _) = AutoBackupTrigger::attach(&store);

        store.write(DomainKey::AuthSession, &json!({"token": "t"})).unwrap();
        assert!(!trigger.is_dirty());

        store.write(DomainKey::Habits, &json!([])).unwrap();
        store.write(DomainKey::Goals, &json!([])).unwrap();
        assert_eq!(
            trigger.pending(),
            BTreeSet::from([DomainKey::Goals, DomainKey::Habits])
        );
    }

    #[test]
    fn test_run_pending_respects_setting() {
        let (manager, store, _temp) = create_test_manager();
        let (trigger, _) = AutoBackupTrigger::attach(&store);

        assert_eq!(manager.run_pending(&trigger).unwrap(), None);

        store.write(DomainKey::Goals, &json!([{"id": "g2"}])).unwrap();
        assert_eq!(manager.run_pending(&trigger).unwrap(), None);
        assert!(trigger.is_dirty());
        assert!(manager.list_backups().unwrap().is_empty());

        store
            .write(DomainKey::Settings, &json!({"theme": "dark", "autoBackupEnabled": true}))
            .unwrap();
        let path = manager.run_pending(&trigger).unwrap().unwrap();
        assert!(path.exists());
        assert!(!trigger.is_dirty());
        assert_eq!(manager.run_pending(&trigger).unwrap(), None);
    }

    #[test]
    fn test_auto_backup_detaches_on_drop() {
        let (manager, store, _temp) = create_test_manager();
        let listeners = store.notifier().listener_count();

        let auto = AutoBackup::attach(manager);
        assert_eq!(store.notifier().listener_count(), listeners + 1);

        store
            .write(DomainKey::Settings, &json!({"theme": "dark", "autoBackupEnabled": true}))
            .unwrap();
        assert!(auto.trigger().is_dirty());
        assert!(auto.run_pending().unwrap().is_some());

        drop(auto);
        assert_eq!(store.notifier().listener_count(), listeners);
    }
}
