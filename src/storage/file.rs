//! JSON file backend
//!
//! One `<domain>.json` file per key inside the data directory.

use std::fs;
use std::path::PathBuf;

use serde_json::Value;

use super::backend::StorageBackend;
use super::file_io::{read_json_optional, remove_if_exists, write_json_atomic};
use crate::config::paths::VaultPaths;
use crate::error::{VaultError, VaultResult};
use crate::registry::DomainKey;

#[derive(Debug, Clone)]
pub struct FileBackend {
    data_dir: PathBuf,
}

impl FileBackend {
    /// Create a backend rooted at the configured data directory
    pub fn new(paths: &VaultPaths) -> VaultResult<Self> {
        paths.ensure_directories()?;
        Ok(Self {
            data_dir: paths.data_dir(),
        })
    }

    pub fn domain_file(&self, domain: DomainKey) -> PathBuf {
        self.data_dir.join(format!("{}.json", domain.as_str()))
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, domain: DomainKey) -> VaultResult<Option<Value>> {
        read_json_optional(self.domain_file(domain))
    }

    fn write(&self, domain: DomainKey, value: &Value) -> VaultResult<()> {
        write_json_atomic(self.domain_file(domain), value, true)
    }

    fn clear(&self, domain: DomainKey) -> VaultResult<()> {
        remove_if_exists(self.domain_file(domain))
    }

    fn stored_names(&self) -> VaultResult<Vec<String>> {
        if !self.data_dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.data_dir).map_err(|e| {
            VaultError::Storage(format!("Failed to read data directory: {}", e))
        })? {
            let entry = entry.map_err(|e| {
                VaultError::Storage(format!("Failed to read directory entry: {}", e))
            })?;

            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                if let Some(stem) = path.file_stem() {
                    names.push(stem.to_string_lossy().to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_backend() -> (TempDir, FileBackend) {
        let temp_dir = TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp_dir.path().to_path_buf());
        let backend = FileBackend::new(&paths).unwrap();
        (temp_dir, backend)
    }

    #[test]
    fn test_write_then_read() {
        let (_temp, backend) = create_test_backend();
        let goals = json!([{"id": "g1", "title": "Read 12 books"}]);

        backend.write(DomainKey::Goals, &goals).unwrap();

        assert!(backend.domain_file(DomainKey::Goals).exists());
        assert_eq!(backend.read(DomainKey::Goals).unwrap(), Some(goals));
    }

    #[test]
    fn test_clear_removes_file() {
        let (_temp, backend) = create_test_backend();
        backend.write(DomainKey::Habits, &json!([])).unwrap();

        backend.clear(DomainKey::Habits).unwrap();

        assert!(backend.read(DomainKey::Habits).unwrap().is_none());
        backend.clear(DomainKey::Habits).unwrap();
    }

    #[test]
    fn test_stored_names_lists_stray_files() {
        let (temp, backend) = create_test_backend();
        backend.write(DomainKey::Settings, &json!({})).unwrap();
        fs::write(temp.path().join("data").join("moods.json"), "[]").unwrap();
        fs::write(temp.path().join("data").join("notes.txt"), "ignored").unwrap();

        assert_eq!(
            backend.stored_names().unwrap(),
            vec!["moods".to_string(), "settings".to_string()]
        );
    }
}
