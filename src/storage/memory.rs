//! In-memory backend
//!
//! Used by tests and by callers that manage durability themselves.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use serde_json::Value;

use super::backend::StorageBackend;
use crate::error::{VaultError, VaultResult};
use crate::registry::DomainKey;

#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: RwLock<BTreeMap<String, Value>>,
    writes: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes and clears since creation
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Store a value under an arbitrary name, bypassing the registry
    pub fn put_raw(&self, name: impl Into<String>, value: Value) -> VaultResult<()> {
        let mut data = self.data.write().map_err(|e| {
            VaultError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        data.insert(name.into(), value);
        Ok(())
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, domain: DomainKey) -> VaultResult<Option<Value>> {
        let data = self.data.read().map_err(|e| {
            VaultError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(data.get(domain.as_str()).cloned())
    }

    fn write(&self, domain: DomainKey, value: &Value) -> VaultResult<()> {
        let mut data = self.data.write().map_err(|e| {
            VaultError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        data.insert(domain.as_str().to_string(), value.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn clear(&self, domain: DomainKey) -> VaultResult<()> {
        let mut data = self.data.write().map_err(|e| {
            VaultError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        data.remove(domain.as_str());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stored_names(&self) -> VaultResult<Vec<String>> {
        let data = self.data.read().map_err(|e| {
            VaultError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(data.keys().cloned().collect())
    }
}
