//! Storage layer for lifevault
//!
//! Wraps a [`StorageBackend`] with per-domain generation counters and the
//! persistence notifier. Every write bumps the domain's generation, so a
//! cached copy can prove it was read after the latest write.

pub mod backend;
pub mod file;
pub mod file_io;
pub mod memory;
pub mod repository;

pub use backend::StorageBackend;
pub use file::FileBackend;
pub use file_io::{read_json_optional, write_json_atomic};
pub use memory::MemoryBackend;
pub use repository::DomainRepository;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::paths::VaultPaths;
use crate::error::{VaultError, VaultResult};
use crate::notifier::PersistenceNotifier;
use crate::registry::{self, DomainKey};

/// Freshness token for one domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    pub fn value(&self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

/// Main storage coordinator shared by the exporter, the restorer and every
/// domain repository
pub struct Store {
    backend: Box<dyn StorageBackend>,
    notifier: Arc<PersistenceNotifier>,
    generations: Mutex<HashMap<DomainKey, Generation>>,
}

impl Store {
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            notifier: Arc::new(PersistenceNotifier::new()),
            generations: Mutex::new(HashMap::new()),
        }
    }

    /// Open the file-backed store under the configured data directory
    pub fn open(paths: &VaultPaths) -> VaultResult<Self> {
        Ok(Self::new(FileBackend::new(paths)?))
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    pub fn notifier(&self) -> &Arc<PersistenceNotifier> {
        &self.notifier
    }

    pub fn read(&self, domain: DomainKey) -> VaultResult<Option<Value>> {
        self.backend.read(domain)
    }

    /// Read a domain together with the generation it was read at
    pub fn read_versioned(&self, domain: DomainKey) -> VaultResult<(Option<Value>, Generation)> {
        let generations = self.lock_generations()?;
        let value = self.backend.read(domain)?;
        let generation = generations.get(&domain).copied().unwrap_or_default();
        Ok((value, generation))
    }

    pub fn generation(&self, domain: DomainKey) -> VaultResult<Generation> {
        let generations = self.lock_generations()?;
        Ok(generations.get(&domain).copied().unwrap_or_default())
    }

    /// Unconditionally replace a domain's payload
    pub fn write(&self, domain: DomainKey, value: &Value) -> VaultResult<Generation> {
        let generation = {
            let mut generations = self.lock_generations()?;
            self.backend.write(domain, value)?;
            let next = generations.get(&domain).copied().unwrap_or_default().next();
            generations.insert(domain, next);
            next
        };

        tracing::debug!(%domain, %generation, "domain written");
        self.notifier.notify(domain);
        Ok(generation)
    }

    /// Replace a domain's payload only if nothing was written since `expected`
    pub fn write_if_fresh(
        &self,
        domain: DomainKey,
        value: &Value,
        expected: Generation,
    ) -> VaultResult<Generation> {
        let generation = {
            let mut generations = self.lock_generations()?;
            let actual = generations.get(&domain).copied().unwrap_or_default();
            if actual != expected {
                return Err(VaultError::StaleWrite {
                    domain,
                    expected: expected.value(),
                    actual: actual.value(),
                });
            }
            self.backend.write(domain, value)?;
            let next = actual.next();
            generations.insert(domain, next);
            next
        };

        tracing::debug!(%domain, %generation, "domain written");
        self.notifier.notify(domain);
        Ok(generation)
    }

    pub fn clear(&self, domain: DomainKey) -> VaultResult<Generation> {
        let generation = {
            let mut generations = self.lock_generations()?;
            self.backend.clear(domain)?;
            let next = generations.get(&domain).copied().unwrap_or_default().next();
            generations.insert(domain, next);
            next
        };

        self.notifier.notify(domain);
        Ok(generation)
    }

    /// Persisted keys that do not map back to a registered domain
    pub fn unregistered_keys(&self) -> VaultResult<Vec<String>> {
        Ok(registry::unregistered_keys(self.backend.stored_names()?))
    }

    fn lock_generations(&self) -> VaultResult<MutexGuard<'_, HashMap<DomainKey, Generation>>> {
        self.generations
            .lock()
            .map_err(|e| VaultError::Storage(format!("Failed to acquire generation lock: {}", e)))
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}
