//! Typed in-memory cache of one domain
//!
//! A repository remembers the generation its copy was read at and saves with
//! [`Store::write_if_fresh`]. Once a restore (or any other writer) has touched
//! the domain, saving the old copy fails with `StaleWrite` until `reload()`.

use std::sync::{Arc, RwLock};

use serde::{de::DeserializeOwned, Serialize};

use super::{Generation, Store};
use crate::error::{VaultError, VaultResult};
use crate::registry::DomainKey;

struct Cached<T> {
    value: T,
    generation: Generation,
}

pub struct DomainRepository<T> {
    store: Arc<Store>,
    domain: DomainKey,
    data: RwLock<Cached<T>>,
}

impl<T> DomainRepository<T>
where
    T: Serialize + DeserializeOwned + Default + Clone,
{
    /// Create a repository and load its initial copy
    pub fn load(store: Arc<Store>, domain: DomainKey) -> VaultResult<Self> {
        let cached = read_cached(&store, domain)?;
        Ok(Self {
            store,
            domain,
            data: RwLock::new(cached),
        })
    }

    pub fn domain(&self) -> DomainKey {
        self.domain
    }

    /// Discard the cached copy and re-read it from the store
    pub fn reload(&self) -> VaultResult<()> {
        let cached = read_cached(&self.store, self.domain)?;
        let mut data = self.data.write().map_err(|e| {
            VaultError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        *data = cached;
        Ok(())
    }

    pub fn get(&self) -> VaultResult<T> {
        let data = self.data.read().map_err(|e| {
            VaultError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(data.value.clone())
    }

    /// Generation the cached copy was read or last saved at
    pub fn generation(&self) -> VaultResult<Generation> {
        let data = self.data.read().map_err(|e| {
            VaultError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(data.generation)
    }

    /// Whether the store has moved on since this copy was taken
    pub fn is_stale(&self) -> VaultResult<bool> {
        Ok(self.store.generation(self.domain)? != self.generation()?)
    }

    /// Modify the cached copy in place
    pub fn update<F>(&self, f: F) -> VaultResult<()>
    where
        F: FnOnce(&mut T),
    {
        let mut data = self.data.write().map_err(|e| {
            VaultError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        f(&mut data.value);
        Ok(())
    }

    /// Persist the cached copy
    ///
    /// Fails with `StaleWrite` if the domain was written by anyone else since
    /// this copy was loaded. No cache lock is held while the store writes and
    /// notifies, so listeners may read this repository.
    pub fn save(&self) -> VaultResult<Generation> {
        let (value, expected) = {
            let data = self.data.read().map_err(|e| {
                VaultError::Storage(format!("Failed to acquire read lock: {}", e))
            })?;
            (serde_json::to_value(&data.value)?, data.generation)
        };

        let generation = self.store.write_if_fresh(self.domain, &value, expected)?;

        let mut data = self.data.write().map_err(|e| {
            VaultError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        if data.generation == expected {
            data.generation = generation;
        }
        Ok(generation)
    }
}

fn read_cached<T: DeserializeOwned + Default>(
    store: &Store,
    domain: DomainKey,
) -> VaultResult<Cached<T>> {
    let (value, generation) = store.read_versioned(domain)?;
    let value = match value {
        Some(raw) => serde_json::from_value(raw).map_err(|e| {
            VaultError::Storage(format!("Failed to parse stored {}: {}", domain, e))
        })?,
        None => T::default(),
    };
    Ok(Cached { value, generation })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Goal;
    use serde_json::json;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_load_empty_domain_is_default() {
        let store = Arc::new(Store::in_memory());
        let repo: DomainRepository<Vec<Goal>> =
            DomainRepository::load(store, DomainKey::Goals).unwrap();
        assert!(repo.get().unwrap().is_empty());
    }

    #[test]
    fn test_update_and_save() {
        let store = Arc::new(Store::in_memory());
        let repo: DomainRepository<Vec<Goal>> =
            DomainRepository::load(store.clone(), DomainKey::Goals).unwrap();

        repo.update(|goals| goals.push(Goal::new("g1"))).unwrap();
        repo.save().unwrap();
        repo.update(|goals| goals.push(Goal::new("g2"))).unwrap();
        repo.save().unwrap();

        let stored = store.read(DomainKey::Goals).unwrap().unwrap();
        assert_eq!(stored.as_array().unwrap().len(), 2);
        assert!(!repo.is_stale().unwrap());
    }

    #[test]
    fn test_save_after_foreign_write_is_rejected() {
        let store = Arc::new(Store::in_memory());
        let repo: DomainRepository<Vec<Goal>> =
            DomainRepository::load(store.clone(), DomainKey::Goals).unwrap();

        store
            .write(DomainKey::Goals, &json!([{"id": "restored"}]))
            .unwrap();
        assert!(repo.is_stale().unwrap());

        repo.update(|goals| goals.push(Goal::new("stale"))).unwrap();
        assert!(repo.save().unwrap_err().is_stale_write());

        repo.reload().unwrap();
        repo.update(|goals| goals.push(Goal::new("fresh"))).unwrap();
        repo.save().unwrap();

        let ids: Vec<String> = repo.get().unwrap().into_iter().map(|g| g.id).collect();
        assert_eq!(ids, vec!["restored".to_string(), "fresh".to_string()]);
    }

    #[test]
    fn test_listener_can_read_repository_during_save() {
        let store = Arc::new(Store::in_memory());
        let repo: Arc<DomainRepository<Vec<Goal>>> =
            Arc::new(DomainRepository::load(store.clone(), DomainKey::Goals).unwrap());

        let (seen_tx, seen_rx) = mpsc::channel();
        let weak = Arc::downgrade(&repo);
        let seen_tx = std::sync::Mutex::new(seen_tx);
        store.notifier().add_listener(move |_| {
            if let Some(repo) = weak.upgrade() {
                let stale = repo.is_stale().unwrap();
                let count = repo.get().unwrap().len();
                seen_tx.lock().unwrap().send((stale, count)).unwrap();
            }
            Ok(())
        });

        let (done_tx, done_rx) = mpsc::channel();
        let worker = repo.clone();
        thread::spawn(move || {
            worker.update(|goals| goals.push(Goal::new("g1"))).unwrap();
            done_tx.send(worker.save().is_ok()).unwrap();
        });

        assert!(done_rx.recv_timeout(Duration::from_secs(5)).unwrap());
        let (_, count) = seen_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(count, 1);
        assert!(!repo.is_stale().unwrap());
    }
}
