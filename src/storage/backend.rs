//! Key-value persistence primitive
//!
//! The engine only needs single-key reads and writes; there are no multi-key
//! transactions, which is why a restore treats each domain as its own unit of
//! failure.

use serde_json::Value;

use crate::error::VaultResult;
use crate::registry::DomainKey;

/// Durable get/set-by-key store for domain payloads
pub trait StorageBackend: Send + Sync {
    /// Read a domain's payload, `None` if it was never written or was cleared
    fn read(&self, domain: DomainKey) -> VaultResult<Option<Value>>;

    /// Replace a domain's payload
    fn write(&self, domain: DomainKey, value: &Value) -> VaultResult<()>;

    /// Remove a domain's payload
    fn clear(&self, domain: DomainKey) -> VaultResult<()>;

    /// Names of every key currently persisted, registered or not
    fn stored_names(&self) -> VaultResult<Vec<String>>;
}
