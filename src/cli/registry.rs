//! `lifevault registry`: list registered domains and check coverage

use crate::error::VaultResult;
use crate::registry::DomainKey;
use crate::storage::Store;

pub fn handle_registry_command(store: &Store) -> VaultResult<()> {
    println!("Registered Domains");
    println!("==================");

    for key in DomainKey::ALL {
        let exported = if key.is_secret() {
            "secret, never exported"
        } else if !key.redacted_fields().is_empty() {
            "exported, secrets redacted"
        } else {
            "exported"
        };
        println!("  {:<18} {:<7} {}", key.as_str(), key.kind().to_string(), exported);
    }

    let unregistered = store.unregistered_keys()?;
    println!();
    if unregistered.is_empty() {
        println!("Coverage: every persisted domain is registered.");
    } else {
        println!("Coverage: {} persisted domain(s) are not registered and will not be backed up:", unregistered.len());
        for name in &unregistered {
            println!("  {}", name);
        }
    }

    Ok(())
}
