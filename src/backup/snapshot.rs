//! The portable export artifact
//!
//! On the wire every `domains` value is itself a JSON-encoded string, so a
//! snapshot is decoded twice: once for the envelope, once per domain.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{VaultError, VaultResult};
use crate::registry::DomainKey;
use crate::schema::DOMAINS_FIELD;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub schema_version: u32,
    pub export_date: DateTime<Utc>,
    pub app_version: String,
    pub build_id: String,
    /// Domain key to JSON-encoded payload
    pub domains: BTreeMap<DomainKey, String>,
    /// Item count per domain; informational only
    #[serde(default)]
    pub statistics: BTreeMap<String, u64>,
}

impl Snapshot {
    /// Decode one domain's payload
    pub fn domain(&self, key: DomainKey) -> VaultResult<Option<Value>> {
        self.domains
            .get(&key)
            .map(|encoded| {
                serde_json::from_str(encoded).map_err(|e| VaultError::DomainImport {
                    domain: key,
                    reason: format!("payload is not valid JSON: {}", e),
                })
            })
            .transpose()
    }

    pub fn contains(&self, key: DomainKey) -> bool {
        self.domains.contains_key(&key)
    }

    pub fn to_value(&self) -> VaultResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Replace every string-encoded domain in an envelope with its decoded value
///
/// Payloads that are already plain JSON are left alone. Strings that do not
/// parse are removed from the envelope and returned as `(name, reason)`.
pub fn decode_domains(envelope: &mut Value) -> Vec<(String, String)> {
    let mut undecodable = Vec::new();

    let Some(domains) = envelope
        .get_mut(DOMAINS_FIELD)
        .and_then(Value::as_object_mut)
    else {
        return undecodable;
    };

    let names: Vec<String> = domains.keys().cloned().collect();
    for name in names {
        let Some(Value::String(encoded)) = domains.get(&name) else {
            continue;
        };
        match serde_json::from_str::<Value>(encoded) {
            Ok(decoded) => {
                domains.insert(name, decoded);
            }
            Err(e) => {
                domains.remove(&name);
                undecodable.push((name, format!("payload is not valid JSON: {}", e)));
            }
        }
    }

    undecodable
}
