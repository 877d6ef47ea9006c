//! Pre-versioning exports
//!
//! Old exports stored plain JSON under `data` with camelCase domain names and
//! no version field. They differ from the versioned envelope in more than one
//! way, so conversion to schema 1 is a single dedicated transform.

use serde_json::{Map, Value};

use super::MigrationError;
use crate::models::item_count;
use crate::registry::{ContainerKind, DomainKey};
use crate::schema::{
    is_legacy_format, APP_VERSION_FIELD, BUILD_ID_FIELD, DOMAINS_FIELD, EXPORT_DATE_FIELD,
    LEGACY_DATA_FIELD, LEGACY_EXPORTED_AT_FIELD, SCHEMA_VERSION_FIELD, STATISTICS_FIELD,
};

const LEGACY_MARKER: &str = "legacy";

/// Convert a legacy blob into a schema 1 envelope with decoded domains
pub fn migrate_legacy(raw: &Value) -> Result<Value, MigrationError> {
    if !is_legacy_format(raw) {
        return Err(MigrationError::InvalidLegacy(
            "expected exportedAt and a data object without schemaVersion".to_string(),
        ));
    }

    let exported_at = raw
        .get(LEGACY_EXPORTED_AT_FIELD)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let app_version = raw
        .get(APP_VERSION_FIELD)
        .and_then(Value::as_str)
        .unwrap_or(LEGACY_MARKER)
        .to_string();

    let data = raw
        .get(LEGACY_DATA_FIELD)
        .and_then(Value::as_object)
        .ok_or_else(|| MigrationError::InvalidLegacy("data must be an object".to_string()))?;

    let mut domains = Map::new();
    let mut statistics = Map::new();

    for (name, payload) in data {
        let key = DomainKey::from_legacy_name(name).or_else(|| name.parse().ok());

        let Some(key) = key else {
            // Unknown names survive untouched
            domains.insert(name.clone(), payload.clone());
            continue;
        };

        let converted = convert_payload(key, payload)?;
        statistics.insert(key.as_str().to_string(), Value::from(item_count(&converted)));
        domains.insert(key.as_str().to_string(), converted);
    }

    let mut envelope = Map::new();
    envelope.insert(SCHEMA_VERSION_FIELD.to_string(), Value::from(1u32));
    envelope.insert(EXPORT_DATE_FIELD.to_string(), Value::from(exported_at));
    envelope.insert(APP_VERSION_FIELD.to_string(), Value::from(app_version));
    envelope.insert(BUILD_ID_FIELD.to_string(), Value::from(LEGACY_MARKER));
    envelope.insert(DOMAINS_FIELD.to_string(), Value::Object(domains));
    envelope.insert(STATISTICS_FIELD.to_string(), Value::Object(statistics));

    Ok(Value::Object(envelope))
}

fn convert_payload(key: DomainKey, payload: &Value) -> Result<Value, MigrationError> {
    match key.kind() {
        ContainerKind::Document => {
            if payload.is_object() {
                Ok(payload.clone())
            } else {
                Err(MigrationError::InvalidLegacy(format!(
                    "{} must be an object",
                    key.legacy_name()
                )))
            }
        }
        ContainerKind::Collection => {
            let records = payload.as_array().ok_or_else(|| {
                MigrationError::InvalidLegacy(format!("{} must be an array", key.legacy_name()))
            })?;

            let converted = records
                .iter()
                .enumerate()
                .map(|(index, record)| with_string_id(key, index, record))
                .collect();
            Ok(Value::Array(converted))
        }
    }
}

/// Legacy records may lack an id or use a numeric one
fn with_string_id(key: DomainKey, index: usize, record: &Value) -> Value {
    let mut record = record.clone();
    if let Some(object) = record.as_object_mut() {
        let id = match object.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => format!("{}-{}-{}", LEGACY_MARKER, key.as_str(), index),
        };
        object.insert("id".to_string(), Value::from(id));
    }
    record
}
