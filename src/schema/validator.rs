//! Structural validation
//!
//! Two checks: a loose one on raw input (is this plausibly one of our
//! exports, of any version) and a strict one on migrated data (does the
//! envelope match the contract of one exact version, including the export
//! metadata every versioned snapshot carries). Neither looks inside
//! records; domain payloads are only checked for their container kind.

use serde_json::Value;

use super::{
    is_legacy_format, schema_version_of, APP_VERSION_FIELD, BUILD_ID_FIELD, DOMAINS_FIELD,
    EXPORT_DATE_FIELD, STATISTICS_FIELD,
};
use crate::registry::DomainKey;

/// Loose pre-check run before any migration attempt
pub fn validate_import_file(raw: &Value) -> bool {
    if !raw.is_object() {
        return false;
    }
    if is_legacy_format(raw) {
        return true;
    }
    if schema_version_of(raw).is_err() {
        return false;
    }
    raw.get(DOMAINS_FIELD).map_or(false, Value::is_object)
}

/// Strict check of data claimed to be at `version`
pub fn validate_structure(data: &Value, version: u32) -> bool {
    check_structure(data, version).is_ok()
}

/// Strict check returning the first violation found
pub fn check_structure(data: &Value, version: u32) -> Result<(), String> {
    if version == 0 {
        return if is_legacy_format(data) {
            Ok(())
        } else {
            Err("not a legacy export".to_string())
        };
    }

    let object = data
        .as_object()
        .ok_or_else(|| "backup must be a JSON object".to_string())?;

    match schema_version_of(data)? {
        Some(found) if found == version => {}
        Some(found) => {
            return Err(format!(
                "expected schema version {}, found {}",
                version, found
            ))
        }
        None => return Err("schemaVersion is missing".to_string()),
    }

    for field in [EXPORT_DATE_FIELD, APP_VERSION_FIELD, BUILD_ID_FIELD] {
        match object.get(field) {
            Some(Value::String(_)) => {}
            Some(_) => return Err(format!("{} must be a string", field)),
            None => return Err(format!("{} is missing", field)),
        }
    }

    if let Some(statistics) = object.get(STATISTICS_FIELD) {
        if !statistics.is_object() {
            return Err(format!("{} must be an object", STATISTICS_FIELD));
        }
    }

    let domains = object
        .get(DOMAINS_FIELD)
        .and_then(Value::as_object)
        .ok_or_else(|| format!("{} must be an object", DOMAINS_FIELD))?;

    for (name, payload) in domains {
        // Unregistered names pass through untouched
        let Ok(key) = name.parse::<DomainKey>() else {
            continue;
        };
        if !key.kind().matches(payload) {
            return Err(format!("domain '{}' must be an {}", key, key.kind()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(version: u32, domains: Value) -> Value {
        json!({
            "schemaVersion": version,
            "exportDate": "2025-01-01T00:00:00Z",
            "appVersion": "2.4.0",
            "buildId": "abc1234",
            "domains": domains,
            "statistics": {}
        })
    }

    #[test]
    fn test_import_file_accepts_plausible_exports() {
        assert!(validate_import_file(&envelope(3, json!({}))));
        assert!(validate_import_file(&json!({"domains": {}})));
        assert!(validate_import_file(
            &json!({"exportedAt": "2023-01-01", "data": {}})
        ));
    }

    #[test]
    fn test_import_file_rejects_garbage() {
        assert!(!validate_import_file(&json!("hello")));
        assert!(!validate_import_file(&json!([1, 2, 3])));
        assert!(!validate_import_file(&json!({"goals": []})));
        assert!(!validate_import_file(&json!({"domains": []})));
        assert!(!validate_import_file(
            &json!({"schemaVersion": "three", "domains": {}})
        ));
    }

    #[test]
    fn test_structure_checks_container_kinds() {
        let good = envelope(3, json!({"goals": [], "settings": {"theme": "dark"}}));
        assert!(validate_structure(&good, 3));

        let bad = envelope(3, json!({"goals": {"id": "g1"}}));
        let err = check_structure(&bad, 3).unwrap_err();
        assert!(err.contains("goals"));
    }

    #[test]
    fn test_structure_checks_version() {
        let data = envelope(2, json!({}));
        assert!(validate_structure(&data, 2));
        assert!(!validate_structure(&data, 3));
        assert!(!validate_structure(&json!({"domains": {}}), 3));
    }

    #[test]
    fn test_structure_ignores_unregistered_domains() {
        let data = envelope(3, json!({"moods": "not even json"}));
        assert!(validate_structure(&data, 3));
    }

    #[test]
    fn test_structure_rejects_non_string_metadata() {
        let mut data = envelope(3, json!({}));
        data["buildId"] = json!(42);
        assert!(!validate_structure(&data, 3));
    }

    #[test]
    fn test_structure_requires_metadata() {
        for field in ["exportDate", "appVersion", "buildId"] {
            let mut data = envelope(3, json!({}));
            data.as_object_mut().unwrap().remove(field);
            let err = check_structure(&data, 3).unwrap_err();
            assert!(err.contains(field), "{}", err);
        }
    }

    #[test]
    fn test_version_zero_is_legacy_shape() {
        let legacy = json!({"exportedAt": "2023-01-01", "data": {"goals": []}});
        assert!(validate_structure(&legacy, 0));
        assert!(!validate_structure(&envelope(1, json!({})), 0));
    }
}
