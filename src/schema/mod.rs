//! Snapshot envelope layout and structural validation
//!
//! Field names shared by the exporter, the migration pipeline and the
//! validator live here so every stage agrees on the wire shape.

pub mod validator;

pub use validator::{check_structure, validate_import_file, validate_structure};

use serde_json::Value;

pub const SCHEMA_VERSION_FIELD: &str = "schemaVersion";
pub const EXPORT_DATE_FIELD: &str = "exportDate";
pub const APP_VERSION_FIELD: &str = "appVersion";
pub const BUILD_ID_FIELD: &str = "buildId";
pub const DOMAINS_FIELD: &str = "domains";
pub const STATISTICS_FIELD: &str = "statistics";

pub const LEGACY_EXPORTED_AT_FIELD: &str = "exportedAt";
pub const LEGACY_DATA_FIELD: &str = "data";

/// Detect the pre-versioning export shape
///
/// A legacy blob has a string `exportedAt`, a nested `data` object, and no
/// `schemaVersion`. It predates versioning, so detection is structural.
pub fn is_legacy_format(raw: &Value) -> bool {
    let Some(object) = raw.as_object() else {
        return false;
    };

    !object.contains_key(SCHEMA_VERSION_FIELD)
        && object
            .get(LEGACY_EXPORTED_AT_FIELD)
            .map_or(false, Value::is_string)
        && object.get(LEGACY_DATA_FIELD).map_or(false, Value::is_object)
}

/// Read the envelope's schema version
///
/// `Ok(None)` when the field is missing, `Err` when it is not a
/// non-negative integer that fits a `u32`.
pub fn schema_version_of(raw: &Value) -> Result<Option<u32>, String> {
    match raw.get(SCHEMA_VERSION_FIELD) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| format!("{} must be a non-negative integer, got {}", SCHEMA_VERSION_FIELD, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_legacy_detection() {
        let legacy = json!({"exportedAt": "2023-04-01T10:00:00Z", "data": {"goals": []}});
        assert!(is_legacy_format(&legacy));

        let versioned = json!({"schemaVersion": 1, "exportedAt": "x", "data": {}});
        assert!(!is_legacy_format(&versioned));

        let flat = json!({"exportedAt": "x", "goals": []});
        assert!(!is_legacy_format(&flat));

        assert!(!is_legacy_format(&json!([])));
    }

    #[test]
    fn test_schema_version_of() {
        assert_eq!(schema_version_of(&json!({"schemaVersion": 2})), Ok(Some(2)));
        assert_eq!(schema_version_of(&json!({})), Ok(None));
        assert!(schema_version_of(&json!({"schemaVersion": "2"})).is_err());
        assert!(schema_version_of(&json!({"schemaVersion": -1})).is_err());
    }
}
