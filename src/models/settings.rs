//! The `settings` domain
//!
//! Unlike every other domain, settings are merged on restore: secret fields
//! and device-local flags keep their local values.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::registry::DomainKey;

/// User settings as stored in the `settings` domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// UI theme (required since schema 3)
    pub theme: String,

    #[serde(default)]
    pub onboarding_completed: bool,

    #[serde(default)]
    pub auto_backup_enabled: bool,

    /// LLM provider key; redacted from every export
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Sync account token; redacted from every export
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub fn default_theme() -> String {
    "system".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            onboarding_completed: false,
            auto_backup_enabled: false,
            api_key: None,
            auth_token: None,
            extra: Map::new(),
        }
    }
}

/// Remove every field the registry marks as redacted for `domain`
pub fn redact(domain: DomainKey, payload: &mut Value) {
    if let Some(object) = payload.as_object_mut() {
        for field in domain.redacted_fields() {
            object.remove(*field);
        }
    }
}

/// Layer local secrets and device flags over imported settings
///
/// Fields the local copy lacks are removed from the result rather than taken
/// from the backup.
pub fn merge_preserving_local(domain: DomainKey, imported: &Value, local: Option<&Value>) -> Value {
    let mut merged = imported.clone();
    let Some(target) = merged.as_object_mut() else {
        return merged;
    };
    let local = local.and_then(Value::as_object);

    let preserved = domain
        .redacted_fields()
        .iter()
        .chain(domain.device_local_fields().iter());

    for field in preserved {
        match local.and_then(|l| l.get(*field)) {
            Some(value) => {
                target.insert((*field).to_string(), value.clone());
            }
            None => {
                target.remove(*field);
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_redact_strips_secrets_only() {
        let mut payload = json!({
            "theme": "dark",
            "apiKey": "sk-123",
            "authToken": "tok",
            "onboardingCompleted": true
        });
        redact(DomainKey::Settings, &mut payload);

        assert_eq!(
            payload,
            json!({"theme": "dark", "onboardingCompleted": true})
        );
    }

    #[test]
    fn test_merge_keeps_local_secrets_and_flags() {
        let imported = json!({
            "theme": "dark",
            "apiKey": "sk-from-backup",
            "onboardingCompleted": false,
            "autoBackupEnabled": true,
            "reminderHour": 8
        });
        let local = json!({
            "theme": "light",
            "apiKey": "sk-local",
            "onboardingCompleted": true
        });

        let merged = merge_preserving_local(DomainKey::Settings, &imported, Some(&local));

        assert_eq!(
            merged,
            json!({
                "theme": "dark",
                "apiKey": "sk-local",
                "onboardingCompleted": true,
                "reminderHour": 8
            })
        );
    }

    #[test]
    fn test_merge_without_local_never_imports_secrets() {
        let imported = json!({"theme": "dark", "apiKey": "sk-from-backup"});
        let merged = merge_preserving_local(DomainKey::Settings, &imported, None);
        assert_eq!(merged, json!({"theme": "dark"}));
    }

    #[test]
    fn test_settings_serde() {
        let settings: Settings = serde_json::from_value(json!({
            "theme": "dark",
            "apiKey": "sk-1",
            "fontScale": 1.2
        }))
        .unwrap();

        assert_eq!(settings.api_key.as_deref(), Some("sk-1"));
        assert!(!settings.onboarding_completed);
        assert_eq!(settings.extra["fontScale"], json!(1.2));
    }
}
