//! Current-schema data models
//!
//! Payloads are opaque to the engine; these types pin down only what the
//! current schema version requires, so a restore can reject a domain whose
//! records are unusable before it reaches the store.

pub mod records;
pub mod settings;

pub use records::{Goal, Habit, HabitCompletion, JournalEntry, Session, Template, WellnessMetric};
pub use settings::Settings;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::registry::{ContainerKind, DomainKey};

/// Number of items a payload holds, as reported in statistics
pub fn item_count(value: &Value) -> u64 {
    match value {
        Value::Array(items) => items.len() as u64,
        Value::Null => 0,
        _ => 1,
    }
}

/// Check a payload against the current typed schema for its domain
///
/// Returns the item count on success.
pub fn check_payload(domain: DomainKey, value: &Value) -> Result<u64, String> {
    match domain {
        DomainKey::Goals => decode_as::<Vec<Goal>>(value)?,
        DomainKey::Habits => decode_as::<Vec<Habit>>(value)?,
        DomainKey::HabitCompletions => decode_as::<Vec<HabitCompletion>>(value)?,
        DomainKey::JournalEntries => decode_as::<Vec<JournalEntry>>(value)?,
        DomainKey::WellnessMetrics => decode_as::<Vec<WellnessMetric>>(value)?,
        DomainKey::Templates => decode_as::<Vec<Template>>(value)?,
        DomainKey::Sessions => decode_as::<Vec<Session>>(value)?,
        DomainKey::Settings => decode_as::<Settings>(value)?,
        DomainKey::ApiCredentials | DomainKey::AuthSession => {
            if !ContainerKind::Document.matches(value) {
                return Err(format!("expected {}", ContainerKind::Document));
            }
        }
    }
    Ok(item_count(value))
}

fn decode_as<T: DeserializeOwned>(value: &Value) -> Result<(), String> {
    serde_json::from_value::<T>(value.clone())
        .map(|_| ())
        .map_err(|e| e.to_string())
}
