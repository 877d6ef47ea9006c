//! Registered schema steps
//!
//! Each step receives the whole decoded envelope and may only touch the
//! domains it is about. Domains it does not know pass through unchanged.

use serde_json::{Map, Value};

use super::pipeline::MigrationStep;
use crate::models::settings::default_theme;
use crate::registry::DomainKey;
use crate::schema::DOMAINS_FIELD;

const DEFAULT_HABIT_FREQUENCY: &str = "daily";

/// Every step, in order. Append here when bumping the schema version.
pub(super) fn all() -> Vec<MigrationStep> {
    vec![
        MigrationStep::new(1, "habits: frequency becomes required", habit_frequency_required),
        MigrationStep::new(
            2,
            "journal: tags become an array; settings: theme becomes required",
            journal_tags_and_theme,
        ),
    ]
}

/// 1 -> 2: backfill `frequency` on every habit lacking one
fn habit_frequency_required(mut data: Value) -> Result<Value, String> {
    if let Some(records) = records_mut(&mut data, DomainKey::Habits)? {
        for record in records.iter_mut().filter_map(Value::as_object_mut) {
            backfill(record, "frequency", || Value::from(DEFAULT_HABIT_FREQUENCY));
        }
    }
    Ok(data)
}

/// 2 -> 3: journal `tags` as an array, settings `theme` present
fn journal_tags_and_theme(mut data: Value) -> Result<Value, String> {
    if let Some(records) = records_mut(&mut data, DomainKey::JournalEntries)? {
        for record in records.iter_mut().filter_map(Value::as_object_mut) {
            let tags = match record.remove("tags") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(tags)) => tags,
                Some(Value::String(joined)) => split_tags(&joined),
                Some(other) => {
                    return Err(format!(
                        "journal entry {} has tags of unsupported type: {}",
                        record.get("id").map_or_else(|| "?".to_string(), Value::to_string),
                        other
                    ))
                }
            };
            record.insert("tags".to_string(), Value::Array(tags));
        }
    }

    if let Some(settings) = document_mut(&mut data, DomainKey::Settings)? {
        backfill(settings, "theme", || Value::from(default_theme()));
    }

    Ok(data)
}

fn split_tags(joined: &str) -> Vec<Value> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(Value::from)
        .collect()
}

/// Insert a default when the field is absent or null
fn backfill(record: &mut Map<String, Value>, field: &str, default: impl FnOnce() -> Value) {
    match record.get(field) {
        None | Some(Value::Null) => {
            record.insert(field.to_string(), default());
        }
        Some(_) => {}
    }
}

fn records_mut(data: &mut Value, domain: DomainKey) -> Result<Option<&mut Vec<Value>>, String> {
    match domain_mut(data, domain) {
        None => Ok(None),
        Some(Value::Array(records)) => Ok(Some(records)),
        Some(_) => Err(format!("domain '{}' must be an array", domain)),
    }
}

fn document_mut(
    data: &mut Value,
    domain: DomainKey,
) -> Result<Option<&mut Map<String, Value>>, String> {
    match domain_mut(data, domain) {
        None => Ok(None),
        Some(Value::Object(object)) => Ok(Some(object)),
        Some(_) => Err(format!("domain '{}' must be an object", domain)),
    }
}

fn domain_mut(data: &mut Value, domain: DomainKey) -> Option<&mut Value> {
    data.get_mut(DOMAINS_FIELD)?.get_mut(domain.as_str())
}
