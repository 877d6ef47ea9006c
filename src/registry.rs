//! Domain registry
//!
//! The single authoritative list of persisted domains. Every key the store can
//! hold is a [`DomainKey`] variant, and whether a domain (or a field inside
//! one) may leave the device is decided here and nowhere else.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// JSON container a domain payload is stored as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// A JSON array of records
    Collection,
    /// A single JSON object
    Document,
}

impl ContainerKind {
    /// Check whether a JSON value has this container kind
    pub fn matches(&self, value: &serde_json::Value) -> bool {
        match self {
            Self::Collection => value.is_array(),
            Self::Document => value.is_object(),
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collection => write!(f, "array"),
            Self::Document => write!(f, "object"),
        }
    }
}

/// Identifier for one persisted collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DomainKey {
    Goals,
    Habits,
    HabitCompletions,
    JournalEntries,
    WellnessMetrics,
    Templates,
    Sessions,
    Settings,
    /// Provider API keys
    ApiCredentials,
    /// Sign-in tokens for the sync account
    AuthSession,
}

impl DomainKey {
    /// Every registered domain, in wire order
    pub const ALL: [DomainKey; 10] = [
        Self::Goals,
        Self::Habits,
        Self::HabitCompletions,
        Self::JournalEntries,
        Self::WellnessMetrics,
        Self::Templates,
        Self::Sessions,
        Self::Settings,
        Self::ApiCredentials,
        Self::AuthSession,
    ];

    /// Stable storage and wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Goals => "goals",
            Self::Habits => "habits",
            Self::HabitCompletions => "habit_completions",
            Self::JournalEntries => "journal_entries",
            Self::WellnessMetrics => "wellness_metrics",
            Self::Templates => "templates",
            Self::Sessions => "sessions",
            Self::Settings => "settings",
            Self::ApiCredentials => "api_credentials",
            Self::AuthSession => "auth_session",
        }
    }

    /// Name this domain had inside pre-versioning exports
    pub fn legacy_name(&self) -> &'static str {
        match self {
            Self::Goals => "goals",
            Self::Habits => "habits",
            Self::HabitCompletions => "habitCompletions",
            Self::JournalEntries => "journalEntries",
            Self::WellnessMetrics => "wellnessMetrics",
            Self::Templates => "templates",
            Self::Sessions => "sessions",
            Self::Settings => "settings",
            Self::ApiCredentials => "apiCredentials",
            Self::AuthSession => "authSession",
        }
    }

    /// Look up a domain by its pre-versioning name
    pub fn from_legacy_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.legacy_name() == name)
    }

    pub fn kind(&self) -> ContainerKind {
        match self {
            Self::Settings | Self::ApiCredentials | Self::AuthSession => ContainerKind::Document,
            _ => ContainerKind::Collection,
        }
    }

    /// Secret domains never appear in a snapshot and are never imported
    pub fn is_secret(&self) -> bool {
        matches!(self, Self::ApiCredentials | Self::AuthSession)
    }

    /// Fields stripped from this domain's payload before export
    pub fn redacted_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Settings => &["apiKey", "authToken"],
            _ => &[],
        }
    }

    /// Fields that describe this device rather than the user's data
    ///
    /// On restore these keep their local value regardless of the backup.
    pub fn device_local_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Settings => &["onboardingCompleted", "autoBackupEnabled"],
            _ => &[],
        }
    }

    /// Whether a restore merges this domain into local state instead of replacing it
    pub fn merges_on_restore(&self) -> bool {
        !self.redacted_fields().is_empty() || !self.device_local_fields().is_empty()
    }
}

impl fmt::Display for DomainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a name is not a registered domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDomain(pub String);

impl fmt::Display for UnknownDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unregistered domain '{}'", self.0)
    }
}

impl std::error::Error for UnknownDomain {}

impl FromStr for DomainKey {
    type Err = UnknownDomain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownDomain(s.to_string()))
    }
}

impl Serialize for DomainKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DomainKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// All registered domain keys
pub fn all_domain_keys() -> BTreeSet<DomainKey> {
    DomainKey::ALL.into_iter().collect()
}

/// Keys that are never exported
pub fn excluded_keys() -> BTreeSet<DomainKey> {
    DomainKey::ALL.into_iter().filter(|k| k.is_secret()).collect()
}

/// Keys the exporter walks
pub fn exportable_keys() -> BTreeSet<DomainKey> {
    DomainKey::ALL.into_iter().filter(|k| !k.is_secret()).collect()
}

pub fn is_secret(key: DomainKey) -> bool {
    key.is_secret()
}

/// Names that do not map back to a registered domain
///
/// Used to detect persisted data the registry does not know about.
pub fn unregistered_keys<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .filter(|n| n.as_ref().parse::<DomainKey>().is_err())
        .map(|n| n.as_ref().to_string())
        .collect()
}
