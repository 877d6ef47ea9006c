//! Current-schema record types for the collection domains
//!
//! Only the fields the current schema version mandates are typed. Everything
//! else a record carries is kept in `extra` so decoding never drops data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Macro to generate records whose only required field is `id`
macro_rules! define_record {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            /// Stable record identifier
            pub id: String,

            /// Fields the engine does not interpret
            #[serde(flatten)]
            pub extra: Map<String, Value>,
        }

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self {
                    id: id.into(),
                    extra: Map::new(),
                }
            }

            /// Attach an uninterpreted field
            pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
                self.extra.insert(key.into(), value);
                self
            }
        }
    };
}

define_record!(
    /// A user goal
    Goal
);
define_record!(
    /// A single check-off of a habit
    HabitCompletion
);
define_record!(WellnessMetric);
define_record!(
    /// A reusable journal or goal template
    Template
);
define_record!(
    /// A recorded coaching session
    Session
);

/// A recurring habit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,

    /// Recurrence, e.g. "daily" or "weekly" (required since schema 2)
    pub frequency: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Habit {
    pub fn new(id: impl Into<String>, frequency: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            frequency: frequency.into(),
            extra: Map::new(),
        }
    }
}

/// A journal entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,

    /// Tags (an array since schema 3)
    pub tags: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JournalEntry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tags: Vec::new(),
            extra: Map::new(),
        }
    }
}
