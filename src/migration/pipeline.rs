//! Ordered chain of single-hop migration steps

use std::fmt;

use serde_json::Value;

use super::legacy::migrate_legacy;
use super::{steps, MigrationError, CURRENT_SCHEMA_VERSION};
use crate::schema::{is_legacy_format, schema_version_of, SCHEMA_VERSION_FIELD};

/// Pure transform from one schema version's JSON to the next
pub type Transform = fn(Value) -> Result<Value, String>;

/// One version hop
#[derive(Clone, Copy)]
pub struct MigrationStep {
    pub from_version: u32,
    pub to_version: u32,
    pub description: &'static str,
    pub transform: Transform,
}

impl MigrationStep {
    pub fn new(from_version: u32, description: &'static str, transform: Transform) -> Self {
        Self {
            from_version,
            to_version: from_version + 1,
            description,
            transform,
        }
    }
}

impl fmt::Debug for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationStep")
            .field("from_version", &self.from_version)
            .field("to_version", &self.to_version)
            .field("description", &self.description)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct MigrationPipeline {
    steps: Vec<MigrationStep>,
    current_version: u32,
}

impl MigrationPipeline {
    /// Build a pipeline, checking the steps form one contiguous chain from 1
    pub fn new(steps: Vec<MigrationStep>) -> Result<Self, MigrationError> {
        for (index, step) in steps.iter().enumerate() {
            let expected = index as u32 + 1;
            if step.from_version != expected {
                return Err(MigrationError::InvalidPipeline(format!(
                    "step {} starts at schema {}, expected {}",
                    index, step.from_version, expected
                )));
            }
            if step.to_version != step.from_version + 1 {
                return Err(MigrationError::InvalidPipeline(format!(
                    "step {} -> {} skips a version",
                    step.from_version, step.to_version
                )));
            }
        }

        let current_version = steps.last().map_or(1, |s| s.to_version);
        Ok(Self {
            steps,
            current_version,
        })
    }

    /// The steps shipped with this build
    pub fn standard() -> Self {
        Self {
            steps: steps::all(),
            current_version: CURRENT_SCHEMA_VERSION,
        }
    }

    pub fn current_version(&self) -> u32 {
        self.current_version
    }

    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    /// Migrate `data` from `from_version` up to `to_version`
    ///
    /// Steps run in order, each fed the previous step's output, and each only
    /// after confirming the data is at exactly its `from_version`. Any
    /// failure discards the intermediate data.
    pub fn migrate(
        &self,
        data: Value,
        from_version: u32,
        to_version: u32,
    ) -> Result<Value, MigrationError> {
        if from_version > to_version {
            return Err(MigrationError::NewerVersion {
                from: from_version,
                to: to_version,
            });
        }
        if from_version == to_version {
            return Ok(data);
        }

        let mut data = data;
        let mut version = from_version;

        if version == 0 {
            if !is_legacy_format(&data) {
                return Err(MigrationError::InvalidLegacy(
                    "data is not in the legacy export shape".to_string(),
                ));
            }
            data = migrate_legacy(&data)?;
            version = 1;
            tracing::info!(from = 0, to = 1, "converted legacy export");
        } else if data.get(SCHEMA_VERSION_FIELD).is_none() {
            if let Some(object) = data.as_object_mut() {
                object.insert(SCHEMA_VERSION_FIELD.to_string(), Value::from(version));
            }
        }

        while version < to_version {
            let step = self
                .steps
                .iter()
                .find(|s| s.from_version == version)
                .ok_or(MigrationError::MissingStep { from: version })?;

            match schema_version_of(&data) {
                Ok(Some(found)) if found == step.from_version => {}
                Ok(found) => {
                    return Err(MigrationError::StepFailed {
                        from: step.from_version,
                        to: step.to_version,
                        reason: format!(
                            "data is at schema {}, step expects {}",
                            found.map_or_else(|| "unknown".to_string(), |v| v.to_string()),
                            step.from_version
                        ),
                    })
                }
                Err(reason) => {
                    return Err(MigrationError::StepFailed {
                        from: step.from_version,
                        to: step.to_version,
                        reason,
                    })
                }
            }

            data = (step.transform)(data).map_err(|reason| MigrationError::StepFailed {
                from: step.from_version,
                to: step.to_version,
                reason,
            })?;

            match data.as_object_mut() {
                Some(object) => {
                    object.insert(
                        SCHEMA_VERSION_FIELD.to_string(),
                        Value::from(step.to_version),
                    );
                }
                None => {
                    return Err(MigrationError::StepFailed {
                        from: step.from_version,
                        to: step.to_version,
                        reason: "step did not return an object".to_string(),
                    })
                }
            }

            tracing::info!(
                from = step.from_version,
                to = step.to_version,
                "applied migration: {}",
                step.description
            );
            version = step.to_version;
        }

        Ok(data)
    }
}
