//! Build metadata stamped into exports

use serde::{Deserialize, Serialize};

pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub app_version: String,
    /// Short commit hash or CI build number
    pub build_id: String,
}

impl BuildInfo {
    pub fn new(app_version: impl Into<String>, build_id: impl Into<String>) -> Self {
        Self::from_parts(Some(app_version.into()), Some(build_id.into()))
    }

    /// Metadata of the running binary
    ///
    /// `LIFEVAULT_BUILD_ID` is read at compile time; builds without it get a
    /// placeholder instead of failing the export.
    pub fn current() -> Self {
        Self::from_parts(
            Some(env!("CARGO_PKG_VERSION").to_string()),
            option_env!("LIFEVAULT_BUILD_ID").map(str::to_string),
        )
    }

    /// Build from optional parts, substituting placeholders for blanks
    pub fn from_parts(app_version: Option<String>, build_id: Option<String>) -> Self {
        fn or_placeholder(value: Option<String>) -> String {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| UNKNOWN.to_string())
        }

        Self {
            app_version: or_placeholder(app_version),
            build_id: or_placeholder(build_id),
        }
    }
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self::current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_has_package_version() {
        let info = BuildInfo::current();
        assert_eq!(info.app_version, env!("CARGO_PKG_VERSION"));
        assert!(!info.build_id.is_empty());
    }

    #[test]
    fn test_missing_parts_get_placeholder() {
        let info = BuildInfo::from_parts(None, Some("  ".to_string()));
        assert_eq!(info.app_version, UNKNOWN);
        assert_eq!(info.build_id, UNKNOWN);
    }
}
