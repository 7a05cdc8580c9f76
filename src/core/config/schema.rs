//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Validation
//!
//! Values are validated after parsing: a scope filter must name at least
//! one scope and may not repeat one.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::evolution::detect::ChangeOrder;
use crate::model::Scope;

/// The configuration file.
///
/// # Example
///
/// ```toml
/// [detection]
/// verify = true
/// order = "scope"
/// scopes = ["attributes", "components"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Detection defaults
    pub detection: Option<DetectionConfig>,
}

impl ConfigFile {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(detection) = &self.detection {
            detection.validate()?;
        }
        Ok(())
    }
}

/// Defaults for detection passes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DetectionConfig {
    /// Verify every detected change
    pub verify: Option<bool>,

    /// Result ordering
    pub order: Option<ChangeOrder>,

    /// Scopes to inspect (omitted = all)
    pub scopes: Option<Vec<Scope>>,
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(scopes) = &self.scopes {
            if scopes.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "detection.scopes must name at least one scope".into(),
                ));
            }
            let mut seen = BTreeSet::new();
            for scope in scopes {
                if !seen.insert(*scope) {
                    return Err(ConfigError::InvalidValue(format!(
                        "detection.scopes lists '{scope}' more than once"
                    )));
                }
            }
        }
        Ok(())
    }
}
