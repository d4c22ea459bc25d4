//! Analyzer configuration.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// An individually switchable check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Inspection {
    InvalidTypes,
    InvalidDotOperation,
    /// Instrument `types` statements with render-time guards.
    TypeAssertions,
    InvalidConstant,
    InvalidEnumCase,
    BadArgumentCount,
    InvalidNamedArgument,
    PositionalAfterNamed,
    RequiredAfterOptional,
    UndeclaredVariableInMacro,
    UnknownMacro,
}

impl Inspection {
    pub const ALL: [Inspection; 11] = [
        Inspection::InvalidTypes,
        Inspection::InvalidDotOperation,
        Inspection::TypeAssertions,
        Inspection::InvalidConstant,
        Inspection::InvalidEnumCase,
        Inspection::BadArgumentCount,
        Inspection::InvalidNamedArgument,
        Inspection::PositionalAfterNamed,
        Inspection::RequiredAfterOptional,
        Inspection::UndeclaredVariableInMacro,
        Inspection::UnknownMacro,
    ];

    fn all() -> BTreeSet<Inspection> {
        Self::ALL.into_iter().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Enabled checks. Defaults to all of them.
    #[serde(default = "Inspection::all")]
    pub inspections: BTreeSet<Inspection>,
    /// Environment-wide variables, declared everywhere including macro bodies.
    #[serde(default)]
    pub globals: Vec<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            inspections: Inspection::all(),
            globals: Vec::new(),
        }
    }
}

impl AnalyzerConfig {
    /// Parse a JSON configuration such as
    /// `{"inspections": ["invalid_types"], "globals": ["app"]}`.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        // The derived visitor also takes the sequence form, so `[]` would
        // otherwise pass as an all-defaults config.
        let value: serde_json::Value = serde_json::from_str(json)?;
        if !value.is_object() {
            return Err(ConfigError::NotAnObject);
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Only the given checks.
    pub fn only(inspections: &[Inspection]) -> Self {
        Self {
            inspections: inspections.iter().copied().collect(),
            globals: Vec::new(),
        }
    }

    pub fn without(mut self, inspection: Inspection) -> Self {
        self.inspections.remove(&inspection);
        self
    }

    pub fn with_global(mut self, name: &str) -> Self {
        self.globals.push(name.to_string());
        self
    }

    pub fn is_enabled(&self, inspection: Inspection) -> bool {
        self.inspections.contains(&inspection)
    }

    pub fn is_global(&self, name: &str) -> bool {
        self.globals.iter().any(|g| g == name)
    }
}
