// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers for validated inputs.
//!
//! Scenario names, strategy labels and trial counts are validated once at
//! construction so the engine never has to re-check them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::HardValidationError;

/// Maximum length of a scenario id or label.
const MAX_NAME_LEN: usize = 128;
/// Smallest measured run the engine accepts.
pub const MIN_TRIALS: usize = 1;
/// Largest measured run the engine accepts.
pub const MAX_TRIALS: usize = 10_000;

fn validate_name(field: &'static str, value: String) -> Result<String, HardValidationError> {
    if value.trim().is_empty() {
        return Err(HardValidationError::InvalidFieldValue {
            field,
            value,
            reason: "Name cannot be empty".to_string(),
        });
    }

    if value.chars().count() > MAX_NAME_LEN {
        return Err(HardValidationError::InvalidFieldValue {
            field,
            value: value.clone(),
            reason: format!(
                "Name too long: {} chars (max {})",
                value.chars().count(),
                MAX_NAME_LEN
            ),
        });
    }

    if value.chars().any(char::is_control) {
        return Err(HardValidationError::InvalidFieldValue {
            field,
            value,
            reason: "Name must not contain control characters".to_string(),
        });
    }

    Ok(value)
}

/// Validated scenario identifier (the workload being compared).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScenarioId(String);

impl ScenarioId {
    /// Create a new ScenarioId with validation.
    pub fn new(id: impl Into<String>) -> Result<Self, HardValidationError> {
        validate_name("scenario", id.into()).map(Self)
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ScenarioId {
    type Error = HardValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ScenarioId> for String {
    fn from(id: ScenarioId) -> Self {
        id.0
    }
}

/// Validated label naming the strategy under test within a scenario.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Label(String);

impl Label {
    /// Create a new Label with validation.
    pub fn new(label: impl Into<String>) -> Result<Self, HardValidationError> {
        validate_name("label", label.into()).map(Self)
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Label {
    type Error = HardValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        label.0
    }
}

/// Validated number of measured trials.
/// Must be between MIN_TRIALS and MAX_TRIALS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct TrialCount(usize);

impl TrialCount {
    /// Create a new TrialCount with bounds validation.
    pub fn new(count: usize) -> Result<Self, HardValidationError> {
        if !(MIN_TRIALS..=MAX_TRIALS).contains(&count) {
            return Err(HardValidationError::TrialCountOutOfBounds {
                count,
                min: MIN_TRIALS,
                max: MAX_TRIALS,
            });
        }
        Ok(Self(count))
    }

    /// Get the number of trials.
    pub fn get(&self) -> usize {
        self.0
    }
}

impl Default for TrialCount {
    fn default() -> Self {
        Self(10)
    }
}

impl fmt::Display for TrialCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<usize> for TrialCount {
    type Error = HardValidationError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TrialCount> for usize {
    fn from(count: TrialCount) -> Self {
        count.0
    }
}
