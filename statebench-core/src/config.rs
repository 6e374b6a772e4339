// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML run configuration with strict schema validation.
//!
//! Every field has a default, so an empty document is a valid configuration.
//! Any out-of-range field results in a HardValidationError.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, BenchResult, HardValidationError};
use crate::settle::SettleMode;
use crate::stats::AggregationPolicy;
use crate::types::{Label, ScenarioId, TrialCount, MAX_TRIALS};

/// Raw scenario as parsed from YAML (before validation).
#[derive(Debug, Deserialize)]
struct RawScenarioConfig {
    id: String,
    workload: String,
    #[serde(default = "default_operations")]
    operations: u32,
    #[serde(default)]
    strategies: Vec<String>,
    #[serde(default)]
    trials: Option<usize>,
}

fn default_operations() -> u32 {
    100
}

/// Raw root configuration file.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawRunConfig {
    warmup_trials: usize,
    measured_trials: usize,
    warmup_delay_ms: u64,
    inter_trial_delay_ms: u64,
    reclaim_between_trials: bool,
    reclaim_settle_ms: u64,
    memory_samples: usize,
    memory_sample_spacing_ms: u64,
    frame_interval_us: u64,
    settle_mode: SettleMode,
    median_threshold: usize,
    iqr_multiplier: f64,
    min_reliable_samples: usize,
    scenarios: Vec<RawScenarioConfig>,
}

impl Default for RawRunConfig {
    fn default() -> Self {
        Self {
            warmup_trials: 1,
            measured_trials: 10,
            warmup_delay_ms: 100,
            inter_trial_delay_ms: 100,
            reclaim_between_trials: true,
            reclaim_settle_ms: 50,
            memory_samples: 3,
            memory_sample_spacing_ms: 5,
            frame_interval_us: 16_667, // ~60Hz
            settle_mode: SettleMode::WaitForPaint,
            median_threshold: 7,
            iqr_multiplier: 2.0,
            min_reliable_samples: 3,
            scenarios: Vec::new(),
        }
    }
}

/// Validated scenario entry, consumed by the CLI host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub id: ScenarioId,
    pub workload: String,
    pub operations: u32,
    pub strategies: Vec<Label>,
    pub trials: Option<TrialCount>,
}

/// Validated engine configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub warmup_trials: usize,
    pub measured_trials: TrialCount,
    pub warmup_delay: Duration,
    pub inter_trial_delay: Duration,
    pub reclaim_between_trials: bool,
    pub reclaim_settle: Duration,
    pub memory_samples: usize,
    pub memory_sample_spacing: Duration,
    pub frame_interval: Duration,
    pub settle_mode: SettleMode,
    pub policy: AggregationPolicy,
    pub scenarios: Vec<ScenarioConfig>,
}

impl Default for RunConfig {
    fn default() -> Self {
        let raw = RawRunConfig::default();
        Self::from_checked(raw, TrialCount::default(), Vec::new())
    }
}

impl RunConfig {
    /// Assemble from raw values whose bounds have already been checked.
    fn from_checked(
        raw: RawRunConfig,
        measured_trials: TrialCount,
        scenarios: Vec<ScenarioConfig>,
    ) -> Self {
        Self {
            warmup_trials: raw.warmup_trials,
            measured_trials,
            warmup_delay: Duration::from_millis(raw.warmup_delay_ms),
            inter_trial_delay: Duration::from_millis(raw.inter_trial_delay_ms),
            reclaim_between_trials: raw.reclaim_between_trials,
            reclaim_settle: Duration::from_millis(raw.reclaim_settle_ms),
            memory_samples: raw.memory_samples,
            memory_sample_spacing: Duration::from_millis(raw.memory_sample_spacing_ms),
            frame_interval: Duration::from_micros(raw.frame_interval_us),
            settle_mode: raw.settle_mode,
            policy: AggregationPolicy {
                median_threshold: raw.median_threshold,
                iqr_multiplier: raw.iqr_multiplier,
                min_reliable_samples: raw.min_reliable_samples,
            },
            scenarios,
        }
    }
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a YAML file.
    pub fn load_file(path: impl AsRef<Path>) -> BenchResult<RunConfig> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(BenchError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| BenchError::Io {
            context: "reading config file",
            source: e,
        })?;

        Self::load_string(&content)
    }

    /// Load and validate configuration from a YAML string.
    pub fn load_string(content: &str) -> BenchResult<RunConfig> {
        // An empty document deserializes to `null`, which means "all defaults".
        let raw: Option<RawRunConfig> =
            serde_yaml::from_str(content).map_err(|e| BenchError::ConfigParse {
                message: format!("YAML parse error: {}", e),
            })?;

        Ok(Self::validate(raw.unwrap_or_default())?)
    }

    /// Validate raw configuration and convert to validated types.
    fn validate(mut raw: RawRunConfig) -> Result<RunConfig, HardValidationError> {
        if raw.warmup_trials > 100 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "warmup_trials",
                value: raw.warmup_trials.to_string(),
                reason: "Must not exceed 100".to_string(),
            });
        }

        let measured_trials = TrialCount::new(raw.measured_trials)?;

        if raw.memory_samples == 0 || raw.memory_samples > 15 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "memory_samples",
                value: raw.memory_samples.to_string(),
                reason: "Must be between 1 and 15".to_string(),
            });
        }

        if !(1_000..=1_000_000).contains(&raw.frame_interval_us) {
            return Err(HardValidationError::InvalidFieldValue {
                field: "frame_interval_us",
                value: raw.frame_interval_us.to_string(),
                reason: "Must be between 1000us (1000Hz) and 1000000us (1Hz)".to_string(),
            });
        }

        if raw.median_threshold == 0 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "median_threshold",
                value: "0".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        if !raw.iqr_multiplier.is_finite() || raw.iqr_multiplier <= 0.0 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "iqr_multiplier",
                value: raw.iqr_multiplier.to_string(),
                reason: "Must be a finite number greater than 0".to_string(),
            });
        }

        let raw_scenarios = std::mem::take(&mut raw.scenarios);
        let mut scenarios = Vec::with_capacity(raw_scenarios.len());
        let mut seen_ids = HashSet::new();

        for (index, raw_scenario) in raw_scenarios.into_iter().enumerate() {
            let scenario = Self::validate_scenario(raw_scenario, index)?;

            if !seen_ids.insert(scenario.id.clone()) {
                return Err(HardValidationError::DuplicateScenarioId {
                    id: scenario.id.to_string(),
                });
            }

            scenarios.push(scenario);
        }

        Ok(RunConfig::from_checked(raw, measured_trials, scenarios))
    }

    /// Validate a single scenario entry.
    fn validate_scenario(
        raw: RawScenarioConfig,
        index: usize,
    ) -> Result<ScenarioConfig, HardValidationError> {
        let context = format!("scenario at index {}", index);

        let id = ScenarioId::new(raw.id)?;

        if raw.workload.trim().is_empty() {
            return Err(HardValidationError::MissingRequiredField {
                field: "workload",
                context,
            });
        }

        if raw.operations == 0 || raw.operations > 1_000_000 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "operations",
                value: raw.operations.to_string(),
                reason: "Must be between 1 and 1000000".to_string(),
            });
        }

        if raw.strategies.is_empty() {
            return Err(HardValidationError::MissingRequiredField {
                field: "strategies",
                context,
            });
        }

        let strategies = raw
            .strategies
            .into_iter()
            .map(Label::new)
            .collect::<Result<Vec<_>, _>>()?;

        let trials = raw
            .trials
            .map(|t| {
                TrialCount::new(t).map_err(|_| HardValidationError::InvalidFieldValue {
                    field: "trials",
                    value: t.to_string(),
                    reason: format!("Must be between 1 and {} in {}", MAX_TRIALS, context),
                })
            })
            .transpose()?;

        Ok(ScenarioConfig {
            id,
            workload: raw.workload,
            operations: raw.operations,
            strategies,
            trials,
        })
    }
}
