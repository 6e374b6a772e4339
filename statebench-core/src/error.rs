// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Custom error types for statebench.
//!
//! Explicit enum error types only. No `Box<dyn Error>`, no `anyhow::Result`
//! inside the library - every failure path is strongly typed.
//!
//! Measurement anomalies (NaN, negative or out-of-bound samples) are *not*
//! errors: they are logged and replaced with a fallback value when the
//! sample is constructed. See [`crate::metrics::MetricsSample::from_raw`].

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{Label, ScenarioId};

/// Top-level error type for the benchmark engine.
#[derive(Debug, Error)]
pub enum BenchError {
    // =========================================================================
    // Configuration Errors - Fail-Fast on Invalid Config
    // =========================================================================
    #[error("Hard validation error: {0}")]
    HardValidation(#[from] HardValidationError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    // =========================================================================
    // Trial Errors - Abort Remaining Trials of the Run
    // =========================================================================
    #[error("Trial {trial} of {scenario}/{label} failed: {source}")]
    TrialFailed {
        scenario: ScenarioId,
        label: Label,
        trial: usize,
        #[source]
        source: WorkloadError,
    },

    // =========================================================================
    // System Errors
    // =========================================================================
    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Hard validation errors reject a configuration or identifier outright.
#[derive(Debug, Error)]
pub enum HardValidationError {
    #[error("Missing required field: {field} in {context}")]
    MissingRequiredField {
        field: &'static str,
        context: String,
    },

    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Trial count out of bounds: {count} (min: {min}, max: {max})")]
    TrialCountOutOfBounds {
        count: usize,
        min: usize,
        max: usize,
    },

    #[error("Duplicate scenario ID: {id}")]
    DuplicateScenarioId { id: String },
}

/// Failures reported by a workload.
///
/// A workload returning one of these during a measured trial aborts the
/// remaining trials of that run. During warmup it is logged and ignored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkloadError {
    #[error("Workload failed: {reason}")]
    Failed { reason: String },

    #[error("Action '{action}' failed: {reason}")]
    Action {
        action: &'static str,
        reason: String,
    },
}

impl WorkloadError {
    /// Shorthand for [`WorkloadError::Failed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`WorkloadError::Action`].
    pub fn action(action: &'static str, reason: impl Into<String>) -> Self {
        Self::Action {
            action,
            reason: reason.into(),
        }
    }
}

/// Result type alias using BenchError.
pub type BenchResult<T> = Result<T, BenchError>;
