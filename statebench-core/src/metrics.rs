// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Measurement data model.
//!
//! A [`MetricsSample`] is produced once per measured trial and never changes
//! afterwards. An [`AggregateResult`] bundles every sample of one
//! `run_benchmark` call with the [`Summary`] derived from them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sampler::MAX_FRAME_RATE;
use crate::types::{Label, ScenarioId};

/// Exclusive upper bound for any stored time value, in milliseconds.
pub const MAX_TIME_MS: f64 = 1_000_000.0;

/// Check a time value against `[0, MAX_TIME_MS)`.
pub fn is_valid_time_ms(ms: f64) -> bool {
    ms.is_finite() && (0.0..MAX_TIME_MS).contains(&ms)
}

/// Unvalidated trial readings, as computed by the trial controller.
#[derive(Debug, Clone)]
pub struct RawSample {
    pub scenario: ScenarioId,
    pub label: Label,
    pub trial: usize,
    /// Wall-clock time minus artificial delay.
    pub execution_time_ms: f64,
    /// Wall-clock time before any subtraction; fallback for `execution_time_ms`.
    pub raw_elapsed_ms: f64,
    pub work_units: BTreeMap<String, u64>,
    pub resource_delta_mb: f64,
    pub frame_rate: f64,
    pub latencies_ms: Vec<f64>,
}

/// Validated readings of one measured trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSample {
    pub scenario: ScenarioId,
    pub label: Label,
    pub trial: usize,
    pub execution_time_ms: f64,
    pub work_unit_count: u64,
    /// Per-key breakdown of `work_unit_count`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub work_units: BTreeMap<String, u64>,
    pub resource_delta_mb: f64,
    pub frame_rate: f64,
    pub latencies_ms: Vec<f64>,
    pub timestamp: DateTime<Utc>,
}

impl MetricsSample {
    /// Validate raw readings, substituting a safe fallback for any value out
    /// of bounds. Anomalies are logged, never returned as errors.
    pub fn from_raw(raw: RawSample) -> Self {
        let execution_time_ms = if is_valid_time_ms(raw.execution_time_ms) {
            raw.execution_time_ms
        } else {
            let fallback = if is_valid_time_ms(raw.raw_elapsed_ms) {
                raw.raw_elapsed_ms
            } else {
                0.0
            };
            tracing::warn!(
                scenario = %raw.scenario,
                label = %raw.label,
                trial = raw.trial,
                field = "execution_time_ms",
                value = raw.execution_time_ms,
                fallback,
                "Measurement out of bounds"
            );
            fallback
        };

        let resource_delta_mb = if raw.resource_delta_mb.is_finite() && raw.resource_delta_mb >= 0.0
        {
            raw.resource_delta_mb
        } else {
            tracing::warn!(
                scenario = %raw.scenario,
                label = %raw.label,
                trial = raw.trial,
                field = "resource_delta_mb",
                value = raw.resource_delta_mb,
                "Measurement out of bounds"
            );
            0.0
        };

        let frame_rate = if (0.0..=MAX_FRAME_RATE).contains(&raw.frame_rate) {
            raw.frame_rate
        } else {
            tracing::warn!(
                scenario = %raw.scenario,
                label = %raw.label,
                trial = raw.trial,
                field = "frame_rate",
                value = raw.frame_rate,
                "Measurement out of bounds"
            );
            0.0
        };

        let total_latencies = raw.latencies_ms.len();
        let latencies_ms: Vec<f64> = raw
            .latencies_ms
            .into_iter()
            .filter(|ms| is_valid_time_ms(*ms))
            .collect();
        if latencies_ms.len() < total_latencies {
            tracing::warn!(
                scenario = %raw.scenario,
                label = %raw.label,
                trial = raw.trial,
                dropped = total_latencies - latencies_ms.len(),
                "Dropped out-of-bounds latency samples"
            );
        }

        let work_unit_count = raw
            .work_units
            .values()
            .fold(0u64, |acc, n| acc.saturating_add(*n));

        Self {
            scenario: raw.scenario,
            label: raw.label,
            trial: raw.trial,
            execution_time_ms,
            work_unit_count,
            work_units: raw.work_units,
            resource_delta_mb,
            frame_rate,
            latencies_ms,
            timestamp: Utc::now(),
        }
    }

    /// A sample feeds the summary only if its core readings are finite.
    pub fn is_valid(&self) -> bool {
        self.execution_time_ms.is_finite() && self.frame_rate.is_finite()
    }
}

/// Which central-tendency rule produced the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMethod {
    Median,
    TrimmedMean,
}

impl std::fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregationMethod::Median => write!(f, "median"),
            AggregationMethod::TrimmedMean => write!(f, "trimmed_mean"),
        }
    }
}

/// Latency distribution over all operations of all trials.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatencySummary {
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Summary statistics derived from the valid samples of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub execution_time_ms: f64,
    pub work_unit_count: f64,
    pub resource_delta_mb: f64,
    pub frame_rate: f64,
    pub latency: LatencySummary,
    pub method: AggregationMethod,
    pub valid_trials: usize,
}

/// Outcome of one `run_benchmark` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub scenario: ScenarioId,
    pub label: Label,
    pub trials: Vec<MetricsSample>,
    pub summary: Summary,
    pub timestamp: DateTime<Utc>,
}

/// One row of a ranked comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonEntry {
    pub label: Label,
    pub execution_time_ms: f64,
    /// Execution time relative to the fastest entry (fastest = 1.0).
    /// `None` when the fastest entry measured 0ms.
    pub relative: Option<f64>,
}

/// Ranking of results by summary execution time.
pub struct Comparison;

impl Comparison {
    /// Order `results` fastest first.
    pub fn rank(results: &[AggregateResult]) -> Vec<ComparisonEntry> {
        let mut ordered: Vec<&AggregateResult> = results.iter().collect();
        ordered.sort_by(|a, b| {
            a.summary
                .execution_time_ms
                .total_cmp(&b.summary.execution_time_ms)
        });

        let fastest = ordered
            .first()
            .map(|r| r.summary.execution_time_ms)
            .unwrap_or(0.0);

        ordered
            .into_iter()
            .map(|r| ComparisonEntry {
                label: r.label.clone(),
                execution_time_ms: r.summary.execution_time_ms,
                relative: (fastest > 0.0).then(|| r.summary.execution_time_ms / fastest),
            })
            .collect()
    }
}

/// Format milliseconds in human-readable form (auto-selects μs/ms/s).
pub fn format_ms(ms: f64) -> String {
    if ms < 1.0 {
        format!("{:.1}μs", ms * 1_000.0)
    } else if ms < 1_000.0 {
        format!("{:.2}ms", ms)
    } else {
        format!("{:.2}s", ms / 1_000.0)
    }
}
