// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Aggregation of per-trial samples into a summary.
//!
//! Policy:
//! - fewer than `median_threshold` valid samples: median of execution time
//!   and work-unit count, no data discarded;
//! - otherwise: drop values outside `[Q1 - k*IQR, Q3 + k*IQR]` and take the
//!   mean of the rest. `k` defaults to 2.0, wider than the textbook 1.5, so
//!   noisy-but-legitimate trials survive.
//!
//! Resource delta and frame rate are always plain means over every valid
//! sample. Latency percentiles are computed over the pooled latencies of all
//! valid trials.

use serde::{Deserialize, Serialize};

use crate::metrics::{AggregationMethod, LatencySummary, MetricsSample, Summary};

/// Tunables for [`summarize`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregationPolicy {
    /// Below this many valid samples the median is used instead of the
    /// outlier-filtered mean.
    pub median_threshold: usize,
    /// IQR multiplier for outlier bounds.
    pub iqr_multiplier: f64,
    /// Fewer valid samples than this triggers a reliability warning.
    pub min_reliable_samples: usize,
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        Self {
            median_threshold: 7,
            iqr_multiplier: 2.0,
            min_reliable_samples: 3,
        }
    }
}

/// Linear-interpolated percentile, `p` in `[0, 100]`.
///
/// Sorts a copy of `values`, takes rank `r = p/100 * (n-1)` and interpolates
/// between the values at `floor(r)` and `ceil(r)`. Empty input yields 0 and a
/// single value is returned as-is.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    match values.len() {
        0 => return 0.0,
        1 => return values[0],
        _ => {}
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;

    sorted[lower] + fraction * (sorted[upper] - sorted[lower])
}

/// Median (50th percentile).
pub fn median(values: &[f64]) -> f64 {
    percentile(values, 50.0)
}

/// Arithmetic mean, 0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Outcome of IQR outlier removal.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierFilter {
    /// Values inside the bounds, in input order.
    pub kept: Vec<f64>,
    /// Number of values dropped.
    pub removed: usize,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// Drop values outside `[Q1 - k*IQR, Q3 + k*IQR]` (bounds inclusive).
pub fn remove_outliers(values: &[f64], k: f64) -> OutlierFilter {
    if values.is_empty() {
        return OutlierFilter {
            kept: Vec::new(),
            removed: 0,
            lower_bound: 0.0,
            upper_bound: 0.0,
        };
    }

    let q1 = percentile(values, 25.0);
    let q3 = percentile(values, 75.0);
    let iqr = q3 - q1;
    let lower_bound = q1 - k * iqr;
    let upper_bound = q3 + k * iqr;

    let kept: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| *v >= lower_bound && *v <= upper_bound)
        .collect();

    OutlierFilter {
        removed: values.len() - kept.len(),
        kept,
        lower_bound,
        upper_bound,
    }
}

/// Central value of `values` under `policy`.
pub fn central_tendency(values: &[f64], policy: &AggregationPolicy) -> (f64, AggregationMethod) {
    if values.len() < policy.median_threshold {
        return (median(values), AggregationMethod::Median);
    }

    let filtered = remove_outliers(values, policy.iqr_multiplier);
    if filtered.removed > 0 {
        tracing::debug!(
            removed = filtered.removed,
            lower = filtered.lower_bound,
            upper = filtered.upper_bound,
            "Removed outliers"
        );
    }

    let value = if filtered.kept.is_empty() {
        mean(values)
    } else {
        mean(&filtered.kept)
    };
    (value, AggregationMethod::TrimmedMean)
}

/// Reduce valid samples to a [`Summary`].
pub fn summarize(samples: &[MetricsSample], policy: &AggregationPolicy) -> Summary {
    let execution: Vec<f64> = samples.iter().map(|s| s.execution_time_ms).collect();
    let work: Vec<f64> = samples.iter().map(|s| s.work_unit_count as f64).collect();
    let resource: Vec<f64> = samples.iter().map(|s| s.resource_delta_mb).collect();
    let frames: Vec<f64> = samples.iter().map(|s| s.frame_rate).collect();
    let latencies: Vec<f64> = samples
        .iter()
        .flat_map(|s| s.latencies_ms.iter().copied())
        .collect();

    let (execution_time_ms, method) = central_tendency(&execution, policy);
    let (work_unit_count, _) = central_tendency(&work, policy);

    Summary {
        execution_time_ms,
        work_unit_count,
        resource_delta_mb: mean(&resource),
        frame_rate: mean(&frames),
        latency: LatencySummary {
            p50: percentile(&latencies, 50.0),
            p95: percentile(&latencies, 95.0),
            p99: percentile(&latencies, 99.0),
        },
        method,
        valid_trials: samples.len(),
    }
}
