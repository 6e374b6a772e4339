//! Statebench Core Library
//!
//! Trial measurement and aggregation engine. Runs a workload against an
//! action set for a number of isolated trials and reports execution time,
//! work-unit counts, resource deltas, frame rate and operation latency
//! percentiles, with outlier-robust aggregation.

pub mod config;
pub mod error;
pub mod instrument;
pub mod metrics;
pub mod runner;
pub mod sampler;
pub mod settle;
pub mod stats;
pub mod store;
pub mod trial;
pub mod types;

// Re-export commonly used types
pub use config::{ConfigLoader, RunConfig, ScenarioConfig};
pub use error::{BenchError, BenchResult, HardValidationError, WorkloadError};
pub use instrument::{Instrumented, WorkUnits};
pub use metrics::{AggregateResult, Comparison, ComparisonEntry, MetricsSample, Summary};
pub use runner::BenchmarkRunner;
pub use settle::{FixedSettle, FrameSettle, SettleMode, SettleSignal};
pub use stats::AggregationPolicy;
pub use store::ResultStore;
pub use trial::TrialContext;
pub use types::{Label, ScenarioId, TrialCount};
