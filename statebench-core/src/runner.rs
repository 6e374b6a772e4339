// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Run orchestrator.
//!
//! [`BenchmarkRunner::run_benchmark`] executes warmup trials through the
//! pass-through wrapper, then the measured trials one after another, then
//! aggregates the valid samples and appends the result to the store.

use std::future::Future;
use std::sync::Arc;

use crate::config::RunConfig;
use crate::error::{BenchResult, WorkloadError};
use crate::instrument::{Instrumented, TrialRecorder};
use crate::metrics::{format_ms, AggregateResult, MetricsSample};
use crate::sampler::{
    default_reclaim_hook, MemoryProbe, ProcessMemoryProbe, ReclaimHook, ResourceSampler,
};
use crate::settle::{FrameSettle, SettleSignal};
use crate::stats::summarize;
use crate::store::ResultStore;
use crate::trial::{TrialContext, TrialController};
use crate::types::{Label, ScenarioId, TrialCount};

/// Measures workloads and keeps their results.
pub struct BenchmarkRunner<S = FrameSettle> {
    config: RunConfig,
    settle: Arc<S>,
    memory: ResourceSampler,
    reclaim: Option<Box<dyn ReclaimHook>>,
    store: ResultStore,
}

impl BenchmarkRunner<FrameSettle> {
    /// Runner driven by a frame clock at `config.frame_interval`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: RunConfig) -> Self {
        let settle = FrameSettle::start(config.frame_interval);
        Self::with_settle(config, settle)
    }
}

impl<S: SettleSignal> BenchmarkRunner<S> {
    /// Runner using a caller-provided settle signal. Process memory sampling
    /// and the platform reclaim hook are attached when available.
    pub fn with_settle(config: RunConfig, settle: S) -> Self {
        let probe = ProcessMemoryProbe::current().map(|p| Box::new(p) as Box<dyn MemoryProbe>);
        if probe.is_none() {
            tracing::warn!("Process memory probe unavailable, resource deltas will be 0");
        }

        let memory =
            ResourceSampler::new(probe, config.memory_samples, config.memory_sample_spacing);

        Self {
            config,
            settle: Arc::new(settle),
            memory,
            reclaim: default_reclaim_hook(),
            store: ResultStore::new(),
        }
    }

    /// Replace the memory probe. `None` disables resource sampling.
    pub fn memory_probe(mut self, probe: Option<Box<dyn MemoryProbe>>) -> Self {
        self.memory = ResourceSampler::new(
            probe,
            self.config.memory_samples,
            self.config.memory_sample_spacing,
        );
        self
    }

    /// Replace the forced-reclamation hook. `None` skips reclamation but
    /// keeps the settle delay.
    pub fn reclaim_hook(mut self, hook: Option<Box<dyn ReclaimHook>>) -> Self {
        self.reclaim = hook;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn settle(&self) -> &S {
        &self.settle
    }

    /// Measure `workload` over `actions` for `trials` measured trials.
    ///
    /// Warmup failures are logged and ignored. The first measured trial that
    /// fails aborts the run; nothing is stored in that case.
    pub async fn run_benchmark<A, W, Fut>(
        &self,
        scenario: &ScenarioId,
        label: &Label,
        actions: Arc<A>,
        workload: W,
        trials: TrialCount,
    ) -> BenchResult<AggregateResult>
    where
        W: Fn(TrialContext<A, S>) -> Fut,
        Fut: Future<Output = Result<(), WorkloadError>>,
    {
        tracing::debug!(
            scenario = %scenario,
            label = %label,
            warmup = self.config.warmup_trials,
            trials = trials.get(),
            "Starting benchmark"
        );

        self.warmup(scenario, label, &actions, &workload).await;

        let controller = TrialController::new(
            &self.config,
            &self.settle,
            &self.memory,
            self.reclaim.as_deref(),
        );

        let mut samples: Vec<MetricsSample> = Vec::with_capacity(trials.get());
        for trial in 0..trials.get() {
            let sample = controller
                .run(scenario, label, trial, &actions, &workload)
                .await?;
            tracing::debug!(
                trial = trial,
                execution_ms = sample.execution_time_ms,
                work_units = sample.work_unit_count,
                "Measured trial"
            );
            samples.push(sample);

            if !self.config.inter_trial_delay.is_zero() {
                tokio::time::sleep(self.config.inter_trial_delay).await;
            }
        }

        let valid: Vec<MetricsSample> = samples.iter().filter(|s| s.is_valid()).cloned().collect();
        if valid.len() < self.config.policy.min_reliable_samples {
            tracing::warn!(
                scenario = %scenario,
                label = %label,
                valid = valid.len(),
                required = self.config.policy.min_reliable_samples,
                "Too few valid samples for a reliable summary"
            );
        }

        let summary = summarize(&valid, &self.config.policy);
        let result = AggregateResult {
            scenario: scenario.clone(),
            label: label.clone(),
            trials: samples,
            summary,
            timestamp: chrono::Utc::now(),
        };

        tracing::info!(
            scenario = %scenario,
            label = %label,
            execution = %format_ms(result.summary.execution_time_ms),
            method = %result.summary.method,
            p50 = %format_ms(result.summary.latency.p50),
            p95 = %format_ms(result.summary.latency.p95),
            valid_trials = result.summary.valid_trials,
            "Benchmark complete"
        );

        self.store.push(result.clone()).await;
        Ok(result)
    }

    async fn warmup<A, W, Fut>(
        &self,
        scenario: &ScenarioId,
        label: &Label,
        actions: &Arc<A>,
        workload: &W,
    ) where
        W: Fn(TrialContext<A, S>) -> Fut,
        Fut: Future<Output = Result<(), WorkloadError>>,
    {
        for index in 0..self.config.warmup_trials {
            // Warmup work is never read, the recorder only keeps the context whole.
            let recorder = Arc::new(TrialRecorder::new(index));
            let context = TrialContext::new(
                Instrumented::pass_through(Arc::clone(actions)),
                index,
                Arc::clone(&recorder),
            );

            if let Err(e) = workload(context).await {
                tracing::warn!(
                    scenario = %scenario,
                    label = %label,
                    warmup = index,
                    error = %e,
                    "Warmup trial failed"
                );
            }
            recorder.seal();

            let last = index + 1 == self.config.warmup_trials;
            if !last && !self.config.warmup_delay.is_zero() {
                tokio::time::sleep(self.config.warmup_delay).await;
            }
        }
    }

    /// Copy of every stored result, in completion order.
    pub async fn get_results(&self) -> Vec<AggregateResult> {
        self.store.results().await
    }

    pub async fn clear_results(&self) {
        self.store.clear().await;
    }

    /// Stored results for `scenario`.
    pub async fn compare_results(&self, scenario: &ScenarioId) -> Vec<AggregateResult> {
        self.store.by_scenario(scenario).await
    }

    /// Stored results for `label`, across scenarios.
    pub async fn results_for_label(&self, label: &Label) -> Vec<AggregateResult> {
        self.store.by_label(label).await
    }
}
