// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Trial controller: one complete measurement cycle.
//!
//! Every trial gets its own [`TrialRecorder`] (work counter, latency log,
//! artificial-delay accumulator) and its own [`FrameMeter`]. Nothing is
//! reused across trials. The recorder is reachable only through the
//! [`TrialContext`] handed to the workload, and it is sealed when the trial
//! ends, so stray handles cannot leak counts into a later trial.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument as _;

use crate::config::RunConfig;
use crate::error::{BenchError, BenchResult, WorkloadError};
use crate::instrument::{Instrumented, TrialRecorder, WorkUnits};
use crate::metrics::{MetricsSample, RawSample};
use crate::sampler::{as_millis_f64, FrameMeter, ReclaimHook, ResourceSampler, Stopwatch};
use crate::settle::{SettleMode, SettleSignal};
use crate::types::{Label, ScenarioId};

/// Everything a workload receives for one trial.
pub struct TrialContext<A, S> {
    actions: Instrumented<A, S>,
    trial: usize,
    recorder: Arc<TrialRecorder>,
}

impl<A, S> Clone for TrialContext<A, S> {
    fn clone(&self) -> Self {
        Self {
            actions: self.actions.clone(),
            trial: self.trial,
            recorder: Arc::clone(&self.recorder),
        }
    }
}

impl<A, S: SettleSignal> TrialContext<A, S> {
    pub(crate) fn new(
        actions: Instrumented<A, S>,
        trial: usize,
        recorder: Arc<TrialRecorder>,
    ) -> Self {
        Self {
            actions,
            trial,
            recorder,
        }
    }

    /// The instrumented action set.
    pub fn actions(&self) -> &Instrumented<A, S> {
        &self.actions
    }

    /// Zero-based index of this trial within its phase (warmup or measured).
    pub fn trial_index(&self) -> usize {
        self.trial
    }

    /// Check if this is an unmeasured warmup trial.
    pub fn is_warmup(&self) -> bool {
        !self.actions.is_timed()
    }

    /// Handle to this trial's work-unit counter, for passing into code that
    /// should attribute work to the trial.
    pub fn work_units(&self) -> WorkUnits {
        WorkUnits::new(Arc::clone(&self.recorder))
    }

    /// Count one work unit for `key`; returns the key's new count.
    pub fn count(&self, key: &str) -> u64 {
        self.recorder.count(key)
    }

    /// Declare a deliberate pause that must not count toward execution time.
    pub fn track_extra_delay(&self, delay: Duration) {
        self.recorder.add_artificial_delay(delay);
    }
}

/// Seals the recorder when dropped, including during unwinding.
struct SealOnDrop(Arc<TrialRecorder>);

impl Drop for SealOnDrop {
    fn drop(&mut self) {
        self.0.seal();
    }
}

/// Runs individual trials against a shared set of host facilities.
pub struct TrialController<'r, S> {
    config: &'r RunConfig,
    settle: &'r Arc<S>,
    memory: &'r ResourceSampler,
    reclaim: Option<&'r dyn ReclaimHook>,
}

impl<'r, S: SettleSignal> TrialController<'r, S> {
    pub fn new(
        config: &'r RunConfig,
        settle: &'r Arc<S>,
        memory: &'r ResourceSampler,
        reclaim: Option<&'r dyn ReclaimHook>,
    ) -> Self {
        Self {
            config,
            settle,
            memory,
            reclaim,
        }
    }

    /// Reclaim memory, let the host settle, and discard one resource read so
    /// the next real reading starts from a stable state.
    pub async fn prepare(&self) {
        if !self.config.reclaim_between_trials {
            return;
        }

        if let Some(hook) = self.reclaim {
            hook.reclaim();
        }
        if !self.config.reclaim_settle.is_zero() {
            tokio::time::sleep(self.config.reclaim_settle).await;
        }
        let _ = self.memory.read_once();
    }

    /// Execute one measured trial and return its validated sample.
    ///
    /// A workload error aborts the trial with [`BenchError::TrialFailed`]; the
    /// frame meter is stopped and the recorder sealed before it is returned.
    pub async fn run<A, W, Fut>(
        &self,
        scenario: &ScenarioId,
        label: &Label,
        trial: usize,
        actions: &Arc<A>,
        workload: &W,
    ) -> BenchResult<MetricsSample>
    where
        W: Fn(TrialContext<A, S>) -> Fut,
        Fut: Future<Output = Result<(), WorkloadError>>,
    {
        let recorder = Arc::new(TrialRecorder::new(trial));
        let span = tracing::debug_span!(
            "trial",
            scenario = %scenario,
            label = %label,
            trial = trial,
            token = %recorder.token()
        );

        self.run_recorded(scenario, label, recorder, actions, workload)
            .instrument(span)
            .await
    }

    async fn run_recorded<A, W, Fut>(
        &self,
        scenario: &ScenarioId,
        label: &Label,
        recorder: Arc<TrialRecorder>,
        actions: &Arc<A>,
        workload: &W,
    ) -> BenchResult<MetricsSample>
    where
        W: Fn(TrialContext<A, S>) -> Fut,
        Fut: Future<Output = Result<(), WorkloadError>>,
    {
        let trial = recorder.trial();
        self.prepare().await;

        let baseline_mb = self.memory.sample_median().await;
        let watch = Stopwatch::start();

        let seal = SealOnDrop(Arc::clone(&recorder));
        let meter = FrameMeter::start(self.settle.frame_ticks());

        let instrumented = Instrumented::timed(
            Arc::clone(actions),
            Arc::clone(self.settle),
            self.config.settle_mode,
            Arc::clone(&recorder),
        );
        let context = TrialContext::new(instrumented, trial, Arc::clone(&recorder));
        let outcome = workload(context).await;

        let frame_rate = meter.stop();

        if let Err(source) = outcome {
            drop(seal);
            tracing::debug!(error = %source, "Trial aborted");
            return Err(BenchError::TrialFailed {
                scenario: scenario.clone(),
                label: label.clone(),
                trial,
                source,
            });
        }

        // Let trailing updates reach the counter before reading it.
        self.settle.await_settled(SettleMode::WaitForPaint).await;

        let work_units = recorder.work_units();
        let latencies_ms = recorder.latencies_ms();
        let artificial_delay = recorder.artificial_delay();
        drop(seal);

        let post_mb = self.memory.sample_median().await;
        let raw_elapsed = watch.elapsed();

        let execution_time = raw_elapsed.saturating_sub(artificial_delay);

        tracing::debug!(
            raw_ms = as_millis_f64(raw_elapsed),
            artificial_ms = as_millis_f64(artificial_delay),
            operations = latencies_ms.len(),
            frame_rate,
            "Trial complete"
        );

        Ok(MetricsSample::from_raw(RawSample {
            scenario: scenario.clone(),
            label: label.clone(),
            trial,
            execution_time_ms: as_millis_f64(execution_time),
            raw_elapsed_ms: as_millis_f64(raw_elapsed),
            work_units,
            resource_delta_mb: (post_mb - baseline_mb).max(0.0),
            frame_rate,
            latencies_ms,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settle::FixedSettle;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const FRAME: Duration = Duration::from_millis(16);

    #[derive(Default)]
    struct Store {
        writes: AtomicUsize,
    }

    impl Store {
        async fn write(&self, units: &WorkUnits) {
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.writes.fetch_add(1, Ordering::SeqCst);
            units.count("store.write");
        }
    }

    fn quiet_config() -> RunConfig {
        RunConfig {
            reclaim_between_trials: false,
            ..RunConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_trial_collects_all_samplers() {
        let config = quiet_config();
        let settle = Arc::new(FixedSettle::new(Duration::from_millis(4), FRAME));
        let memory = ResourceSampler::disabled();
        let controller = TrialController::new(&config, &settle, &memory, None);

        let scenario = ScenarioId::new("write").unwrap();
        let label = Label::new("store").unwrap();
        let store = Arc::new(Store::default());

        let workload = |ctx: TrialContext<Store, FixedSettle>| async move {
            let units = ctx.work_units();
            for _ in 0..3 {
                ctx.actions().call("write", |s| s.write(&units)).await;
            }
            Ok(())
        };
        let sample = controller
            .run(&scenario, &label, 0, &store, &workload)
            .await
            .unwrap();

        assert_eq!(sample.trial, 0);
        assert_eq!(sample.work_unit_count, 3);
        assert_eq!(sample.work_units.get("store.write"), Some(&3));
        assert_eq!(sample.latencies_ms.len(), 3);
        assert_eq!(sample.frame_rate, 0.0);
        assert_eq!(sample.resource_delta_mb, 0.0);
        // raw = 3 * (5 + 4) + 4 trailing settle = 31ms, minus 3 * 4ms overhead
        assert!(
            (sample.execution_time_ms - 19.0).abs() < 2.0,
            "execution time {}",
            sample.execution_time_ms
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_extra_delay_excluded() {
        let config = quiet_config();
        let settle = Arc::new(FixedSettle::immediate(FRAME));
        let memory = ResourceSampler::disabled();
        let controller = TrialController::new(&config, &settle, &memory, None);

        let scenario = ScenarioId::new("pause").unwrap();
        let label = Label::new("store").unwrap();

        let workload = |ctx: TrialContext<(), FixedSettle>| async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let pause = Duration::from_millis(50);
            tokio::time::sleep(pause).await;
            ctx.track_extra_delay(pause);
            Ok(())
        };
        let sample = controller
            .run(&scenario, &label, 0, &Arc::new(()), &workload)
            .await
            .unwrap();

        assert!(
            (sample.execution_time_ms - 10.0).abs() < 2.0,
            "execution time {}",
            sample.execution_time_ms
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_trial_seals_recorder() {
        let config = quiet_config();
        let settle = Arc::new(FixedSettle::immediate(FRAME));
        let memory = ResourceSampler::disabled();
        let controller = TrialController::new(&config, &settle, &memory, None);

        let scenario = ScenarioId::new("boom").unwrap();
        let label = Label::new("store").unwrap();
        let leaked: Arc<std::sync::Mutex<Option<WorkUnits>>> = Arc::default();
        let slot = Arc::clone(&leaked);

        let workload = move |ctx: TrialContext<(), FixedSettle>| {
            let slot = Arc::clone(&slot);
            async move {
                *slot.lock().unwrap() = Some(ctx.work_units());
                Err::<(), _>(WorkloadError::failed("store exploded"))
            }
        };
        let result = controller
            .run(&scenario, &label, 4, &Arc::new(()), &workload)
            .await;

        match result {
            Err(BenchError::TrialFailed { trial, source, .. }) => {
                assert_eq!(trial, 4);
                assert_eq!(source, WorkloadError::failed("store exploded"));
            }
            other => panic!("expected TrialFailed, got {:?}", other.map(|s| s.trial)),
        }

        let units = leaked.lock().unwrap().take().unwrap();
        assert_eq!(units.count("late"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prepare_waits_settle_delay() {
        let config = RunConfig {
            reclaim_between_trials: true,
            reclaim_settle: Duration::from_millis(50),
            ..RunConfig::default()
        };
        let settle = Arc::new(FixedSettle::immediate(FRAME));
        let memory = ResourceSampler::disabled();
        let controller = TrialController::new(&config, &settle, &memory, None);

        let start = tokio::time::Instant::now();
        controller.prepare().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
