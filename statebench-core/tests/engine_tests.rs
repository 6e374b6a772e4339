// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! End-to-end tests for the measurement engine.
//!
//! Timing runs on tokio's paused clock, so every sleep advances virtual time
//! exactly and the assertions below can use tight tolerances.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use statebench_core::{
    AggregationPolicy, BenchError, BenchmarkRunner, ConfigLoader, FixedSettle, FrameSettle, Label,
    RunConfig, ScenarioId, SettleMode, SettleSignal, TrialContext, TrialCount, WorkUnits,
    WorkloadError,
};

const FRAME: Duration = Duration::from_millis(16);

type Ctx<A> = TrialContext<A, FixedSettle>;

/// Minimal action set: a counter with an async write that takes `cost`.
struct Counter {
    value: AtomicU64,
    cost: Duration,
}

impl Counter {
    fn new(cost: Duration) -> Arc<Self> {
        Arc::new(Self {
            value: AtomicU64::new(0),
            cost,
        })
    }

    async fn add(&self, units: &WorkUnits) -> u64 {
        tokio::time::sleep(self.cost).await;
        units.count("counter.add");
        self.value.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn reset(&self) {
        self.value.store(0, Ordering::SeqCst);
    }
}

fn test_config() -> RunConfig {
    RunConfig {
        warmup_trials: 1,
        warmup_delay: Duration::from_millis(10),
        inter_trial_delay: Duration::from_millis(10),
        reclaim_between_trials: true,
        reclaim_settle: Duration::from_millis(5),
        ..RunConfig::default()
    }
}

fn runner_with(config: RunConfig, settle: FixedSettle) -> BenchmarkRunner<FixedSettle> {
    BenchmarkRunner::with_settle(config, settle)
        .memory_probe(None)
        .reclaim_hook(None)
}

fn runner() -> BenchmarkRunner<FixedSettle> {
    runner_with(test_config(), FixedSettle::immediate(FRAME))
}

fn ids(scenario: &str, label: &str) -> (ScenarioId, Label) {
    (
        ScenarioId::new(scenario).unwrap(),
        Label::new(label).unwrap(),
    )
}

async fn add_n<S: SettleSignal>(
    ctx: TrialContext<Counter, S>,
    n: usize,
) -> Result<(), WorkloadError> {
    let units = ctx.work_units();
    ctx.actions().untimed().reset();
    for _ in 0..n {
        ctx.actions().call("add", |c| c.add(&units)).await;
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_ten_trials() {
    let runner = runner();
    let (scenario, label) = ids("X", "A");

    let result = runner
        .run_benchmark(
            &scenario,
            &label,
            Counter::new(Duration::from_millis(1)),
            |ctx| add_n(ctx, 20),
            TrialCount::new(10).unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(result.scenario, scenario);
    assert_eq!(result.label, label);
    assert_eq!(result.trials.len(), 10);
    assert_eq!(result.summary.valid_trials, 10);
    assert!(result.summary.latency.p50 >= 0.0);
    assert!(result.summary.latency.p95 >= result.summary.latency.p50);
    assert!(result.summary.latency.p99 >= result.summary.latency.p95);
    assert_eq!(result.summary.work_unit_count, 20.0);
    assert_eq!(result.summary.frame_rate, 0.0);
    for (i, trial) in result.trials.iter().enumerate() {
        assert_eq!(trial.trial, i);
        assert_eq!(trial.latencies_ms.len(), 20);
    }

    assert_eq!(runner.get_results().await.len(), 1);
    runner.clear_results().await;
    assert!(runner.get_results().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_trial_isolation() {
    let runner = runner();
    let (scenario, label) = ids("isolation", "counter");

    // Each trial keeps the previous trial's handle and tries to count on it.
    let stale: Arc<Mutex<Option<WorkUnits>>> = Arc::default();
    let seen_tokens: Arc<Mutex<Vec<String>>> = Arc::default();

    let result = runner
        .run_benchmark(
            &scenario,
            &label,
            Counter::new(Duration::from_millis(1)),
            {
                let stale = Arc::clone(&stale);
                let seen_tokens = Arc::clone(&seen_tokens);
                move |ctx: Ctx<Counter>| {
                    let stale = Arc::clone(&stale);
                    let seen_tokens = Arc::clone(&seen_tokens);
                    async move {
                        let units = ctx.work_units();
                        if let Some(previous) = stale.lock().unwrap().replace(units.clone()) {
                            assert_eq!(previous.count("counter.add"), 0);
                        }
                        seen_tokens
                            .lock()
                            .unwrap()
                            .push(units.trial_token().to_string());

                        let n = ctx.trial_index() + 1;
                        for _ in 0..n {
                            ctx.actions().call("add", |c| c.add(&units)).await;
                        }
                        Ok::<(), WorkloadError>(())
                    }
                }
            },
            TrialCount::new(3).unwrap(),
        )
        .await
        .unwrap();

    let counts: Vec<u64> = result.trials.iter().map(|t| t.work_unit_count).collect();
    assert_eq!(counts, vec![1, 2, 3]);

    let mut tokens = seen_tokens.lock().unwrap().clone();
    tokens.sort();
    tokens.dedup();
    // one warmup plus three measured trials, all distinct
    assert_eq!(tokens.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_settle_overhead_subtracted() {
    let config = RunConfig {
        settle_mode: SettleMode::WaitForPaint,
        ..test_config()
    };
    let runner = runner_with(config, FixedSettle::new(Duration::from_millis(10), FRAME));
    let (scenario, label) = ids("overhead", "counter");

    let result = runner
        .run_benchmark(
            &scenario,
            &label,
            Counter::new(Duration::from_millis(30)),
            |ctx| add_n(ctx, 1),
            TrialCount::new(1).unwrap(),
        )
        .await
        .unwrap();

    // 30ms work + 10ms settle per call + 10ms trailing settle, minus the
    // 10ms call settle.
    let trial = &result.trials[0];
    assert!(
        (trial.execution_time_ms - 40.0).abs() < 2.0,
        "execution time {}",
        trial.execution_time_ms
    );
    assert!((trial.latencies_ms[0] - 40.0).abs() < 2.0);
}

#[tokio::test(start_paused = true)]
async fn test_settle_overhead_capped_at_frame_budget() {
    let config = RunConfig {
        settle_mode: SettleMode::NoWait,
        ..test_config()
    };
    let runner = runner_with(config, FixedSettle::new(Duration::from_millis(100), FRAME));
    let (scenario, label) = ids("capped", "counter");

    let result = runner
        .run_benchmark(
            &scenario,
            &label,
            Counter::new(Duration::from_millis(30)),
            |ctx| add_n(ctx, 1),
            TrialCount::new(1).unwrap(),
        )
        .await
        .unwrap();

    // raw = 30 + 100 + 100 trailing = 230ms; only one frame (16ms) removed.
    let exec = result.trials[0].execution_time_ms;
    assert!((exec - 214.0).abs() < 2.0, "execution time {}", exec);
}

#[tokio::test(start_paused = true)]
async fn test_execution_time_never_negative() {
    let runner = runner();
    let (scenario, label) = ids("negative", "counter");

    let result = runner
        .run_benchmark(
            &scenario,
            &label,
            Arc::new(()),
            |ctx: Ctx<()>| async move {
                ctx.track_extra_delay(Duration::from_secs(60));
                Ok::<(), WorkloadError>(())
            },
            TrialCount::new(2).unwrap(),
        )
        .await
        .unwrap();

    assert!(result.trials.iter().all(|t| t.execution_time_ms == 0.0));
    assert_eq!(result.summary.execution_time_ms, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_warmup_failure_is_not_fatal() {
    let runner = runner();
    let (scenario, label) = ids("warmup", "counter");

    let result = runner
        .run_benchmark(
            &scenario,
            &label,
            Counter::new(Duration::from_millis(1)),
            |ctx: Ctx<Counter>| async move {
                if ctx.is_warmup() {
                    return Err(WorkloadError::failed("cold cache"));
                }
                add_n(ctx, 2).await
            },
            TrialCount::new(3).unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(result.trials.len(), 3);
    assert_eq!(runner.get_results().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_trial_failure_aborts_run() {
    let runner = runner();
    let (scenario, label) = ids("failing", "counter");
    let attempts = Arc::new(AtomicU64::new(0));

    let err = runner
        .run_benchmark(
            &scenario,
            &label,
            Counter::new(Duration::from_millis(1)),
            {
                let attempts = Arc::clone(&attempts);
                move |ctx: Ctx<Counter>| {
                    let attempts = Arc::clone(&attempts);
                    async move {
                        if ctx.is_warmup() {
                            return Ok(());
                        }
                        attempts.fetch_add(1, Ordering::SeqCst);
                        if ctx.trial_index() == 2 {
                            return Err(WorkloadError::action("add", "counter overflow"));
                        }
                        add_n(ctx, 1).await
                    }
                }
            },
            TrialCount::new(5).unwrap(),
        )
        .await
        .unwrap_err();

    match err {
        BenchError::TrialFailed {
            scenario: failed_scenario,
            label: failed_label,
            trial,
            source,
        } => {
            assert_eq!(failed_scenario, scenario);
            assert_eq!(failed_label, label);
            assert_eq!(trial, 2);
            assert_eq!(source, WorkloadError::action("add", "counter overflow"));
        }
        other => panic!("unexpected error: {}", other),
    }

    // trials 3 and 4 never ran
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert!(runner.get_results().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_get_results_returns_copies() {
    let runner = runner();
    let (scenario, label) = ids("copies", "counter");

    runner
        .run_benchmark(
            &scenario,
            &label,
            Counter::new(Duration::from_millis(1)),
            |ctx| add_n(ctx, 3),
            TrialCount::new(2).unwrap(),
        )
        .await
        .unwrap();

    let first = runner.get_results().await;
    let mut mutated = runner.get_results().await;
    assert_eq!(first, mutated);

    mutated[0].trials.clear();
    mutated[0].summary.execution_time_ms = -1.0;

    let again = runner.get_results().await;
    assert_eq!(again, first);
    assert_eq!(again[0].trials.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_compare_results_filters_by_scenario() {
    let runner = runner();
    let (list, fast) = ids("list", "fast");
    let (_, slow) = ids("list", "slow");
    let (other, _) = ids("other", "fast");
    let one = TrialCount::new(1).unwrap();

    let runs = [
        (&list, &fast, Duration::from_millis(1)),
        (&list, &slow, Duration::from_millis(5)),
        (&other, &fast, Duration::from_millis(1)),
    ];
    for (scenario, label, cost) in runs {
        runner
            .run_benchmark(scenario, label, Counter::new(cost), |ctx| add_n(ctx, 2), one)
            .await
            .unwrap();
    }

    let compared = runner.compare_results(&list).await;
    assert_eq!(compared.len(), 2);
    assert!(compared.iter().all(|r| r.scenario == list));

    let ranked = statebench_core::Comparison::rank(&compared);
    assert_eq!(ranked[0].label, fast);
    assert_eq!(ranked[1].label, slow);
    assert!(ranked[1].relative.unwrap() > 1.0);
}

#[tokio::test(start_paused = true)]
async fn test_small_and_large_runs_use_different_policies() {
    let runner = runner();
    let (scenario, label) = ids("policy", "counter");

    let small = runner
        .run_benchmark(
            &scenario,
            &label,
            Counter::new(Duration::from_millis(1)),
            |ctx| add_n(ctx, 1),
            TrialCount::new(AggregationPolicy::default().median_threshold - 1).unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(small.summary.method.to_string(), "median");

    let large = runner
        .run_benchmark(
            &scenario,
            &label,
            Counter::new(Duration::from_millis(1)),
            |ctx| add_n(ctx, 1),
            TrialCount::new(AggregationPolicy::default().median_threshold).unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(large.summary.method.to_string(), "trimmed_mean");
}

#[tokio::test(start_paused = true)]
async fn test_runner_from_yaml_config() {
    let config = ConfigLoader::load_string(
        r#"
warmup_trials: 0
measured_trials: 4
inter_trial_delay_ms: 0
reclaim_between_trials: false
settle_mode: no_wait
"#,
    )
    .unwrap();
    let trials = config.measured_trials;
    let runner = runner_with(config, FixedSettle::immediate(FRAME));
    let (scenario, label) = ids("yaml", "counter");

    let result = runner
        .run_benchmark(
            &scenario,
            &label,
            Counter::new(Duration::from_millis(2)),
            |ctx| add_n(ctx, 5),
            trials,
        )
        .await
        .unwrap();

    assert_eq!(result.trials.len(), 4);
    assert_eq!(runner.config().settle_mode, SettleMode::NoWait);
    for trial in &result.trials {
        // 5 * 2ms of work, immediate settle
        assert!((trial.execution_time_ms - 10.0).abs() < 1.5);
    }
}

fn frame_clock_runner(settle_mode: SettleMode) -> BenchmarkRunner<FrameSettle> {
    let config = RunConfig {
        warmup_trials: 0,
        inter_trial_delay: Duration::ZERO,
        reclaim_between_trials: false,
        frame_interval: FRAME,
        settle_mode,
        ..RunConfig::default()
    };
    BenchmarkRunner::new(config)
        .memory_probe(None)
        .reclaim_hook(None)
}

#[tokio::test(start_paused = true)]
async fn test_frame_clock_runner_reports_frame_rate() {
    let runner = frame_clock_runner(SettleMode::WaitForPaint);
    let (scenario, label) = ids("frames", "counter");
    let work = Duration::from_millis(5);
    let nominal_fps = 1.0 / FRAME.as_secs_f64();

    let result = runner
        .run_benchmark(
            &scenario,
            &label,
            Counter::new(work),
            |ctx| add_n(ctx, 10),
            TrialCount::new(3).unwrap(),
        )
        .await
        .unwrap();

    let frame_ms = FRAME.as_secs_f64() * 1_000.0;
    let work_ms = work.as_secs_f64() * 1_000.0;
    for trial in &result.trials {
        assert!(trial.frame_rate > 0.0 && trial.frame_rate <= 1_000.0);
        assert!(
            (trial.frame_rate - nominal_fps).abs() < nominal_fps * 0.15,
            "fps {}",
            trial.frame_rate
        );

        assert_eq!(trial.latencies_ms.len(), 10);
        for latency in &trial.latencies_ms {
            assert!(*latency >= work_ms);
            let bound = work_ms + 2.0 * frame_ms + 1.0;
            assert!(*latency <= bound, "latency {}", latency);
        }

        // Per-call settle waits are subtracted; the trailing settle is not.
        assert!(trial.execution_time_ms >= 10.0 * work_ms);
        let bound = 10.0 * work_ms + 2.0 * frame_ms + 2.0;
        assert!(
            trial.execution_time_ms <= bound,
            "exec {}",
            trial.execution_time_ms
        );
    }
    assert!(result.summary.frame_rate > 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_frame_clock_no_wait_caps_at_one_frame() {
    let runner = frame_clock_runner(SettleMode::NoWait);
    let (scenario, label) = ids("frames", "no-wait");
    let work_ms = 5.0;
    let frame_ms = FRAME.as_secs_f64() * 1_000.0;

    let result = runner
        .run_benchmark(
            &scenario,
            &label,
            Counter::new(Duration::from_millis(5)),
            |ctx| add_n(ctx, 10),
            TrialCount::new(2).unwrap(),
        )
        .await
        .unwrap();

    for trial in &result.trials {
        assert!(trial.frame_rate > 0.0);
        for latency in &trial.latencies_ms {
            let bound = work_ms + frame_ms + 1.0;
            assert!(*latency <= bound, "latency {}", latency);
        }
    }
}
