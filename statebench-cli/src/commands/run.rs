// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `statebench run` command - Measure every configured scenario.
//!
//! Each (scenario, strategy) pair is one `run_benchmark` call on a shared
//! runner. After a scenario's strategies have all run, its results are ranked
//! by execution time.

use std::sync::Arc;

use anyhow::{bail, Context};
use statebench_core::metrics::format_ms;
use statebench_core::{AggregateResult, BenchmarkRunner, Comparison, ScenarioConfig, TrialCount};

use crate::scenarios;
use crate::strategies::{StateStrategy, StrategyKind};
use crate::workloads::WorkloadKind;

pub async fn execute(
    config_path: &str,
    only: Option<&str>,
    trials: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let config = scenarios::load(config_path)?;
    let trials_override = trials
        .map(TrialCount::new)
        .transpose()
        .context("invalid --trials")?;

    let selected: Vec<ScenarioConfig> = config
        .scenarios
        .iter()
        .filter(|s| only.map_or(true, |id| s.id.as_str() == id))
        .cloned()
        .collect();
    if let (Some(id), true) = (only, selected.is_empty()) {
        bail!("no scenario with id '{}'", id);
    }

    tracing::info!(
        scenarios = selected.len(),
        settle_mode = %config.settle_mode,
        "Starting run"
    );

    let default_trials = config.measured_trials;
    let runner = BenchmarkRunner::new(config);

    for scenario in &selected {
        // Names were checked when the configuration was loaded.
        let Some(workload) = WorkloadKind::parse(&scenario.workload) else {
            bail!("unknown workload '{}'", scenario.workload);
        };
        let trials = trials_override
            .or(scenario.trials)
            .unwrap_or(default_trials);
        let operations = scenario.operations;

        if !json {
            println!();
            println!(
                "{} ({} x {} ops, {} trials)",
                scenario.id, workload, operations, trials
            );
            print_header();
        }

        for label in &scenario.strategies {
            let Some(kind) = StrategyKind::parse(label.as_str()) else {
                bail!("unknown strategy '{}'", label);
            };
            let state = Arc::new(StateStrategy::new(kind));
            tracing::debug!(
                scenario = %scenario.id,
                strategy = %state.kind(),
                "Measuring strategy"
            );

            let result = runner
                .run_benchmark(
                    &scenario.id,
                    label,
                    state,
                    |ctx| workload.run(ctx, operations),
                    trials,
                )
                .await?;

            if !json {
                print_row(&result);
            }
        }

        if !json {
            print_ranking(&runner.compare_results(&scenario.id).await);
        }
    }

    if json {
        let results = runner.get_results().await;
        println!("{}", serde_json::to_string_pretty(&results)?);
    }

    Ok(())
}

fn print_header() {
    println!(
        "  {:<10} {:>12} {:>10} {:>10} {:>10} {:>10} {:>8} {:>13}",
        "strategy", "exec", "p50", "p95", "p99", "mem(MB)", "fps", "method"
    );
}

fn print_row(result: &AggregateResult) {
    let summary = &result.summary;
    println!(
        "  {:<10} {:>12} {:>10} {:>10} {:>10} {:>10.2} {:>8.1} {:>13}",
        result.label.as_str(),
        format_ms(summary.execution_time_ms),
        format_ms(summary.latency.p50),
        format_ms(summary.latency.p95),
        format_ms(summary.latency.p99),
        summary.resource_delta_mb,
        summary.frame_rate,
        summary.method.to_string(),
    );
}

fn print_ranking(results: &[AggregateResult]) {
    let ranked = Comparison::rank(results);
    if ranked.len() < 2 {
        return;
    }

    println!("  ranking:");
    for (position, entry) in ranked.iter().enumerate() {
        let relative = entry
            .relative
            .map(|r| format!("{:.2}x", r))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "    {}. {:<10} {:>12} {:>8}",
            position + 1,
            entry.label.as_str(),
            format_ms(entry.execution_time_ms),
            relative
        );
    }
}
