// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Scenario resolution for the CLI host.

use std::path::Path;

use anyhow::{bail, Context};
use statebench_core::{ConfigLoader, Label, RunConfig, ScenarioConfig, ScenarioId};

use crate::strategies::StrategyKind;
use crate::workloads::WorkloadKind;

/// Scenario set used when no configuration file is present.
pub fn builtin() -> anyhow::Result<Vec<ScenarioConfig>> {
    let all_strategies = StrategyKind::ALL
        .iter()
        .map(|kind| Label::new(kind.name()))
        .collect::<Result<Vec<_>, _>>()?;

    let scenario = |id: &str, workload: WorkloadKind, operations: u32| -> anyhow::Result<_> {
        Ok(ScenarioConfig {
            id: ScenarioId::new(id)?,
            workload: workload.name().to_string(),
            operations,
            strategies: all_strategies.clone(),
            trials: None,
        })
    };

    Ok(vec![
        scenario("hot-counters", WorkloadKind::Increment, 1_000)?,
        scenario("append-log", WorkloadKind::Append, 500)?,
        scenario("mixed-traffic", WorkloadKind::Mixed, 200)?,
    ])
}

/// Load `path`, or fall back to defaults with the built-in scenarios when the
/// file does not exist. A file without scenarios also gets the built-ins.
pub fn load(path: &str) -> anyhow::Result<RunConfig> {
    let mut config = if Path::new(path).exists() {
        ConfigLoader::load_file(path).with_context(|| format!("loading {}", path))?
    } else {
        tracing::info!(path = %path, "No configuration file, using built-in scenarios");
        RunConfig::default()
    };

    if config.scenarios.is_empty() {
        config.scenarios = builtin()?;
    }

    check(&config)?;
    Ok(config)
}

/// Reject scenarios naming a workload or strategy this binary does not know.
pub fn check(config: &RunConfig) -> anyhow::Result<()> {
    for scenario in &config.scenarios {
        if WorkloadKind::parse(&scenario.workload).is_none() {
            bail!(
                "scenario '{}': unknown workload '{}' (expected one of: {})",
                scenario.id,
                scenario.workload,
                names(WorkloadKind::ALL.iter().map(|w| w.name()))
            );
        }
        for label in &scenario.strategies {
            if StrategyKind::parse(label.as_str()).is_none() {
                bail!(
                    "scenario '{}': unknown strategy '{}' (expected one of: {})",
                    scenario.id,
                    label,
                    names(StrategyKind::ALL.iter().map(|s| s.name()))
                );
            }
        }
    }
    Ok(())
}

fn names<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items.collect::<Vec<_>>().join(", ")
}
