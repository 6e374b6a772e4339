// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `statebench validate` command - Validate configuration file.

use statebench_core::ConfigLoader;

use crate::scenarios;

pub async fn execute(file: &str) -> anyhow::Result<()> {
    tracing::info!(file = %file, "Validating configuration");

    let checked = ConfigLoader::load_file(file)
        .map_err(anyhow::Error::from)
        .and_then(|config| scenarios::check(&config).map(|()| config));

    match checked {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Run Settings:");
            println!("  Warmup Trials:      {}", config.warmup_trials);
            println!("  Measured Trials:    {}", config.measured_trials);
            println!("  Inter-trial Delay:  {:?}", config.inter_trial_delay);
            println!(
                "  Reclaim Between:    {} (settle {:?})",
                config.reclaim_between_trials, config.reclaim_settle
            );
            println!(
                "  Memory Samples:     {} ({:?} apart)",
                config.memory_samples, config.memory_sample_spacing
            );
            println!("  Frame Interval:     {:?}", config.frame_interval);
            println!("  Settle Mode:        {}", config.settle_mode);
            println!(
                "  Aggregation:        median below {} samples, IQR k={}",
                config.policy.median_threshold, config.policy.iqr_multiplier
            );
            println!();
            println!("Scenarios ({}):", config.scenarios.len());
            for scenario in &config.scenarios {
                let strategies: Vec<&str> =
                    scenario.strategies.iter().map(|s| s.as_str()).collect();
                println!(
                    "  - {} (workload: {}, operations: {}, trials: {}, strategies: {})",
                    scenario.id,
                    scenario.workload,
                    scenario.operations,
                    scenario.trials.unwrap_or(config.measured_trials),
                    strategies.join(", ")
                );
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed:");
            eprintln!("  {:#}", e);
            std::process::exit(1);
        }
    }
}
