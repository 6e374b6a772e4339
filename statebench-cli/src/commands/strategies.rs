// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `statebench strategies` command - List built-in strategies and workloads.

use crate::strategies::StrategyKind;
use crate::workloads::WorkloadKind;

pub async fn execute() -> anyhow::Result<()> {
    println!("Strategies:");
    for kind in StrategyKind::ALL {
        println!("  {:<10} {}", kind.name(), kind.description());
    }
    println!();
    println!("Workloads:");
    for kind in WorkloadKind::ALL {
        println!("  {:<10} {}", kind.name(), kind.description());
    }
    Ok(())
}
