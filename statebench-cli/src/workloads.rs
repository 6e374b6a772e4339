// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Built-in workloads driven against a [`StateStrategy`].

use std::time::Duration;

use statebench_core::{SettleSignal, TrialContext, WorkloadError};

use crate::strategies::StateStrategy;

/// Keys cycled by the increment-heavy workloads.
const KEYS: [&str; 8] = [
    "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel",
];

/// Key every append lands on.
const LOG_KEY: &str = "log";

/// Deliberate pause taken by the mixed workload every `MIXED_PAUSE_EVERY`
/// operations. Declared as extra delay, so it never counts as work.
pub const MIXED_PAUSE: Duration = Duration::from_millis(2);
pub const MIXED_PAUSE_EVERY: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadKind {
    Increment,
    Append,
    Mixed,
}

impl WorkloadKind {
    pub const ALL: [WorkloadKind; 3] = [
        WorkloadKind::Increment,
        WorkloadKind::Append,
        WorkloadKind::Mixed,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub const fn name(&self) -> &'static str {
        match self {
            WorkloadKind::Increment => "increment",
            WorkloadKind::Append => "append",
            WorkloadKind::Mixed => "mixed",
        }
    }

    pub const fn description(&self) -> &'static str {
        match self {
            WorkloadKind::Increment => "N increments spread over a small key space",
            WorkloadKind::Append => "N appends to a single list",
            WorkloadKind::Mixed => "alternating increments and appends with periodic pauses",
        }
    }

    /// Run `operations` operations of this workload inside one trial.
    ///
    /// State is reset first (untimed) and checked afterwards, so a strategy
    /// that silently drops writes fails the trial.
    pub async fn run<S: SettleSignal>(
        self,
        ctx: TrialContext<StateStrategy, S>,
        operations: u32,
    ) -> Result<(), WorkloadError> {
        let state = ctx.actions();
        let units = ctx.work_units();

        state.untimed().reset().await?;

        for i in 0..operations {
            match self {
                WorkloadKind::Increment => {
                    let key = KEYS[i as usize % KEYS.len()];
                    state.call("increment", |s| s.increment(key, &units)).await?;
                }
                WorkloadKind::Append => {
                    let entry = format!("entry-{}", i);
                    state
                        .call("append", |s| s.append(LOG_KEY, entry, &units))
                        .await?;
                }
                WorkloadKind::Mixed => {
                    if i % 2 == 0 {
                        let key = KEYS[(i as usize / 2) % KEYS.len()];
                        state.call("increment", |s| s.increment(key, &units)).await?;
                    } else {
                        let entry = format!("entry-{}", i);
                        state
                            .call("append", |s| s.append(LOG_KEY, entry, &units))
                            .await?;
                    }

                    if (i + 1) % MIXED_PAUSE_EVERY == 0 {
                        tokio::time::sleep(MIXED_PAUSE).await;
                        ctx.track_extra_delay(MIXED_PAUSE);
                    }
                }
            }
        }

        let expected = self.expected_keys(operations);
        let held = state.untimed().snapshot_len().await?;
        if held != expected {
            return Err(WorkloadError::failed(format!(
                "{} workload expected {} keys after {} operations, found {}",
                self.name(),
                expected,
                operations,
                held
            )));
        }

        Ok(())
    }

    /// Keys held once `operations` operations have run on an empty state.
    fn expected_keys(&self, operations: u32) -> usize {
        let ops = operations as usize;
        match self {
            WorkloadKind::Increment => ops.min(KEYS.len()),
            WorkloadKind::Append => usize::from(ops > 0),
            WorkloadKind::Mixed => {
                let increments = ops.div_ceil(2);
                increments.min(KEYS.len()) + usize::from(ops > 1)
            }
        }
    }
}

impl std::fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
