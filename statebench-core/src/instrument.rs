// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Action instrumentation.
//!
//! [`Instrumented`] decorates a concrete action set `A`. Every operation routed
//! through [`Instrumented::call`] is timed from just before invocation until
//! the host reports that its consequences have settled:
//!
//! 1. run the operation (awaiting it if async);
//! 2. wait on the [`SettleSignal`] (queue flush + one or two render ticks);
//! 3. record `now - start` as a latency sample;
//! 4. add the settle wait, capped at one or two frame intervals, to the
//!    trial's artificial delay, which is later subtracted from execution time.
//!
//! The pass-through variant used during warmup calls the operation directly.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use uuid::Uuid;

use crate::metrics::is_valid_time_ms;
use crate::sampler::{as_millis_f64, Stopwatch, WorkCounter};
use crate::settle::{SettleMode, SettleSignal};

/// Per-trial measurement state shared by the trial controller, the
/// instrumented actions and any [`WorkUnits`] handles.
#[derive(Debug)]
pub struct TrialRecorder {
    token: Uuid,
    trial: usize,
    counter: WorkCounter,
    latencies_ms: Mutex<Vec<f64>>,
    artificial_delay_ns: AtomicU64,
    sealed: AtomicBool,
}

impl TrialRecorder {
    /// Fresh recorder with a unique token.
    pub fn new(trial: usize) -> Self {
        Self {
            token: Uuid::new_v4(),
            trial,
            counter: WorkCounter::new(),
            latencies_ms: Mutex::new(Vec::new()),
            artificial_delay_ns: AtomicU64::new(0),
            sealed: AtomicBool::new(false),
        }
    }

    /// Unique token identifying this trial.
    pub fn token(&self) -> Uuid {
        self.token
    }

    pub fn trial(&self) -> usize {
        self.trial
    }

    /// Count one work unit for `key`, returning the new count.
    /// Returns 0 without counting once the recorder has been sealed.
    pub fn count(&self, key: &str) -> u64 {
        if self.is_sealed() {
            tracing::debug!(
                token = %self.token,
                key = key,
                "Work unit after trial end ignored"
            );
            return 0;
        }
        self.counter.increment(key)
    }

    /// Record one operation latency. Values outside `[0, 1_000_000)` ms are
    /// rejected.
    pub fn record_latency(&self, action: &str, elapsed: Duration) {
        if self.is_sealed() {
            return;
        }
        let ms = as_millis_f64(elapsed);
        if !is_valid_time_ms(ms) {
            tracing::warn!(action = action, latency_ms = ms, "Rejected latency sample");
            return;
        }
        self.latencies_ms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ms);
    }

    /// Add time that must not count toward execution time.
    pub fn add_artificial_delay(&self, delay: Duration) {
        if self.is_sealed() {
            return;
        }
        let nanos = u64::try_from(delay.as_nanos()).unwrap_or(u64::MAX);
        // Saturate instead of wrapping.
        let total = &self.artificial_delay_ns;
        let _ = total.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |ns| {
            Some(ns.saturating_add(nanos))
        });
    }

    /// Total artificial delay accumulated so far.
    pub fn artificial_delay(&self) -> Duration {
        Duration::from_nanos(self.artificial_delay_ns.load(Ordering::Relaxed))
    }

    /// Latencies recorded so far.
    pub fn latencies_ms(&self) -> Vec<f64> {
        self.latencies_ms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current work-unit tally.
    pub fn work_units(&self) -> BTreeMap<String, u64> {
        self.counter.get().into_iter().collect()
    }

    /// Stop accepting measurements. Idempotent.
    pub fn seal(&self) {
        if !self.sealed.swap(true, Ordering::AcqRel) {
            tracing::trace!(token = %self.token, trial = self.trial, "Trial recorder sealed");
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }
}

/// Handle to the active trial's work-unit counter.
///
/// Cheap to clone; pass it explicitly into whatever code should attribute
/// work to the current trial.
#[derive(Debug, Clone)]
pub struct WorkUnits {
    recorder: Arc<TrialRecorder>,
}

impl WorkUnits {
    /// Handle counting into `recorder`.
    pub fn new(recorder: Arc<TrialRecorder>) -> Self {
        Self { recorder }
    }

    /// Count one unit for `key` and return the new count for that key
    /// (1 on first use within the trial).
    pub fn count(&self, key: &str) -> u64 {
        self.recorder.count(key)
    }

    /// Token of the trial this handle belongs to.
    pub fn trial_token(&self) -> Uuid {
        self.recorder.token()
    }
}

enum Instrumentation<S> {
    PassThrough,
    Timed {
        settle: Arc<S>,
        mode: SettleMode,
        recorder: Arc<TrialRecorder>,
    },
}

impl<S> Clone for Instrumentation<S> {
    fn clone(&self) -> Self {
        match self {
            Self::PassThrough => Self::PassThrough,
            Self::Timed {
                settle,
                mode,
                recorder,
            } => Self::Timed {
                settle: Arc::clone(settle),
                mode: *mode,
                recorder: Arc::clone(recorder),
            },
        }
    }
}

/// Timing decorator over a concrete action set.
pub struct Instrumented<A, S> {
    actions: Arc<A>,
    instrumentation: Instrumentation<S>,
}

impl<A, S> Clone for Instrumented<A, S> {
    fn clone(&self) -> Self {
        Self {
            actions: Arc::clone(&self.actions),
            instrumentation: self.instrumentation.clone(),
        }
    }
}

impl<A, S: SettleSignal> Instrumented<A, S> {
    /// Wrapper that calls operations directly, without timing or settling.
    pub fn pass_through(actions: Arc<A>) -> Self {
        Self {
            actions,
            instrumentation: Instrumentation::PassThrough,
        }
    }

    /// Wrapper that times every operation into `recorder`.
    pub fn timed(
        actions: Arc<A>,
        settle: Arc<S>,
        mode: SettleMode,
        recorder: Arc<TrialRecorder>,
    ) -> Self {
        Self {
            actions,
            instrumentation: Instrumentation::Timed {
                settle,
                mode,
                recorder,
            },
        }
    }

    /// Check whether calls are being timed.
    pub fn is_timed(&self) -> bool {
        matches!(self.instrumentation, Instrumentation::Timed { .. })
    }

    /// Direct, untimed access for queries that are not part of the measured
    /// work.
    pub fn untimed(&self) -> &A {
        &self.actions
    }

    /// Invoke an async operation named `action` and time it end to end.
    pub async fn call<'a, F, Fut, T>(&'a self, action: &'static str, op: F) -> T
    where
        F: FnOnce(&'a A) -> Fut,
        Fut: Future<Output = T>,
    {
        let Instrumentation::Timed {
            settle,
            mode,
            recorder,
        } = &self.instrumentation
        else {
            return op(&*self.actions).await;
        };

        let watch = Stopwatch::start();
        let output = op(&*self.actions).await;
        let waited = settle.await_settled(*mode).await;
        let elapsed = watch.elapsed();

        recorder.record_latency(action, elapsed);
        recorder.add_artificial_delay(waited.min(settle.overhead_cap(*mode)));

        tracing::trace!(
            action = action,
            latency_ms = as_millis_f64(elapsed),
            settle_ms = as_millis_f64(waited),
            "Instrumented call"
        );

        output
    }

    /// Invoke a synchronous operation named `action` and time it end to end.
    pub async fn call_sync<'a, F, T>(&'a self, action: &'static str, op: F) -> T
    where
        F: FnOnce(&'a A) -> T,
    {
        self.call(action, move |actions| std::future::ready(op(actions)))
            .await
    }
}
