// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Render-tick source and frame-rate meter.
//!
//! [`FrameClock`] is the engine's stand-in for a compositor: a background task
//! that publishes a monotonically increasing frame number once per frame
//! interval. [`FrameMeter`] counts the ticks it observes between `start` and
//! `stop`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Upper bound for a reported frame rate.
pub const MAX_FRAME_RATE: f64 = 1_000.0;

/// Periodic render-tick source.
///
/// Must be created inside a tokio runtime. The ticker task is aborted when the
/// clock is dropped.
#[derive(Debug)]
pub struct FrameClock {
    interval: Duration,
    frames: watch::Receiver<u64>,
    ticker: JoinHandle<()>,
}

impl FrameClock {
    /// Start ticking every `interval`.
    pub fn start(interval: Duration) -> Self {
        let (tx, rx) = watch::channel(0u64);

        let ticker = tokio::spawn(async move {
            let mut ticks = tokio::time::interval(interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            ticks.tick().await;
            loop {
                ticks.tick().await;
                tx.send_modify(|frame| *frame += 1);
            }
        });

        Self {
            interval,
            frames: rx,
            ticker,
        }
    }

    /// Nominal frame interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Current frame number.
    pub fn frame(&self) -> u64 {
        *self.frames.borrow()
    }

    /// A receiver that observes every future frame.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        let mut rx = self.frames.clone();
        rx.borrow_and_update();
        rx
    }

    /// Wait for the next frame boundary.
    pub async fn next_frame(&self) {
        let mut rx = self.subscribe();
        // Err only if the ticker is gone; fall back to sleeping one interval.
        if rx.changed().await.is_err() {
            tokio::time::sleep(self.interval).await;
        }
    }
}

impl Drop for FrameClock {
    fn drop(&mut self) {
        self.ticker.abort();
    }
}

/// Counts frame ticks over an interval.
///
/// `stop` consumes the meter, so it can only run once. Dropping a running
/// meter without calling `stop` (for example when a workload panics) still
/// tears down the counting task.
#[derive(Debug)]
pub struct FrameMeter {
    ticks: Arc<AtomicU64>,
    started: Instant,
    counter: Option<JoinHandle<()>>,
}

impl FrameMeter {
    /// Reset the tick count and begin counting ticks from `frames`.
    pub fn start(mut frames: watch::Receiver<u64>) -> Self {
        let ticks = Arc::new(AtomicU64::new(0));
        frames.borrow_and_update();

        let counted = Arc::clone(&ticks);
        let counter = tokio::spawn(async move {
            while frames.changed().await.is_ok() {
                counted.fetch_add(1, Ordering::Relaxed);
            }
        });

        Self {
            ticks,
            started: Instant::now(),
            counter: Some(counter),
        }
    }

    /// Ticks observed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Stop counting and return frames per second, clamped to `[0, 1000]`.
    pub fn stop(mut self) -> f64 {
        self.halt();
        frame_rate(self.ticks(), self.started.elapsed())
    }

    fn halt(&mut self) {
        if let Some(counter) = self.counter.take() {
            counter.abort();
        }
    }
}

impl Drop for FrameMeter {
    fn drop(&mut self) {
        self.halt();
    }
}

/// Ticks per second over `elapsed`, clamped to `[0, MAX_FRAME_RATE]`.
/// Zero elapsed time yields 0.
pub fn frame_rate(ticks: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    (ticks as f64 / secs).clamp(0.0, MAX_FRAME_RATE)
}
