// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Monotonic elapsed-time clock.
//!
//! Built on `tokio::time::Instant` so that tests running with a paused
//! runtime clock observe exact, deterministic durations.

use std::time::Duration;

use tokio::time::Instant;

/// Timer for measuring a trial or a single operation.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start: Instant,
}

impl Stopwatch {
    /// Start a new stopwatch.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed duration since start.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Elapsed milliseconds since start, with sub-millisecond precision.
    pub fn elapsed_ms(&self) -> f64 {
        as_millis_f64(self.elapsed())
    }
}

/// Convert a duration to fractional milliseconds.
pub fn as_millis_f64(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1_000.0
}
