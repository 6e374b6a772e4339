// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Completion signal: "has the consequence of this operation been processed?"
//!
//! The engine never talks to a renderer directly. It asks a [`SettleSignal`]
//! to wait until queued work has drained and enough render ticks have passed,
//! and receives the time that wait took.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::sampler::FrameClock;

/// How long an instrumented operation waits for its consequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettleMode {
    /// Queue flush followed by two render ticks: the visual result has been
    /// composited, not merely scheduled.
    #[default]
    WaitForPaint,
    /// Queue flush followed by a single tick: enough for state propagation,
    /// without paying full paint latency.
    NoWait,
}

impl SettleMode {
    /// Render ticks waited after the queue flush.
    pub const fn frames(&self) -> u32 {
        match self {
            Self::WaitForPaint => 2,
            Self::NoWait => 1,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::WaitForPaint => "wait_for_paint",
            Self::NoWait => "no_wait",
        }
    }
}

impl std::fmt::Display for SettleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Host integration that knows when work has settled.
pub trait SettleSignal: Send + Sync {
    /// Wait until the effects of preceding work have settled under `mode`.
    /// Returns how long the wait took.
    fn await_settled(&self, mode: SettleMode) -> impl Future<Output = Duration> + Send;

    /// Nominal duration of one render tick.
    fn frame_interval(&self) -> Duration;

    /// Receiver that changes once per render tick.
    fn frame_ticks(&self) -> watch::Receiver<u64>;

    /// Largest share of a settle wait that counts as artificial delay.
    fn overhead_cap(&self, mode: SettleMode) -> Duration {
        self.frame_interval() * mode.frames()
    }
}

/// Settle signal driven by a [`FrameClock`].
#[derive(Debug)]
pub struct FrameSettle {
    clock: FrameClock,
}

impl FrameSettle {
    /// Start a frame clock ticking at `interval`. Requires a tokio runtime.
    pub fn start(interval: Duration) -> Self {
        Self {
            clock: FrameClock::start(interval),
        }
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }
}

impl SettleSignal for FrameSettle {
    async fn await_settled(&self, mode: SettleMode) -> Duration {
        let start = Instant::now();

        // Let already-queued tasks run before waiting on the compositor.
        tokio::task::yield_now().await;
        for _ in 0..mode.frames() {
            self.clock.next_frame().await;
        }

        start.elapsed()
    }

    fn frame_interval(&self) -> Duration {
        self.clock.interval()
    }

    fn frame_ticks(&self) -> watch::Receiver<u64> {
        self.clock.subscribe()
    }
}

/// Settle signal for headless hosts: every wait takes a fixed delay and no
/// render ticks are ever produced, so the measured frame rate is 0.
#[derive(Debug)]
pub struct FixedSettle {
    delay: Duration,
    interval: Duration,
    frames: watch::Sender<u64>,
}

impl FixedSettle {
    pub fn new(delay: Duration, interval: Duration) -> Self {
        let (frames, _) = watch::channel(0);
        Self {
            delay,
            interval,
            frames,
        }
    }

    /// Settles instantly.
    pub fn immediate(interval: Duration) -> Self {
        Self::new(Duration::ZERO, interval)
    }
}

impl SettleSignal for FixedSettle {
    async fn await_settled(&self, _mode: SettleMode) -> Duration {
        let start = Instant::now();
        tokio::task::yield_now().await;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        start.elapsed()
    }

    fn frame_interval(&self) -> Duration {
        self.interval
    }

    fn frame_ticks(&self) -> watch::Receiver<u64> {
        self.frames.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Duration = Duration::from_millis(16);

    #[test]
    fn test_mode_frames_and_cap() {
        let settle = FixedSettle::immediate(FRAME);
        assert_eq!(SettleMode::WaitForPaint.frames(), 2);
        assert_eq!(SettleMode::NoWait.frames(), 1);
        assert_eq!(settle.overhead_cap(SettleMode::WaitForPaint), FRAME * 2);
        assert_eq!(settle.overhead_cap(SettleMode::NoWait), FRAME);
    }

    #[test]
    fn test_mode_serde() {
        let mode: SettleMode = serde_json::from_str("\"no_wait\"").unwrap();
        assert_eq!(mode, SettleMode::NoWait);
        assert_eq!(SettleMode::default(), SettleMode::WaitForPaint);
        assert_eq!(SettleMode::WaitForPaint.to_string(), "wait_for_paint");
    }

    #[tokio::test(start_paused = true)]
    async fn test_frame_settle_waits_for_ticks() {
        let settle = FrameSettle::start(FRAME);

        let paint = settle.await_settled(SettleMode::WaitForPaint).await;
        assert!(paint >= FRAME, "paint wait {:?}", paint);
        assert!(paint <= FRAME * 2 + Duration::from_millis(1));

        let frame_before = settle.clock().frame();
        settle.await_settled(SettleMode::NoWait).await;
        assert_eq!(settle.clock().frame(), frame_before + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_settle_delay() {
        let settle = FixedSettle::new(Duration::from_millis(7), FRAME);
        let waited = settle.await_settled(SettleMode::WaitForPaint).await;
        assert!(waited >= Duration::from_millis(7));
        assert!(waited < Duration::from_millis(9));
    }
}
