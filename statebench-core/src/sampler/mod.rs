// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Leaf measurement instruments.
//!
//! Each sampler is independent: the trial controller allocates fresh instances
//! per trial and combines their readings into a [`crate::metrics::MetricsSample`].

pub mod clock;
pub mod counter;
pub mod frame;
pub mod memory;

pub use clock::{as_millis_f64, Stopwatch};
pub use counter::WorkCounter;
pub use frame::{frame_rate, FrameClock, FrameMeter, MAX_FRAME_RATE};
pub use memory::{
    default_reclaim_hook, MemoryProbe, ProcessMemoryProbe, ReclaimHook, ResourceSampler,
};

#[cfg(all(target_os = "linux", target_env = "gnu"))]
pub use memory::MallocTrim;
