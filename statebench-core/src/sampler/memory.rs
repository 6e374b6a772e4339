// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Process resource-usage sampling and forced reclamation.
//!
//! Both facilities are host capabilities, not requirements: a runner without a
//! [`MemoryProbe`] reports a resource delta of 0, and a runner without a
//! [`ReclaimHook`] simply skips the reclamation step.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use sysinfo::{Pid, System};

/// Source of point-in-time resource usage, in MB.
pub trait MemoryProbe: Send + Sync {
    /// Current usage in MB, or `None` if the host cannot report it.
    fn read_mb(&self) -> Option<f64>;
}

/// Resident memory of the current process, read through `sysinfo`.
pub struct ProcessMemoryProbe {
    pid: Pid,
    system: Mutex<System>,
}

impl ProcessMemoryProbe {
    /// Probe for the current process. Returns `None` if the platform does not
    /// expose a process id to `sysinfo`.
    pub fn current() -> Option<Self> {
        let pid = sysinfo::get_current_pid().ok()?;
        Some(Self {
            pid,
            system: Mutex::new(System::new()),
        })
    }
}

impl MemoryProbe for ProcessMemoryProbe {
    fn read_mb(&self) -> Option<f64> {
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        if !system.refresh_process(self.pid) {
            return None;
        }
        system
            .process(self.pid)
            .map(|process| process.memory() as f64 / (1024.0 * 1024.0))
    }
}

/// Hook that asks the host to release reclaimable memory between trials.
pub trait ReclaimHook: Send + Sync {
    fn reclaim(&self);
}

/// Returns freed heap pages to the OS via glibc's `malloc_trim`.
#[cfg(all(target_os = "linux", target_env = "gnu"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct MallocTrim;

#[cfg(all(target_os = "linux", target_env = "gnu"))]
impl ReclaimHook for MallocTrim {
    fn reclaim(&self) {
        // SAFETY: malloc_trim only walks allocator-internal free lists.
        let released = unsafe { libc::malloc_trim(0) };
        tracing::trace!(released = released != 0, "malloc_trim");
    }
}

/// The reclamation hook available on this platform, if any.
pub fn default_reclaim_hook() -> Option<Box<dyn ReclaimHook>> {
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    {
        Some(Box::new(MallocTrim))
    }

    #[cfg(not(all(target_os = "linux", target_env = "gnu")))]
    {
        None
    }
}

/// Median-of-N resource sampler.
///
/// Repeated reads separated by short delays damp transient allocator spikes.
pub struct ResourceSampler {
    probe: Option<Box<dyn MemoryProbe>>,
    samples: usize,
    spacing: Duration,
}

impl ResourceSampler {
    /// Create a sampler. `samples` is clamped to at least 1.
    pub fn new(probe: Option<Box<dyn MemoryProbe>>, samples: usize, spacing: Duration) -> Self {
        Self {
            probe,
            samples: samples.max(1),
            spacing,
        }
    }

    /// Sampler with no probe; every read is 0.
    pub fn disabled() -> Self {
        Self::new(None, 1, Duration::ZERO)
    }

    /// One raw read. `None` when unavailable, failed or non-finite.
    pub fn read_once(&self) -> Option<f64> {
        self.probe
            .as_ref()
            .and_then(|probe| probe.read_mb())
            .filter(|mb| mb.is_finite())
    }

    /// Median of `samples` reads spaced `spacing` apart.
    ///
    /// Failed reads are skipped. The result is 0 only when no read succeeds.
    pub async fn sample_median(&self) -> f64 {
        if self.probe.is_none() {
            return 0.0;
        }

        let mut reads = Vec::with_capacity(self.samples);
        for i in 0..self.samples {
            if i > 0 && !self.spacing.is_zero() {
                tokio::time::sleep(self.spacing).await;
            }
            if let Some(mb) = self.read_once() {
                reads.push(mb);
            }
        }

        if reads.is_empty() {
            tracing::debug!(samples = self.samples, "No resource read succeeded");
            return 0.0;
        }
        crate::stats::median(&reads)
    }
}
