// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Keyed work-unit tally.

use std::collections::HashMap;

use dashmap::DashMap;

/// Counts work units (renders, notifications, lock acquisitions...) per key.
///
/// A fresh counter is allocated for every trial and never shared between
/// trials.
#[derive(Debug, Default)]
pub struct WorkCounter {
    counts: DashMap<String, u64>,
}

impl WorkCounter {
    /// Create an empty counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment `key` and return its new count.
    ///
    /// A return value of 1 means this is the first unit seen for `key`.
    pub fn increment(&self, key: &str) -> u64 {
        // Avoid allocating the key on the hot path once it exists.
        if let Some(mut count) = self.counts.get_mut(key) {
            *count += 1;
            return *count;
        }

        let mut count = self.counts.entry(key.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Snapshot of all counts.
    pub fn get(&self) -> HashMap<String, u64> {
        self.counts
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|entry| *entry.value()).sum()
    }

    /// Drop every key.
    pub fn reset(&self) {
        self.counts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_returns_new_count() {
        let counter = WorkCounter::new();
        assert_eq!(counter.increment("list.render"), 1);
        assert_eq!(counter.increment("list.render"), 2);
        assert_eq!(counter.increment("row.render"), 1);
    }

    #[test]
    fn test_get_and_total() {
        let counter = WorkCounter::new();
        for _ in 0..3 {
            counter.increment("a");
        }
        counter.increment("b");

        let counts = counter.get();
        assert_eq!(counts.get("a"), Some(&3));
        assert_eq!(counts.get("b"), Some(&1));
        assert_eq!(counter.total(), 4);
    }

    #[test]
    fn test_reset() {
        let counter = WorkCounter::new();
        counter.increment("a");
        counter.reset();

        assert!(counter.get().is_empty());
        assert_eq!(counter.total(), 0);
        assert_eq!(counter.increment("a"), 1);
    }
}
