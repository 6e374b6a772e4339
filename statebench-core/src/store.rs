// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Append-only store of aggregate results, in completion order.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::metrics::AggregateResult;
use crate::types::{Label, ScenarioId};

/// Shared result history for one runner.
///
/// Readers always get owned copies; nothing handed out aliases the stored
/// results.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    results: Arc<RwLock<Vec<AggregateResult>>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed result.
    pub async fn push(&self, result: AggregateResult) {
        let mut results = self.results.write().await;
        results.push(result);
    }

    /// Copy of every stored result.
    pub async fn results(&self) -> Vec<AggregateResult> {
        self.results.read().await.clone()
    }

    /// Results recorded for `scenario`, in completion order.
    pub async fn by_scenario(&self, scenario: &ScenarioId) -> Vec<AggregateResult> {
        let results = self.results.read().await;
        results
            .iter()
            .filter(|r| &r.scenario == scenario)
            .cloned()
            .collect()
    }

    /// Results recorded for `label`, across all scenarios.
    pub async fn by_label(&self, label: &Label) -> Vec<AggregateResult> {
        let results = self.results.read().await;
        results
            .iter()
            .filter(|r| &r.label == label)
            .cloned()
            .collect()
    }

    /// Drop every stored result.
    pub async fn clear(&self) {
        let mut results = self.results.write().await;
        let dropped = results.len();
        results.clear();
        tracing::debug!(dropped = dropped, "Cleared result store");
    }
}
