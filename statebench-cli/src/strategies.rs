// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Built-in state-management strategies.
//!
//! Every strategy keeps the same keyed state behind the same async contract
//! (`increment`, `append`, `snapshot_len`, `reset`). They differ only in how
//! access is synchronized, which is exactly what the benchmark compares.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use dashmap::DashMap;
use statebench_core::{WorkUnits, WorkloadError};
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;

/// Mailbox depth for the actor strategy.
const ACTOR_MAILBOX: usize = 64;

/// State kept per key.
#[derive(Debug, Default, Clone)]
pub struct Slot {
    count: u64,
    items: Vec<String>,
}

impl Slot {
    fn increment(&mut self) -> u64 {
        self.count += 1;
        self.count
    }

    fn append(&mut self, value: String) -> usize {
        self.items.push(value);
        self.items.len()
    }
}

/// Strategy selector, as named in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Mutex,
    RwLock,
    Sharded,
    Actor,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::Mutex,
        StrategyKind::RwLock,
        StrategyKind::Sharded,
        StrategyKind::Actor,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub const fn name(&self) -> &'static str {
        match self {
            StrategyKind::Mutex => "mutex",
            StrategyKind::RwLock => "rwlock",
            StrategyKind::Sharded => "sharded",
            StrategyKind::Actor => "actor",
        }
    }

    pub const fn description(&self) -> &'static str {
        match self {
            StrategyKind::Mutex => "std::sync::Mutex around a HashMap",
            StrategyKind::RwLock => "tokio::sync::RwLock around a HashMap",
            StrategyKind::Sharded => "DashMap with per-shard locking",
            StrategyKind::Actor => "single task owning a HashMap, addressed over mpsc",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A state container under test.
pub enum StateStrategy {
    Mutex(Mutex<HashMap<String, Slot>>),
    RwLock(RwLock<HashMap<String, Slot>>),
    Sharded(DashMap<String, Slot>),
    Actor(ActorHandle),
}

impl StateStrategy {
    /// Create an empty container. The actor variant spawns its task, so this
    /// must run inside a tokio runtime.
    pub fn new(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::Mutex => Self::Mutex(Mutex::new(HashMap::new())),
            StrategyKind::RwLock => Self::RwLock(RwLock::new(HashMap::new())),
            StrategyKind::Sharded => Self::Sharded(DashMap::new()),
            StrategyKind::Actor => Self::Actor(ActorHandle::spawn()),
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::Mutex(_) => StrategyKind::Mutex,
            Self::RwLock(_) => StrategyKind::RwLock,
            Self::Sharded(_) => StrategyKind::Sharded,
            Self::Actor(_) => StrategyKind::Actor,
        }
    }

    /// Increment the counter under `key`; returns its new value.
    pub async fn increment(&self, key: &str, units: &WorkUnits) -> Result<u64, WorkloadError> {
        let value = match self {
            Self::Mutex(map) => map
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(key.to_string())
                .or_default()
                .increment(),
            Self::RwLock(map) => map
                .write()
                .await
                .entry(key.to_string())
                .or_default()
                .increment(),
            Self::Sharded(map) => map.entry(key.to_string()).or_default().increment(),
            Self::Actor(actor) => {
                actor
                    .request("increment", |reply| Command::Increment {
                        key: key.to_string(),
                        reply,
                    })
                    .await?
            }
        };
        units.count("state.increment");
        Ok(value)
    }

    /// Append `value` to the list under `key`; returns the new list length.
    pub async fn append(
        &self,
        key: &str,
        value: String,
        units: &WorkUnits,
    ) -> Result<usize, WorkloadError> {
        let len = match self {
            Self::Mutex(map) => map
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(key.to_string())
                .or_default()
                .append(value),
            Self::RwLock(map) => map
                .write()
                .await
                .entry(key.to_string())
                .or_default()
                .append(value),
            Self::Sharded(map) => map.entry(key.to_string()).or_default().append(value),
            Self::Actor(actor) => {
                actor
                    .request("append", |reply| Command::Append {
                        key: key.to_string(),
                        value,
                        reply,
                    })
                    .await?
            }
        };
        units.count("state.append");
        Ok(len)
    }

    /// Number of keys currently held.
    pub async fn snapshot_len(&self) -> Result<usize, WorkloadError> {
        match self {
            Self::Mutex(map) => Ok(map.lock().unwrap_or_else(PoisonError::into_inner).len()),
            Self::RwLock(map) => Ok(map.read().await.len()),
            Self::Sharded(map) => Ok(map.len()),
            Self::Actor(actor) => {
                actor
                    .request("snapshot_len", |reply| Command::Len { reply })
                    .await
            }
        }
    }

    /// Drop all state.
    pub async fn reset(&self) -> Result<(), WorkloadError> {
        match self {
            Self::Mutex(map) => map.lock().unwrap_or_else(PoisonError::into_inner).clear(),
            Self::RwLock(map) => map.write().await.clear(),
            Self::Sharded(map) => map.clear(),
            Self::Actor(actor) => {
                actor
                    .request("reset", |reply| Command::Reset { reply })
                    .await?
            }
        }
        Ok(())
    }
}

/// Messages understood by the actor task.
enum Command {
    Increment {
        key: String,
        reply: oneshot::Sender<u64>,
    },
    Append {
        key: String,
        value: String,
        reply: oneshot::Sender<usize>,
    },
    Len {
        reply: oneshot::Sender<usize>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to the task that owns the actor strategy's state.
///
/// The task is aborted when the handle is dropped.
pub struct ActorHandle {
    tx: mpsc::Sender<Command>,
    task: JoinHandle<()>,
}

impl ActorHandle {
    fn spawn() -> Self {
        let (tx, mut rx) = mpsc::channel::<Command>(ACTOR_MAILBOX);

        let task = tokio::spawn(async move {
            let mut state: HashMap<String, Slot> = HashMap::new();
            while let Some(command) = rx.recv().await {
                // A dropped reply receiver only means the caller gave up.
                match command {
                    Command::Increment { key, reply } => {
                        let _ = reply.send(state.entry(key).or_default().increment());
                    }
                    Command::Append { key, value, reply } => {
                        let _ = reply.send(state.entry(key).or_default().append(value));
                    }
                    Command::Len { reply } => {
                        let _ = reply.send(state.len());
                    }
                    Command::Reset { reply } => {
                        state.clear();
                        let _ = reply.send(());
                    }
                }
            }
            tracing::debug!("State actor stopped");
        });

        Self { tx, task }
    }

    async fn request<T>(
        &self,
        action: &'static str,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, WorkloadError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| WorkloadError::action(action, "state actor is not running"))?;
        response
            .await
            .map_err(|_| WorkloadError::action(action, "state actor dropped the reply"))
    }
}

impl Drop for ActorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
