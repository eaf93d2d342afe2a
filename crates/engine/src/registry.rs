// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory worker registry with heartbeat TTL eviction.
//!
//! Process-local and advisory: actual assignment delivery happens on the
//! assign stream, and workers draw from the queue within their own
//! concurrency budget.

use parking_lot::Mutex;
use remedy_core::{Clock, WorkerId, WorkerState};
use serde_json::Value;
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

/// Optional filters for worker lookup.
#[derive(Debug, Clone, Default)]
pub struct WorkerFilter {
    /// Required capabilities (subset match).
    pub capabilities: Vec<String>,
    pub environment: Option<String>,
    pub network_segment: Option<String>,
}

/// Lightweight registry of agent workers.
pub struct WorkerRegistry<C: Clock> {
    workers: Mutex<HashMap<WorkerId, WorkerState>>,
    heartbeat_ttl: Duration,
    clock: C,
}

impl<C: Clock> WorkerRegistry<C> {
    pub fn new(heartbeat_ttl: Duration, clock: C) -> Self {
        Self { workers: Mutex::new(HashMap::new()), heartbeat_ttl, clock }
    }

    /// Register or update a worker record; refreshes the heartbeat.
    #[allow(clippy::too_many_arguments)]
    pub fn register(
        &self,
        worker_id: WorkerId,
        capabilities: impl IntoIterator<Item = String>,
        network_segment: Option<String>,
        environment: Option<String>,
        max_concurrency: u32,
        metadata: Value,
    ) -> WorkerState {
        let now_ms = self.clock.epoch_ms();
        let capabilities: BTreeSet<String> = capabilities.into_iter().collect();
        let mut workers = self.workers.lock();

        let state = match workers.entry(worker_id) {
            Entry::Occupied(entry) => {
                let state = entry.into_mut();
                if !capabilities.is_empty() {
                    state.capabilities = capabilities;
                }
                if network_segment.is_some() {
                    state.network_segment = network_segment;
                }
                if environment.is_some() {
                    state.environment = environment;
                }
                if max_concurrency > 0 {
                    state.max_concurrency = max_concurrency;
                }
                if !metadata.is_null() {
                    state.metadata = metadata;
                }
                state
            }
            Entry::Vacant(entry) => {
                let worker_id = entry.key().clone();
                tracing::info!(worker = %worker_id, "registered worker");
                entry.insert(WorkerState {
                    worker_id,
                    capabilities,
                    network_segment,
                    environment,
                    max_concurrency: max_concurrency.max(1),
                    current_load: 0,
                    last_heartbeat_ms: now_ms,
                    metadata,
                })
            }
        };
        state.last_heartbeat_ms = now_ms;
        state.clone()
    }

    /// Refresh heartbeat for an existing worker. Unknown workers are logged
    /// and ignored.
    pub fn heartbeat(&self, worker_id: &str, current_load: Option<u32>) -> Option<WorkerState> {
        let mut workers = self.workers.lock();
        let Some(state) = workers.get_mut(worker_id) else {
            tracing::warn!(worker = worker_id, "heartbeat from unknown worker");
            return None;
        };
        if let Some(load) = current_load {
            state.current_load = load;
        }
        state.last_heartbeat_ms = self.clock.epoch_ms();
        Some(state.clone())
    }

    pub fn get(&self, worker_id: &str) -> Option<WorkerState> {
        self.workers.lock().get(worker_id).cloned()
    }

    /// Active workers matching the filter. Stale rows are evicted first.
    pub fn list_active(&self, filter: &WorkerFilter) -> Vec<WorkerState> {
        self.cleanup_stale();
        let workers = self.workers.lock();
        let mut matched: Vec<WorkerState> = workers
            .values()
            .filter(|state| {
                if let Some(environment) = &filter.environment {
                    if state.environment.as_deref() != Some(environment.as_str()) {
                        return false;
                    }
                }
                if let Some(segment) = &filter.network_segment {
                    if state.network_segment.as_deref() != Some(segment.as_str()) {
                        return false;
                    }
                }
                filter.capabilities.iter().all(|cap| state.capabilities.contains(cap))
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.worker_id.as_str().cmp(b.worker_id.as_str()));
        matched
    }

    /// Remove workers whose heartbeat is older than the TTL.
    pub fn cleanup_stale(&self) {
        let cutoff = self.clock.epoch_ms().saturating_sub(self.heartbeat_ttl.as_millis() as u64);
        let mut workers = self.workers.lock();
        workers.retain(|worker_id, state| {
            let alive = state.last_heartbeat_ms >= cutoff;
            if !alive {
                tracing::warn!(worker = %worker_id, "removing stale worker");
            }
            alive
        });
    }

    pub fn len(&self) -> usize {
        self.workers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.lock().is_empty()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
