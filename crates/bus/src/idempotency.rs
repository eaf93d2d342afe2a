// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idempotency key reservation and tracking.
//!
//! Contract: at most one logical effect per `(scope, key)` within the TTL
//! window. Callers fold the reservation result into their response so a
//! repeated request yields the same session id / stream id.

use async_trait::async_trait;
use parking_lot::Mutex;
use remedy_core::Clock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::stream::BusError;

/// Scope for deduplicating session creation.
pub const SCOPE_SESSION_CREATE: &str = "session.create";
/// Scope for deduplicating manual command submission.
pub const SCOPE_SESSION_COMMAND: &str = "session.command";
/// Scope for deduplicating worker assignment publishes.
pub const SCOPE_SESSION_ASSIGN: &str = "session.assign";

/// Value stored while a reservation is held but not yet committed.
pub const PENDING_MARKER: &str = "__PENDING__";

/// Reserve/commit/release of logical operation keys.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Attempt to reserve a key. Returns the existing value (committed value
    /// or [`PENDING_MARKER`]) if the key was already used within the TTL,
    /// otherwise marks the key pending and returns `None`.
    async fn reserve(&self, scope: &str, key: &str) -> Result<Option<String>, BusError>;

    /// Persist the canonical value for a reserved key, resetting the TTL.
    async fn commit(&self, scope: &str, key: &str, value: &str) -> Result<(), BusError>;

    /// Erase a reservation after a failure so the operation can be retried.
    async fn release(&self, scope: &str, key: &str) -> Result<(), BusError>;
}

struct Entry {
    value: String,
    expires_at_ms: u64,
}

/// In-memory idempotency store with TTL semantics.
pub struct MemoryIdempotencyStore<C: Clock> {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    ttl: Duration,
    clock: C,
}

impl<C: Clock> MemoryIdempotencyStore<C> {
    /// TTL is floored at 60 seconds, matching the configuration contract.
    pub fn new(ttl: Duration, clock: C) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl: ttl.max(Duration::from_secs(60)),
            clock,
        }
    }

    fn storage_key(scope: &str, key: &str) -> String {
        format!("idempotency:{scope}:{key}")
    }

    fn purge_expired(entries: &mut HashMap<String, Entry>, now_ms: u64) {
        entries.retain(|_, entry| entry.expires_at_ms > now_ms);
    }
}

#[async_trait]
impl<C: Clock> IdempotencyStore for MemoryIdempotencyStore<C> {
    async fn reserve(&self, scope: &str, key: &str) -> Result<Option<String>, BusError> {
        let now_ms = self.clock.epoch_ms();
        let mut entries = self.entries.lock();
        Self::purge_expired(&mut entries, now_ms);

        let storage_key = Self::storage_key(scope, key);
        if let Some(entry) = entries.get(&storage_key) {
            return Ok(Some(entry.value.clone()));
        }
        entries.insert(
            storage_key,
            Entry {
                value: PENDING_MARKER.to_string(),
                expires_at_ms: now_ms + self.ttl.as_millis() as u64,
            },
        );
        Ok(None)
    }

    async fn commit(&self, scope: &str, key: &str, value: &str) -> Result<(), BusError> {
        let now_ms = self.clock.epoch_ms();
        let mut entries = self.entries.lock();
        entries.insert(
            Self::storage_key(scope, key),
            Entry {
                value: value.to_string(),
                expires_at_ms: now_ms + self.ttl.as_millis() as u64,
            },
        );
        Ok(())
    }

    async fn release(&self, scope: &str, key: &str) -> Result<(), BusError> {
        self.entries.lock().remove(&Self::storage_key(scope, key));
        Ok(())
    }
}

#[cfg(test)]
#[path = "idempotency_tests.rs"]
mod tests;
