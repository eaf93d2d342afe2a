// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker identity and registry records.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;

/// Unique identifier for a worker instance. Worker ids are minted by the
/// workers themselves, so this is a plain string newtype.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerId(pub String);

impl WorkerId {
    /// Create a new WorkerId from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string value of this WorkerId.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for WorkerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for WorkerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Borrow<str> for WorkerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// In-memory record of a registered worker. Advisory only: durable
/// assignment delivery goes through the assign stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerState {
    pub worker_id: WorkerId,
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_segment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default = "default_concurrency")]
    pub max_concurrency: u32,
    #[serde(default)]
    pub current_load: u32,
    /// Epoch ms of the last heartbeat; stale rows are evicted after TTL.
    pub last_heartbeat_ms: u64,
    #[serde(default)]
    pub metadata: Value,
}

fn default_concurrency() -> u32 {
    1
}

impl WorkerState {
    /// Remaining concurrency budget, clamped at zero.
    pub fn available_slots(&self) -> u32 {
        self.max_concurrency.saturating_sub(self.current_load)
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
