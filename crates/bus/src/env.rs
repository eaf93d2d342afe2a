// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for stream configuration.

use std::time::Duration;

/// Stream names and orchestration switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    pub assign: String,
    pub command: String,
    pub result: String,
    pub events: String,
    pub dead_letter: String,
    pub orchestrator_group: String,
    /// Approximate trim threshold applied on publish.
    pub default_maxlen: usize,
    /// Master switch for publishing to streams.
    pub orchestration_enabled: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            assign: "session.assign".to_string(),
            command: "session.command".to_string(),
            result: "session.result".to_string(),
            events: "session.events".to_string(),
            dead_letter: "session.deadletter".to_string(),
            orchestrator_group: "orchestrator".to_string(),
            default_maxlen: 10_000,
            orchestration_enabled: true,
        }
    }
}

impl StreamConfig {
    /// Resolve configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            assign: var_or("REDIS_STREAM_ASSIGN", defaults.assign),
            command: var_or("REDIS_STREAM_COMMAND", defaults.command),
            result: var_or("REDIS_STREAM_RESULT", defaults.result),
            events: var_or("REDIS_STREAM_EVENTS", defaults.events),
            dead_letter: var_or("REDIS_STREAM_DEAD_LETTER", defaults.dead_letter),
            orchestrator_group: var_or(
                "REDIS_CONSUMER_GROUP_ORCHESTRATOR",
                defaults.orchestrator_group,
            ),
            default_maxlen: std::env::var("REDIS_DEFAULT_MAXLEN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.default_maxlen),
            orchestration_enabled: std::env::var("WORKER_ORCHESTRATION_ENABLED")
                .map(|s| !matches!(s.trim(), "0" | "false" | "False" | "FALSE"))
                .unwrap_or(defaults.orchestration_enabled),
        }
    }

    /// All five logical streams, for group bootstrap and diagnostics.
    pub fn all_streams(&self) -> [&str; 5] {
        [&self.assign, &self.command, &self.result, &self.events, &self.dead_letter]
    }
}

/// Reservation TTL: `IDEMPOTENCY_TTL_SECONDS`, default 24h, floor 60s.
pub fn idempotency_ttl() -> Duration {
    let seconds = std::env::var("IDEMPOTENCY_TTL_SECONDS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(86_400);
    Duration::from_secs(seconds.max(60))
}

fn var_or(key: &str, default: String) -> String {
    std::env::var(key).ok().filter(|s| !s.is_empty()).unwrap_or(default)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
