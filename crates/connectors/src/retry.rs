// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry loop shared by network-facing connectors.
//!
//! Only connection errors are retried; command-level non-zero exits and
//! conflicts fail immediately. A successful command is never retried.

use crate::outcome::ExecOutcome;
use remedy_core::Metrics;
use std::future::Future;
use std::time::{Duration, Instant};

/// Per-connector retry tuning.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), retry_delay }
    }
}

/// Run `attempt` up to `policy.max_attempts` times within `deadline_budget`.
///
/// Each attempt gets `max(1s, min(per_attempt, deadline_remaining))`, the
/// timeout floor. The final outcome carries the retry count and its
/// measured duration.
pub async fn run_with_retries<F, Fut>(
    connector: &str,
    policy: RetryPolicy,
    per_attempt: Duration,
    deadline_budget: Duration,
    metrics: Option<&Metrics>,
    attempt: F,
) -> ExecOutcome
where
    F: Fn(Duration) -> Fut,
    Fut: Future<Output = ExecOutcome>,
{
    let deadline = Instant::now() + deadline_budget;
    let mut attempts = 0u32;
    let mut last: Option<ExecOutcome> = None;

    while attempts < policy.max_attempts && Instant::now() < deadline {
        attempts += 1;
        let started = Instant::now();

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        let attempt_timeout = per_attempt.min(remaining).max(Duration::from_secs(1));

        let mut outcome = attempt(attempt_timeout).await;
        outcome.retry_count = attempts - 1;
        if outcome.duration_ms == 0 {
            outcome.duration_ms = started.elapsed().as_millis() as u64;
        }

        if outcome.success && !outcome.connection_error {
            return outcome;
        }

        let retryable = outcome.connection_error;
        let reason = outcome.error.clone();
        last = Some(outcome);

        if retryable && attempts < policy.max_attempts {
            if let Some(metrics) = metrics {
                metrics.record_connector_retry(connector, &reason);
            }
            tokio::time::sleep(policy.retry_delay).await;
        } else {
            break;
        }
    }

    last.unwrap_or_else(|| {
        ExecOutcome::connection_failure(format!(
            "{connector} execution failed before the command could be attempted"
        ))
    })
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
