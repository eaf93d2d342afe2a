// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error taxonomy for the orchestration core.
//!
//! Outer surfaces map these tags onto status codes (NotFound → 404,
//! Conflict → 409, Validation → 400, RateLimited → 429, Transport → 5xx).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error taxonomy shared by the façade and the execution services.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Referenced entity missing; no state change occurred.
    #[error("not found: {0}")]
    NotFound(String),

    /// Precondition violation (terminal session, step already approved,
    /// duplicate idempotency key with a divergent payload).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Sandbox violation, unknown connector type, malformed metadata.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Upstream budget/rate advisory; callers should back off.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Stream bus or idempotency store unavailable; retry at the caller.
    #[error("transport error: {0}")]
    Transport(String),
}

impl CoreError {
    /// Stable machine tag used in error envelopes.
    pub fn tag(&self) -> &'static str {
        match self {
            CoreError::NotFound(_) => "not_found",
            CoreError::Conflict(_) => "conflict",
            CoreError::Validation(_) => "validation_failed",
            CoreError::RateLimited(_) => "rate_limited",
            CoreError::Transport(_) => "transport_error",
        }
    }
}

/// Normalized error envelope returned to REST callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&CoreError> for ErrorEnvelope {
    fn from(err: &CoreError) -> Self {
        Self {
            error: err.tag().to_string(),
            message: err.to_string(),
            details: None,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
