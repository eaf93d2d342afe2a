// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Uniform result of a connector command execution.

use serde::{Deserialize, Serialize};

/// Result of executing one command on a target, identical across transports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecOutcome {
    pub success: bool,
    pub output: String,
    pub error: String,
    pub exit_code: i32,
    /// Transport-level failure (auth, DNS, TCP, TLS, SDK invocation).
    /// Only connection errors are retried.
    #[serde(default)]
    pub connection_error: bool,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub duration_ms: u64,
    /// Set when the transport client is absent and the frame was synthesized.
    /// Degraded mode for development only.
    #[serde(default)]
    pub simulated: bool,
}

impl ExecOutcome {
    /// Successful execution with captured output.
    pub fn ok(output: impl Into<String>) -> Self {
        Self { success: true, output: output.into(), exit_code: 0, ..Self::default() }
    }

    /// Command-level failure (the command ran and exited non-zero).
    pub fn failure(error: impl Into<String>, exit_code: i32) -> Self {
        Self { success: false, error: error.into(), exit_code, ..Self::default() }
    }

    /// Transport-level failure; eligible for retry.
    pub fn connection_failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            exit_code: -1,
            connection_error: true,
            ..Self::default()
        }
    }

    /// Synthesized frame used when the transport client is unavailable.
    pub fn simulated(output: impl Into<String>) -> Self {
        Self { success: true, output: output.into(), exit_code: 0, simulated: true, ..Self::default() }
    }

    /// Status label for metrics.
    pub fn status_label(&self) -> &'static str {
        if self.success {
            "success"
        } else if self.connection_error {
            "connection_error"
        } else {
            "failed"
        }
    }
}
