// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Post-execution failure classification.
//!
//! The executor and any post-hoc correctors use this taxonomy to decide what
//! went wrong: command syntax errors are not retried, conflicts are not
//! connection errors, and only connection errors justify another attempt.

use crate::outcome::ExecOutcome;
use serde::{Deserialize, Serialize};

/// Types of execution failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Syntax/parameter issues in the command itself.
    CommandError,
    /// HTTP 409 or an Azure run-command already in progress.
    AzureConflict,
    /// Deadline reached.
    Timeout,
    /// Target unreachable or transport-level failure.
    ConnectionError,
    Unknown,
}

remedy_core::simple_display! {
    FailureKind {
        CommandError => "command_error",
        AzureConflict => "azure_conflict",
        Timeout => "timeout",
        ConnectionError => "connection_error",
        Unknown => "unknown",
    }
}

/// PowerShell-flavoured syntax/parameter error fragments.
const COMMAND_ERROR_PATTERNS: &[&str] = &[
    "parameter cannot be found",
    "a parameter cannot be found",
    "missing an argument for parameter",
    "the specified object was not found",
    "cannot find parameter",
    "is not a property",
    "property cannot be found",
    "cannot bind argument to parameter",
    "invalid argument",
    "syntax error",
    "parse error",
    "unexpected token",
    "is not recognized",
    "cmdlet not found",
];

/// Classify a failed execution outcome.
pub fn detect_failure_type(outcome: &ExecOutcome) -> FailureKind {
    // Connection errors have the highest priority.
    if outcome.connection_error {
        return FailureKind::ConnectionError;
    }

    let error = outcome.error.to_ascii_lowercase();

    let is_conflict = error.contains("conflict")
        || error.contains("execution is in progress")
        || error.contains("run command extension")
        || outcome.exit_code == 409;
    if is_conflict {
        return FailureKind::AzureConflict;
    }

    if error.contains("timed out") || error.contains("timeout") {
        return FailureKind::Timeout;
    }

    if is_command_syntax_error(&outcome.error, outcome.exit_code) {
        return FailureKind::CommandError;
    }

    FailureKind::Unknown
}

/// Determine whether an error message points at a command syntax/parameter
/// issue rather than an environmental one.
pub fn is_command_syntax_error(error: &str, exit_code: i32) -> bool {
    if error.is_empty() {
        return false;
    }
    let lower = error.to_ascii_lowercase();

    if COMMAND_ERROR_PATTERNS.iter().any(|pattern| lower.contains(pattern)) {
        return true;
    }

    // Exit code 1 plus command-shaped vocabulary is usually a usage error.
    exit_code == 1
        && ["parameter", "property", "cmdlet", "syntax", "parse"]
            .iter()
            .any(|keyword| lower.contains(keyword))
}

#[cfg(test)]
#[path = "failure_tests.rs"]
mod tests;
