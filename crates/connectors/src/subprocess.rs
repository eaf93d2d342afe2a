// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution with timeouts.
//!
//! All transport CLIs (ssh, aws, az, gcloud, psql, mysql) run through
//! [`run_with_timeout`] so a hung client can never stall the executor task.

use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Subprocess failures.
#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("{label} timed out after {seconds:.0} seconds")]
    Timeout { label: String, seconds: f64 },

    #[error("failed to spawn {label}: {source}")]
    Spawn {
        label: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{label} io error: {source}")]
    Io {
        label: String,
        #[source]
        source: std::io::Error,
    },
}

impl SubprocessError {
    /// True when the executable was not found (simulation fallback trigger).
    pub fn is_missing_binary(&self) -> bool {
        matches!(
            self,
            SubprocessError::Spawn { source, .. }
                if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

/// Run a command, killing it if it exceeds `timeout`.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    label: &str,
) -> Result<Output, SubprocessError> {
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    let child = cmd
        .spawn()
        .map_err(|source| SubprocessError::Spawn { label: label.to_string(), source })?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(SubprocessError::Io { label: label.to_string(), source }),
        Err(_) => Err(SubprocessError::Timeout {
            label: label.to_string(),
            seconds: timeout.as_secs_f64(),
        }),
    }
}

/// Check whether an executable is resolvable on PATH.
pub fn binary_available(name: &str) -> bool {
    let Some(paths) = std::env::var_os("PATH") else { return false };
    std::env::split_paths(&paths).any(|dir| is_executable(&dir.join(name)))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.is_file()
        && std::fs::metadata(path).map(|m| m.permissions().mode() & 0o111 != 0).unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
