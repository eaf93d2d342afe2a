// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSH connector for Linux/Unix targets.
//!
//! Shells out to the OpenSSH client in batch mode. The ssh binary reserves
//! exit code 255 for its own (transport) failures, which is how connection
//! errors are told apart from a remote command's non-zero exit. When no ssh
//! client is installed the connector degrades to a simulated frame.

use crate::config::ConnectionConfig;
use crate::outcome::ExecOutcome;
use crate::retry::{run_with_retries, RetryPolicy};
use crate::shell::remote_command;
use crate::subprocess::{binary_available, run_with_timeout, SubprocessError};
use remedy_core::Metrics;
use std::io::Write;
use std::time::Duration;
use tokio::process::Command;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(2000);

/// The ssh client's own exit code for connection/auth failures.
const SSH_TRANSPORT_EXIT: i32 = 255;

pub async fn execute(
    command: &str,
    config: &ConnectionConfig,
    timeout: Duration,
    metrics: Option<&Metrics>,
) -> ExecOutcome {
    let host = config.host.as_deref().map(str::trim).unwrap_or_default();
    let username = config.username.as_deref().map(str::trim).unwrap_or_default();
    if host.is_empty() || username.is_empty() {
        return ExecOutcome::connection_failure("SSH connector requires host and username.");
    }

    let command_text = command.trim();
    let command_text =
        if command_text.is_empty() { "echo 'No command provided'" } else { command_text };

    if !binary_available("ssh") {
        tracing::warn!("ssh client not installed; falling back to simulated execution");
        return ExecOutcome::simulated(format!("[simulated ssh:{host}] {command_text}"));
    }

    let connect_timeout = config.connect_timeout_or(DEFAULT_CONNECT_TIMEOUT);
    let policy = RetryPolicy::new(
        config.retries_or(DEFAULT_RETRIES),
        config.retry_delay_or(DEFAULT_RETRY_DELAY),
    );
    let deadline_budget = timeout.max(connect_timeout);

    // Key material goes into a 0600 temp file for the lifetime of the call.
    let key_file = match write_key_file(config.private_key.as_deref()) {
        Ok(file) => file,
        Err(error) => return ExecOutcome::connection_failure(error),
    };

    let remote = remote_command(command_text, config.shell.as_deref());

    run_with_retries("ssh", policy, timeout, deadline_budget, metrics, |attempt_timeout| {
        let remote = remote.clone();
        let key_path = key_file.as_ref().map(|f| f.path().to_path_buf());
        async move {
            let mut cmd = Command::new("ssh");
            cmd.arg("-p").arg(config.port.unwrap_or(22).to_string());
            cmd.arg("-o").arg("BatchMode=yes");
            cmd.arg("-o").arg("StrictHostKeyChecking=accept-new");
            cmd.arg("-o").arg(format!("ConnectTimeout={}", connect_timeout.as_secs().max(1)));
            // Behave like the explicit-credential path: no agent, no default keys.
            cmd.arg("-o").arg("IdentityAgent=none");
            if let Some(key_path) = &key_path {
                cmd.arg("-o").arg("IdentitiesOnly=yes");
                cmd.arg("-i").arg(key_path);
            }
            cmd.arg(format!("{username}@{host}"));
            cmd.arg(&remote);

            match run_with_timeout(cmd, attempt_timeout, "ssh command").await {
                Ok(output) => {
                    let exit_code = output.status.code().unwrap_or(-1);
                    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
                    if exit_code == SSH_TRANSPORT_EXIT {
                        ExecOutcome::connection_failure(stderr)
                    } else {
                        ExecOutcome {
                            success: exit_code == 0,
                            output: String::from_utf8_lossy(&output.stdout).into_owned(),
                            error: stderr,
                            exit_code,
                            ..ExecOutcome::default()
                        }
                    }
                }
                Err(SubprocessError::Timeout { .. }) => ExecOutcome::connection_failure(format!(
                    "SSH command timed out after {} seconds",
                    attempt_timeout.as_secs()
                )),
                Err(error) => ExecOutcome::connection_failure(error.to_string()),
            }
        }
    })
    .await
}

/// Write private key material to a temp file with owner-only permissions.
fn write_key_file(
    private_key: Option<&str>,
) -> Result<Option<tempfile::NamedTempFile>, String> {
    let Some(material) = private_key.map(str::trim).filter(|k| !k.is_empty()) else {
        return Ok(None);
    };

    let mut file = tempfile::Builder::new()
        .prefix("remedy-ssh-key-")
        .tempfile()
        .map_err(|e| format!("failed to stage ssh key: {e}"))?;
    file.write_all(material.as_bytes())
        .and_then(|_| file.write_all(b"\n"))
        .map_err(|e| format!("failed to stage ssh key: {e}"))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o600))
            .map_err(|e| format!("failed to stage ssh key: {e}"))?;
    }

    Ok(Some(file))
}

#[cfg(test)]
#[path = "ssh_tests.rs"]
mod tests;
