// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local connector: runs commands on the orchestrator host itself.

use crate::config::ConnectionConfig;
use crate::outcome::ExecOutcome;
use crate::shell::local_invocation;
use crate::subprocess::{run_with_timeout, SubprocessError};
use std::time::Duration;
use tokio::process::Command;

pub async fn execute(
    command: &str,
    config: &ConnectionConfig,
    timeout: Duration,
) -> ExecOutcome {
    let command_text = command.trim();
    let command_text =
        if command_text.is_empty() { "echo 'No command provided'" } else { command_text };

    let (program, args) = local_invocation(command_text, config.shell.as_deref());
    let mut cmd = Command::new(&program);
    cmd.args(&args);

    let started = std::time::Instant::now();
    match run_with_timeout(cmd, timeout, "local command").await {
        Ok(output) => ExecOutcome {
            success: output.status.success(),
            output: String::from_utf8_lossy(&output.stdout).into_owned(),
            error: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
            duration_ms: started.elapsed().as_millis() as u64,
            ..ExecOutcome::default()
        },
        Err(SubprocessError::Timeout { .. }) => ExecOutcome::failure(
            format!("Command timed out after {} seconds", timeout.as_secs()),
            -1,
        ),
        Err(error) => {
            tracing::error!(%error, "local execution error");
            ExecOutcome::failure(error.to_string(), -1)
        }
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
