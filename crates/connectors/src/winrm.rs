// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WinRM connector for Windows targets.
//!
//! No WinRM client is bundled; until one is wired in deployments the
//! connector validates its configuration, honours shell selection, and
//! returns simulated frames so development flows keep moving.

use crate::config::ConnectionConfig;
use crate::outcome::ExecOutcome;
use std::time::Duration;

pub async fn execute(
    command: &str,
    config: &ConnectionConfig,
    _timeout: Duration,
) -> ExecOutcome {
    let Some(host) = config.host.as_deref().filter(|h| !h.trim().is_empty()) else {
        return ExecOutcome::connection_failure("WinRM connector missing host.");
    };

    let username = config.username.as_deref().unwrap_or("administrator");
    let full_username = match config.domain.as_deref() {
        Some(domain) if !domain.is_empty() => format!("{domain}\\{username}"),
        _ => username.to_string(),
    };

    let shell = config.shell.as_deref().unwrap_or("powershell").to_ascii_lowercase();
    let command_text = command.trim();
    let command_text = if command_text.is_empty() {
        if shell.starts_with("power") { "Write-Host 'No command provided'" } else { "echo off" }
    } else {
        command_text
    };

    tracing::debug!(%host, shell, "winrm execution simulated (no client library)");
    ExecOutcome::simulated(format!("[simulated winrm:{host}] ({full_username}) {command_text}"))
}

#[cfg(test)]
#[path = "winrm_tests.rs"]
mod tests;
