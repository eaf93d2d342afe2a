// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! GCP IAP connector: runs commands through an IAP tunnel via gcloud.

use crate::config::ConnectionConfig;
use crate::outcome::ExecOutcome;
use crate::subprocess::{binary_available, run_with_timeout, SubprocessError};
use std::time::{Duration, Instant};
use tokio::process::Command;

pub async fn execute(
    command: &str,
    config: &ConnectionConfig,
    timeout: Duration,
) -> ExecOutcome {
    let (Some(project), Some(zone), Some(instance)) = (
        config.project_id.as_deref().filter(|s| !s.is_empty()),
        config.zone.as_deref().filter(|s| !s.is_empty()),
        config.instance_name.as_deref().filter(|s| !s.is_empty()),
    ) else {
        return ExecOutcome::connection_failure(
            "GCP IAP connector requires project_id, zone, and instance_name.",
        );
    };

    let command_text = command.trim();
    let command_text = if command_text.is_empty() { "uname -a" } else { command_text };

    if !binary_available("gcloud") {
        tracing::warn!("gcloud not installed; falling back to simulated GCP execution");
        return ExecOutcome::simulated(format!(
            "[simulated gcp-iap:{project}/{zone}/{instance}] {command_text}"
        ));
    }

    let mut cmd = Command::new("gcloud");
    cmd.args(["compute", "ssh", instance])
        .args(["--project", project])
        .args(["--zone", zone])
        .arg("--tunnel-through-iap")
        .arg("--quiet")
        .args(["--command", command_text]);

    let started = Instant::now();
    match run_with_timeout(cmd, timeout, "gcloud compute ssh").await {
        Ok(output) => {
            let exit_code = output.status.code().unwrap_or(-1);
            ExecOutcome {
                success: output.status.success(),
                output: String::from_utf8_lossy(&output.stdout).into_owned(),
                error: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code,
                duration_ms: started.elapsed().as_millis() as u64,
                ..ExecOutcome::default()
            }
        }
        Err(SubprocessError::Timeout { .. }) => ExecOutcome::connection_failure(format!(
            "GCP IAP command timed out after {} seconds",
            timeout.as_secs()
        )),
        Err(error) => ExecOutcome::connection_failure(error.to_string()),
    }
}
