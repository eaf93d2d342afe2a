// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AWS SSM connector: `send-command` plus invocation polling via the AWS CLI.

use crate::config::ConnectionConfig;
use crate::outcome::ExecOutcome;
use crate::retry::{run_with_retries, RetryPolicy};
use crate::subprocess::{binary_available, run_with_timeout, SubprocessError};
use remedy_core::Metrics;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::process::Command;

const DEFAULT_RETRIES: u32 = 2;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(2500);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

pub async fn execute(
    command: &str,
    config: &ConnectionConfig,
    timeout: Duration,
    metrics: Option<&Metrics>,
) -> ExecOutcome {
    let instance_id = config.instance_id.as_deref().map(str::trim).unwrap_or_default();
    let region = config.region.as_deref().map(str::trim).unwrap_or_default();
    if instance_id.is_empty() || region.is_empty() {
        return ExecOutcome::connection_failure("SSM connector requires instance_id and region.");
    }

    let command_text = command.trim();
    let command_text =
        if command_text.is_empty() { "echo 'No command provided'" } else { command_text };

    if !binary_available("aws") {
        tracing::warn!("aws cli not installed; falling back to simulated SSM execution");
        return ExecOutcome::simulated(format!("[simulated ssm:{instance_id}] {command_text}"));
    }

    let shell = config.shell.as_deref().unwrap_or("sh").to_ascii_lowercase();
    let document = config.document_name.clone().unwrap_or_else(|| {
        if shell.contains("power") {
            "AWS-RunPowerShellScript".to_string()
        } else {
            "AWS-RunShellScript".to_string()
        }
    });

    let policy = RetryPolicy::new(
        config.retries_or(DEFAULT_RETRIES),
        config.retry_delay_or(DEFAULT_RETRY_DELAY),
    );
    let poll_interval = config
        .poll_interval_seconds
        .map(Duration::from_secs_f64)
        .unwrap_or(DEFAULT_POLL_INTERVAL);
    let execution_timeout =
        config.execution_timeout.map(Duration::from_secs).unwrap_or(timeout).max(timeout);

    run_with_retries("aws_ssm", policy, execution_timeout, execution_timeout, metrics, |attempt_timeout| {
        let document = document.clone();
        async move {
            send_and_poll(
                instance_id,
                region,
                &document,
                command_text,
                attempt_timeout,
                poll_interval,
            )
            .await
        }
    })
    .await
}

async fn send_and_poll(
    instance_id: &str,
    region: &str,
    document: &str,
    command_text: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> ExecOutcome {
    let started = Instant::now();
    let deadline = started + timeout;

    let parameters = serde_json::json!({ "commands": [command_text] }).to_string();
    let mut send = Command::new("aws");
    send.args(["ssm", "send-command", "--instance-ids", instance_id])
        .args(["--document-name", document])
        .args(["--parameters", &parameters])
        .args(["--comment", "Remedy orchestrated command"])
        .args(["--timeout-seconds", &timeout.as_secs().max(30).to_string()])
        .args(["--region", region, "--output", "json"]);

    let command_id = match run_with_timeout(send, timeout, "ssm send-command").await {
        Ok(output) if output.status.success() => {
            let body: Value =
                serde_json::from_slice(&output.stdout).unwrap_or(Value::Null);
            match body["Command"]["CommandId"].as_str() {
                Some(id) => id.to_string(),
                None => {
                    return ExecOutcome::connection_failure(
                        "SSM send-command returned no CommandId.",
                    )
                }
            }
        }
        Ok(output) => {
            return ExecOutcome::connection_failure(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            )
        }
        Err(SubprocessError::Timeout { .. }) => {
            return ExecOutcome::connection_failure(format!(
                "SSM command timed out after {} seconds.",
                timeout.as_secs()
            ))
        }
        Err(error) => return ExecOutcome::connection_failure(error.to_string()),
    };

    // Poll the invocation until it reaches a terminal status or the deadline.
    while Instant::now() < deadline {
        let mut poll = Command::new("aws");
        poll.args(["ssm", "get-command-invocation"])
            .args(["--command-id", &command_id])
            .args(["--instance-id", instance_id])
            .args(["--region", region, "--output", "json"]);

        let remaining = deadline.saturating_duration_since(Instant::now());
        let invocation = match run_with_timeout(poll, remaining.max(Duration::from_secs(1)), "ssm get-command-invocation").await {
            Ok(output) if output.status.success() => {
                serde_json::from_slice::<Value>(&output.stdout).unwrap_or(Value::Null)
            }
            // InvocationDoesNotExist right after send; keep polling.
            Ok(_) => Value::Null,
            Err(SubprocessError::Timeout { .. }) => break,
            Err(error) => return ExecOutcome::connection_failure(error.to_string()),
        };

        if let Some(status) = invocation["Status"].as_str() {
            if matches!(status, "Success" | "Failed" | "Cancelled" | "TimedOut") {
                let exit_code = invocation["ResponseCode"]
                    .as_i64()
                    .unwrap_or(if status == "Success" { 0 } else { 1 })
                    as i32;
                return ExecOutcome {
                    success: status == "Success",
                    output: invocation["StandardOutputContent"]
                        .as_str()
                        .unwrap_or_default()
                        .to_string(),
                    error: invocation["StandardErrorContent"]
                        .as_str()
                        .or(invocation["StatusDetails"].as_str())
                        .unwrap_or_default()
                        .to_string(),
                    exit_code,
                    connection_error: matches!(status, "Cancelled" | "TimedOut"),
                    duration_ms: started.elapsed().as_millis() as u64,
                    ..ExecOutcome::default()
                };
            }
        }
        tokio::time::sleep(poll_interval).await;
    }

    ExecOutcome::connection_failure(format!(
        "SSM command timed out after {} seconds.",
        timeout.as_secs()
    ))
}
