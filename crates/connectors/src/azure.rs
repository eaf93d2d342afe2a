// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Azure Run Command connector.
//!
//! Executes commands on Azure VMs through `az vm run-command invoke`.
//! Service-principal credentials, when present, are exported through the
//! AZURE_* environment; otherwise the CLI's default credential chain is
//! used. Common failure modes are mapped to operator-readable messages.

use crate::config::ConnectionConfig;
use crate::outcome::ExecOutcome;
use crate::subprocess::{binary_available, run_with_timeout, SubprocessError};
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Parsed `(subscription, resource group, vm)` triple from a VM resource id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub subscription_id: String,
    pub resource_group: String,
    pub vm_name: String,
}

/// Parse an Azure VM resource id:
/// `/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Compute/virtualMachines/{vm}`.
pub fn parse_resource_id(resource_id: &str) -> Result<ResourceRef, String> {
    let parts: Vec<&str> = resource_id.trim_matches('/').split('/').collect();
    let position = |name: &str| {
        parts.iter().position(|p| p.eq_ignore_ascii_case(name)).map(|idx| idx + 1)
    };

    let (Some(sub_idx), Some(rg_idx), Some(vm_idx)) = (
        position("subscriptions"),
        position("resourceGroups"),
        position("virtualMachines"),
    ) else {
        return Err(format!(
            "Invalid Azure resource ID format: {resource_id}. \
             Expected: /subscriptions/.../virtualMachines/..."
        ));
    };

    match (parts.get(sub_idx), parts.get(rg_idx), parts.get(vm_idx)) {
        (Some(sub), Some(rg), Some(vm)) => Ok(ResourceRef {
            subscription_id: (*sub).to_string(),
            resource_group: (*rg).to_string(),
            vm_name: (*vm).to_string(),
        }),
        _ => Err(format!(
            "Invalid Azure resource ID format: {resource_id}. \
             Expected: /subscriptions/.../virtualMachines/..."
        )),
    }
}

/// Pick the script flavour: explicit `shell`, then `os_type`, then bash.
pub fn script_command_id(shell: Option<&str>, os_type: Option<&str>) -> &'static str {
    let shell = shell.map(str::to_ascii_lowercase).filter(|s| !s.is_empty()).or_else(|| {
        os_type.map(|os| {
            if os.to_ascii_lowercase().contains("windows") {
                "powershell".to_string()
            } else {
                "bash".to_string()
            }
        })
    });
    match shell.as_deref() {
        Some("powershell") | Some("pwsh") | Some("ps1") => "RunPowerShellScript",
        _ => "RunShellScript",
    }
}

pub async fn execute(
    command: &str,
    config: &ConnectionConfig,
    timeout: Duration,
) -> ExecOutcome {
    let Some(resource_id) = config.resource_id.as_deref().filter(|r| !r.trim().is_empty())
    else {
        return ExecOutcome::connection_failure(
            "Azure connector requires resource_id (VM resource ID).",
        );
    };

    let resource = match parse_resource_id(resource_id) {
        Ok(resource) => resource,
        Err(error) => return ExecOutcome::connection_failure(error),
    };

    let command_text = command.trim();
    let command_text =
        if command_text.is_empty() { "echo 'Azure Run Command test'" } else { command_text };

    if !binary_available("az") {
        tracing::warn!("az cli not installed; falling back to simulated Azure execution");
        return ExecOutcome::simulated(format!(
            "[simulated azure:{}] {command_text}",
            resource.vm_name
        ));
    }

    let command_id = script_command_id(config.shell.as_deref(), config.os_type.as_deref());

    let mut cmd = Command::new("az");
    cmd.args(["vm", "run-command", "invoke"])
        .args(["--resource-group", &resource.resource_group])
        .args(["--name", &resource.vm_name])
        .args(["--subscription", &resource.subscription_id])
        .args(["--command-id", command_id])
        .args(["--scripts", command_text])
        .args(["--output", "json"]);

    // Service principal preferred; default chain otherwise.
    if let (Some(tenant), Some(client), Some(secret)) =
        (&config.tenant_id, &config.client_id, &config.client_secret)
    {
        cmd.env("AZURE_TENANT_ID", tenant)
            .env("AZURE_CLIENT_ID", client)
            .env("AZURE_CLIENT_SECRET", secret);
    }

    let started = Instant::now();
    match run_with_timeout(cmd, timeout, "az vm run-command").await {
        Ok(output) if output.status.success() => {
            let body: Value = serde_json::from_slice(&output.stdout).unwrap_or(Value::Null);
            let (stdout, stderr) = split_run_command_output(&body);
            let success = stderr.trim().is_empty();
            ExecOutcome {
                success,
                output: stdout,
                error: stderr,
                exit_code: if success { 0 } else { 1 },
                duration_ms: started.elapsed().as_millis() as u64,
                ..ExecOutcome::default()
            }
        }
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            classify_cli_failure(&stderr)
        }
        Err(SubprocessError::Timeout { .. }) => ExecOutcome::failure(
            format!("Azure Run Command timed out after {} seconds", timeout.as_secs()),
            -1,
        ),
        Err(error) => ExecOutcome::connection_failure(format!("Azure Run Command failed: {error}")),
    }
}

/// Run-command output arrives as `value[].message` entries prefixed with
/// `[stdout]` / `[stderr]` markers.
fn split_run_command_output(body: &Value) -> (String, String) {
    let mut stdout = String::new();
    let mut stderr = String::new();
    if let Some(items) = body["value"].as_array() {
        for item in items {
            let message = item["message"].as_str().unwrap_or_default();
            let code = item["code"].as_str().unwrap_or_default();
            if code.contains("StdErr") {
                stderr.push_str(message);
                continue;
            }
            if let Some((out_part, err_part)) = split_marked_message(message) {
                stdout.push_str(&out_part);
                stderr.push_str(&err_part);
            } else {
                stdout.push_str(message);
            }
        }
    }
    (stdout.trim().to_string(), stderr.trim().to_string())
}

fn split_marked_message(message: &str) -> Option<(String, String)> {
    let out_idx = message.find("[stdout]")?;
    let err_idx = message.find("[stderr]");
    match err_idx {
        Some(err_idx) if err_idx > out_idx => Some((
            message[out_idx + "[stdout]".len()..err_idx].trim().to_string(),
            message[err_idx + "[stderr]".len()..].trim().to_string(),
        )),
        _ => Some((message[out_idx + "[stdout]".len()..].trim().to_string(), String::new())),
    }
}

/// Map CLI failures to friendly messages for common scenarios.
fn classify_cli_failure(stderr: &str) -> ExecOutcome {
    let lower = stderr.to_ascii_lowercase();

    if lower.contains("deallocated") || lower.contains("stopped") || lower.contains("powerstate") {
        return ExecOutcome::failure(
            "VM is stopped or deallocated. Azure Run Command requires the VM to be running. \
             Please start the VM first.",
            -1,
        );
    }
    if lower.contains("403") || lower.contains("forbidden") || lower.contains("permission") {
        return ExecOutcome::failure(
            "Permission denied for Azure Run Command. The service principal needs the \
             'Virtual Machine Contributor' role on the target VM.",
            -1,
        );
    }
    if lower.contains("conflict") || lower.contains("execution is in progress") {
        // Conflict is not a connection error: the executor must not retry it.
        return ExecOutcome::failure(stderr.to_string(), -1);
    }
    ExecOutcome::connection_failure(stderr.to_string())
}

#[cfg(test)]
#[path = "azure_tests.rs"]
mod tests;
