// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Network cluster and device connectors.
//!
//! Cluster sessions are brokered by an external controller; the core
//! validates addressing and returns session frames. Device commands run
//! through an established cluster session.

use crate::config::ConnectionConfig;
use crate::outcome::ExecOutcome;
use std::time::Duration;

/// Establish a session to a network cluster/controller.
pub async fn execute_cluster(
    _command: &str,
    config: &ConnectionConfig,
    _timeout: Duration,
) -> ExecOutcome {
    let cluster = config.cluster.clone().unwrap_or_default();
    let cluster_id = cluster.id.or_else(|| config.cluster_id.clone());
    let management_host = cluster.management_host.or_else(|| config.host.clone());
    let transport = cluster
        .transport
        .or_else(|| config.transport.clone())
        .unwrap_or_else(|| "ssh".to_string());

    let (Some(cluster_id), Some(management_host)) = (cluster_id, management_host) else {
        return ExecOutcome::connection_failure(
            "Network cluster connector requires cluster.id and management_host.",
        );
    };

    let message =
        format!("[network-cluster:{cluster_id}] connected via {transport} ({management_host})");
    tracing::info!("{message}");
    ExecOutcome::ok(message)
}

/// Run a device-level command through an existing cluster session.
pub async fn execute_device(
    command: &str,
    config: &ConnectionConfig,
    _timeout: Duration,
) -> ExecOutcome {
    let cluster = config.cluster.clone().unwrap_or_default();
    let device = config.device.clone().unwrap_or_default();

    let cluster_id = cluster.id.or_else(|| config.cluster_id.clone());
    let device_id = device.id.or_else(|| config.device_id.clone());
    let mgmt_ip = device.mgmt_ip.or(device.host).or_else(|| config.host.clone());

    let Some(cluster_id) = cluster_id else {
        return ExecOutcome::connection_failure(
            "Network device metadata missing cluster identifier.",
        );
    };
    let (Some(device_id), Some(mgmt_ip)) = (device_id, mgmt_ip) else {
        return ExecOutcome::connection_failure(
            "Network device metadata requires device id and mgmt_ip/host.",
        );
    };

    let command_text = command.trim();
    let command_text = if command_text.is_empty() {
        "show running-config | include hostname"
    } else {
        command_text
    };

    ExecOutcome::ok(format!(
        "[network-device:{device_id}] via cluster {cluster_id} ({mgmt_ip}) -> {command_text}"
    ))
}

#[cfg(test)]
#[path = "network_tests.rs"]
mod tests;
