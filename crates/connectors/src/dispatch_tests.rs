// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use remedy_core::metrics::{CONNECTOR_COMMAND_LATENCY_SECONDS, CONNECTOR_COMMAND_TOTAL};

#[yare::parameterized(
    local = { "local", ConnectorKind::Local },
    ssh = { "ssh", ConnectorKind::Ssh },
    winrm = { "winrm", ConnectorKind::WinRm },
    aws_ssm = { "aws_ssm", ConnectorKind::AwsSsm },
    ssm_alias = { "ssm", ConnectorKind::AwsSsm },
    azure = { "azure_bastion", ConnectorKind::AzureBastion },
    gcp = { "gcp_iap", ConnectorKind::GcpIap },
    database = { "database", ConnectorKind::Database },
    api = { "api", ConnectorKind::Api },
    cluster = { "network_cluster", ConnectorKind::NetworkCluster },
    device = { "network_device", ConnectorKind::NetworkDevice },
    mixed_case = { "SSH", ConnectorKind::Ssh },
    empty_defaults_local = { "", ConnectorKind::Local },
)]
fn kind_parsing(input: &str, expected: ConnectorKind) {
    assert_eq!(input.parse::<ConnectorKind>().unwrap(), expected);
}

#[test]
fn unknown_kind_is_rejected() {
    let error = "teleport".parse::<ConnectorKind>().unwrap_err();
    assert_eq!(error, ConnectorError::UnknownType("teleport".to_string()));
}

#[tokio::test]
async fn execute_dispatches_by_config_type() {
    let connectors = Connectors::new();
    let outcome = connectors
        .execute("echo dispatched", &ConnectionConfig::local(), Duration::from_secs(10))
        .await
        .unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.output.trim(), "dispatched");
}

#[tokio::test]
async fn execute_rejects_unknown_type() {
    let connectors = Connectors::new();
    let config = ConnectionConfig {
        connector_type: "carrier_pigeon".to_string(),
        ..ConnectionConfig::default()
    };
    let result = connectors.execute("coo", &config, Duration::from_secs(1)).await;
    assert!(matches!(result, Err(ConnectorError::UnknownType(_))));
}

#[tokio::test]
async fn metrics_record_command_results() {
    let metrics = std::sync::Arc::new(Metrics::new());
    let connectors = Connectors::with_metrics(metrics.clone());

    connectors
        .execute("echo ok", &ConnectionConfig::local(), Duration::from_secs(10))
        .await
        .unwrap();
    connectors
        .execute("false", &ConnectionConfig::local(), Duration::from_secs(10))
        .await
        .unwrap();

    assert_eq!(metrics.counter(CONNECTOR_COMMAND_TOTAL, &["local", "success"]), 1);
    assert_eq!(metrics.counter(CONNECTOR_COMMAND_TOTAL, &["local", "failed"]), 1);
    assert_eq!(metrics.histogram(CONNECTOR_COMMAND_LATENCY_SECONDS, &["local"]).count, 2);
}

#[test]
fn kind_display_names() {
    assert_eq!(ConnectorKind::AwsSsm.to_string(), "aws_ssm");
    assert_eq!(ConnectorKind::NetworkDevice.to_string(), "network_device");
}
