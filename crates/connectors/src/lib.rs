// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! remedy-connectors: uniform command execution across transports.
//!
//! Every connector satisfies the same contract: `execute(command, config,
//! timeout)` returning an [`ExecOutcome`]. Dispatch is a tagged variant
//! switched at call time; there is no runtime class hierarchy.

pub mod api;
pub mod azure;
pub mod config;
pub mod database;
pub mod failure;
pub mod gcp;
pub mod local;
pub mod network;
pub mod outcome;
pub mod retry;
pub mod shell;
pub mod ssh;
pub mod ssm;
pub mod subprocess;
pub mod winrm;

pub use config::{ClusterRef, ConnectionConfig, DeviceRef};
pub use failure::{detect_failure_type, is_command_syntax_error, FailureKind};
pub use outcome::ExecOutcome;

use remedy_core::Metrics;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Dispatch errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectorError {
    #[error("unknown connector type: {0}")]
    UnknownType(String),
}

/// Transport selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectorKind {
    Local,
    Ssh,
    WinRm,
    AwsSsm,
    AzureBastion,
    GcpIap,
    Database,
    Api,
    NetworkCluster,
    NetworkDevice,
}

remedy_core::simple_display! {
    ConnectorKind {
        Local => "local",
        Ssh => "ssh",
        WinRm => "winrm",
        AwsSsm => "aws_ssm",
        AzureBastion => "azure_bastion",
        GcpIap => "gcp_iap",
        Database => "database",
        Api => "api",
        NetworkCluster => "network_cluster",
        NetworkDevice => "network_device",
    }
}

impl FromStr for ConnectorKind {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "local" => Ok(ConnectorKind::Local),
            "ssh" => Ok(ConnectorKind::Ssh),
            "winrm" => Ok(ConnectorKind::WinRm),
            "aws_ssm" | "ssm" => Ok(ConnectorKind::AwsSsm),
            "azure_bastion" => Ok(ConnectorKind::AzureBastion),
            "gcp_iap" => Ok(ConnectorKind::GcpIap),
            "database" => Ok(ConnectorKind::Database),
            "api" => Ok(ConnectorKind::Api),
            "network_cluster" => Ok(ConnectorKind::NetworkCluster),
            "network_device" => Ok(ConnectorKind::NetworkDevice),
            other => Err(ConnectorError::UnknownType(other.to_string())),
        }
    }
}

/// Connector dispatch with metrics instrumentation.
pub struct Connectors {
    metrics: Option<Arc<Metrics>>,
}

impl Default for Connectors {
    fn default() -> Self {
        Self::new()
    }
}

impl Connectors {
    /// Uninstrumented dispatch (tests, tooling).
    pub fn new() -> Self {
        Self { metrics: None }
    }

    /// Dispatch recording `connector_command_total`, command latency, and
    /// per-retry counters.
    pub fn with_metrics(metrics: Arc<Metrics>) -> Self {
        Self { metrics: Some(metrics) }
    }

    /// Execute a command using the connector named by
    /// `config.connector_type`.
    pub async fn execute(
        &self,
        command: &str,
        config: &ConnectionConfig,
        timeout: Duration,
    ) -> Result<ExecOutcome, ConnectorError> {
        let kind = ConnectorKind::from_str(&config.connector_type)?;
        Ok(self.execute_kind(kind, command, config, timeout).await)
    }

    /// Execute with an explicit connector kind.
    pub async fn execute_kind(
        &self,
        kind: ConnectorKind,
        command: &str,
        config: &ConnectionConfig,
        timeout: Duration,
    ) -> ExecOutcome {
        let metrics = self.metrics.as_deref();
        let started = std::time::Instant::now();

        let outcome = match kind {
            ConnectorKind::Local => local::execute(command, config, timeout).await,
            ConnectorKind::Ssh => ssh::execute(command, config, timeout, metrics).await,
            ConnectorKind::WinRm => winrm::execute(command, config, timeout).await,
            ConnectorKind::AwsSsm => ssm::execute(command, config, timeout, metrics).await,
            ConnectorKind::AzureBastion => azure::execute(command, config, timeout).await,
            ConnectorKind::GcpIap => gcp::execute(command, config, timeout).await,
            ConnectorKind::Database => database::execute(command, config, timeout).await,
            ConnectorKind::Api => api::execute(command, config, timeout).await,
            ConnectorKind::NetworkCluster => {
                network::execute_cluster(command, config, timeout).await
            }
            ConnectorKind::NetworkDevice => {
                network::execute_device(command, config, timeout).await
            }
        };

        if let Some(metrics) = metrics {
            let connector = kind.to_string();
            metrics.record_connector_result(&connector, outcome.status_label());
            metrics.observe_connector_latency(&connector, started.elapsed().as_secs_f64());
        }

        tracing::debug!(
            connector = %kind,
            success = outcome.success,
            exit_code = outcome.exit_code,
            retries = outcome.retry_count,
            simulated = outcome.simulated,
            "connector command finished"
        );
        outcome
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
