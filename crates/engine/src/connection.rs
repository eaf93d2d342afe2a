// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection-config resolution for step execution.
//!
//! Priority: CI extracted from the ticket matched to a stored credential →
//! cloud discovery (external collaborator) → ticket-embedded config →
//! runbook metadata config → local execution.

use crate::engine::Engine;
use async_trait::async_trait;
use remedy_connectors::ConnectionConfig;
use remedy_core::{Clock, Credential, ExecutionSession};
use serde_json::Value;

/// External cloud-inventory collaborator (Azure/AWS/GCP VM discovery).
/// Contract only; the core ships without an implementation.
#[async_trait]
pub trait CloudDiscovery: Send + Sync {
    /// Discover a VM by CI name, returning a ready connection config.
    async fn discover(&self, tenant_id: &str, ci_name: &str) -> Option<ConnectionConfig>;
}

impl<C: Clock> Engine<C> {
    /// Resolve the effective connection config for a session's steps.
    pub(crate) async fn resolve_connection_config(
        &self,
        session: &ExecutionSession,
    ) -> ConnectionConfig {
        let (ci_name, ticket_config) = {
            let state = self.state.lock();
            let ticket = session.ticket_id.and_then(|id| state.tickets.get(&id));
            let ci_name = ticket.and_then(remedy_runbook::extract_ci_name);
            let ticket_config = ticket
                .and_then(|t| t.metadata.get("connection_config"))
                .cloned()
                .filter(|v| v.is_object());
            (ci_name, ticket_config)
        };

        if let Some(ci_name) = &ci_name {
            // A stored credential whose host (or alias) names the CI acts as
            // the infrastructure connection record.
            let matched = {
                let state = self.state.lock();
                state
                    .credentials
                    .values()
                    .find(|credential| {
                        credential.tenant_id == session.tenant_id
                            && (credential.host.as_deref() == Some(ci_name.as_str())
                                || credential.alias == *ci_name)
                    })
                    .cloned()
            };
            if let Some(credential) = matched {
                tracing::info!(ci = %ci_name, "using stored connection for CI");
                return config_from_credential(&credential, ci_name);
            }

            if let Some(discovery) = &self.discovery {
                if let Some(config) =
                    discovery.discover(session.tenant_id.as_str(), ci_name).await
                {
                    tracing::info!(ci = %ci_name, "discovered cloud target for CI");
                    return config;
                }
            }
        }

        if let Some(config) = ticket_config.as_ref().and_then(connection_config_from_value) {
            return config;
        }

        let runbook_config = {
            let state = self.state.lock();
            state
                .runbooks
                .get(&session.runbook_id)
                .and_then(|runbook| runbook.metadata.get("connection_config"))
                .cloned()
        };
        if let Some(config) = runbook_config.as_ref().and_then(connection_config_from_value) {
            return config;
        }

        tracing::debug!(session = %session.id, "using default local connector");
        ConnectionConfig::local()
    }
}

fn connection_config_from_value(value: &Value) -> Option<ConnectionConfig> {
    let config = ConnectionConfig::from_value(value)?;
    if config.connector_type.is_empty() {
        return None;
    }
    Some(config)
}

/// Build a connection config from a stored credential record.
fn config_from_credential(credential: &Credential, ci_name: &str) -> ConnectionConfig {
    ConnectionConfig {
        connector_type: credential.credential_type.clone(),
        host: credential.host.clone().or_else(|| Some(ci_name.to_string())),
        port: credential.port,
        username: credential.material_str("username").map(str::to_string),
        password: credential.material_str("password").map(str::to_string),
        private_key: credential.material_str("private_key").map(str::to_string),
        api_key: credential.material_str("api_key").map(str::to_string),
        database: credential.database.clone(),
        ci_name: Some(ci_name.to_string()),
        credential_id: Some(credential.id.to_string()),
        ..ConnectionConfig::default()
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
