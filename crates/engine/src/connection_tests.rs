// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{harness, tenant};
use remedy_core::{Event, ExecutionSession, SessionId, Ticket};
use serde_json::json;

fn session_with_ticket(
    h: &crate::test_support::TestHarness,
    ticket: Option<Ticket>,
    runbook_metadata: Value,
) -> ExecutionSession {
    let runbook = crate::test_support::runbook_with_body("```yaml\nsteps:\n  - name: a\n    command: echo a\n```");
    let mut runbook = runbook;
    runbook.metadata = runbook_metadata;
    h.engine.store_runbook(runbook.clone()).unwrap();

    let ticket_id = ticket.map(|t| h.engine.upsert_ticket(t).unwrap().id);
    let session = ExecutionSession::builder()
        .id(SessionId::new())
        .tenant_id(tenant())
        .runbook_id(runbook.id)
        .build();
    let mut session = session;
    session.ticket_id = ticket_id;
    h.engine.commit(Event::SessionCreated { session: session.clone() }).unwrap();
    session
}

#[tokio::test]
async fn default_is_local() {
    let h = harness();
    let session = session_with_ticket(&h, None, Value::Null);
    let config = h.engine.resolve_connection_config(&session).await;
    assert_eq!(config.connector_type, "local");
}

#[tokio::test]
async fn ticket_ci_matches_stored_credential() {
    let h = harness();
    let mut material = serde_json::Map::new();
    material.insert("username".to_string(), json!("svc"));
    material.insert("password".to_string(), json!("pw"));
    h.engine
        .store_credential(
            remedy_core::Credential::builder()
                .tenant_id(tenant())
                .alias("web-ssh")
                .credential_type("ssh")
                .material(material)
                .host("web-01")
                .port(22u16)
                .build(),
        )
        .unwrap();

    let ticket = Ticket::builder()
        .tenant_id(tenant())
        .metadata(json!({"ci_name": "web-01"}))
        .build();
    let session = session_with_ticket(&h, Some(ticket), Value::Null);

    let config = h.engine.resolve_connection_config(&session).await;
    assert_eq!(config.connector_type, "ssh");
    assert_eq!(config.host.as_deref(), Some("web-01"));
    assert_eq!(config.username.as_deref(), Some("svc"));
    assert_eq!(config.ci_name.as_deref(), Some("web-01"));
    assert!(config.credential_id.is_some());
}

#[tokio::test]
async fn ticket_embedded_config_wins_over_runbook() {
    let h = harness();
    let ticket = Ticket::builder()
        .tenant_id(tenant())
        .metadata(json!({"connection_config": {"connector_type": "winrm", "host": "win-7"}}))
        .build();
    let session = session_with_ticket(
        &h,
        Some(ticket),
        json!({"connection_config": {"connector_type": "ssh", "host": "other"}}),
    );

    let config = h.engine.resolve_connection_config(&session).await;
    assert_eq!(config.connector_type, "winrm");
    assert_eq!(config.host.as_deref(), Some("win-7"));
}

#[tokio::test]
async fn runbook_metadata_config_is_the_fallback() {
    let h = harness();
    let session = session_with_ticket(
        &h,
        None,
        json!({"connection_config": {"connector_type": "database", "host": "db-1", "db_type": "postgresql"}}),
    );

    let config = h.engine.resolve_connection_config(&session).await;
    assert_eq!(config.connector_type, "database");
    assert_eq!(config.db_type.as_deref(), Some("postgresql"));
}

struct FixedDiscovery;

#[async_trait::async_trait]
impl CloudDiscovery for FixedDiscovery {
    async fn discover(&self, _tenant_id: &str, ci_name: &str) -> Option<ConnectionConfig> {
        Some(ConnectionConfig {
            connector_type: "azure_bastion".to_string(),
            resource_id: Some(format!(
                "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/{ci_name}"
            )),
            ..ConnectionConfig::default()
        })
    }
}

#[tokio::test]
async fn cloud_discovery_is_consulted_for_unmatched_cis() {
    let h = crate::test_support::harness_with_discovery(std::sync::Arc::new(FixedDiscovery));
    let ticket = Ticket::builder()
        .tenant_id(tenant())
        .metadata(json!({"ci_name": "vm-worker-3"}))
        .build();
    let session = session_with_ticket(&h, Some(ticket), Value::Null);

    let config = h.engine.resolve_connection_config(&session).await;
    assert_eq!(config.connector_type, "azure_bastion");
    assert!(config.resource_id.as_deref().unwrap_or_default().ends_with("vm-worker-3"));
}
