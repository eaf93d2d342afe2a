// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn from_value_reads_known_fields() {
    let value = json!({
        "connector_type": "ssh",
        "host": "web-01",
        "port": 2222,
        "username": "svc",
        "retries": 5,
        "retry_delay_seconds": 0.5,
        "custom_field": "kept",
    });
    let config = ConnectionConfig::from_value(&value).unwrap();

    assert_eq!(config.connector_type, "ssh");
    assert_eq!(config.host.as_deref(), Some("web-01"));
    assert_eq!(config.port, Some(2222));
    assert_eq!(config.retries_or(3), 5);
    assert_eq!(config.retry_delay_or(Duration::from_secs(2)), Duration::from_millis(500));
    assert_eq!(config.extra["custom_field"], "kept");
}

#[test]
fn defaults_apply_when_fields_missing() {
    let config = ConnectionConfig::from_value(&json!({"connector_type": "local"})).unwrap();
    assert_eq!(config.retries_or(3), 3);
    assert_eq!(config.retry_delay_or(Duration::from_secs(2)), Duration::from_secs(2));
    assert_eq!(config.connect_timeout_or(Duration::from_secs(10)), Duration::from_secs(10));
}

#[test]
fn retries_are_floored_at_one() {
    let config = ConnectionConfig { retries: Some(0), ..ConnectionConfig::default() };
    assert_eq!(config.retries_or(3), 1);
}

#[test]
fn local_constructor() {
    let config = ConnectionConfig::local();
    assert_eq!(config.connector_type, "local");
}

#[test]
fn roundtrips_through_json() {
    let config = ConnectionConfig {
        connector_type: "azure_bastion".to_string(),
        resource_id: Some("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm".to_string()),
        tenant_id: Some("t".to_string()),
        ..ConnectionConfig::default()
    };
    let value = serde_json::to_value(&config).unwrap();
    let back = ConnectionConfig::from_value(&value).unwrap();
    assert_eq!(back, config);
}
