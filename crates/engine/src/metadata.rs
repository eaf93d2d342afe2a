// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metadata preparation: credential-alias hydration and sanitization.
//!
//! Step metadata may reference a credential by alias (`alias:NAME`, with
//! `NAME@ENV`, `ENV/NAME`, and `ENV:NAME` accepted). Resolved material is
//! merged into the `credentials` block without overwriting explicit fields;
//! host/port hints flow into the `connection` and `target` blocks. Material
//! itself never reaches clients: outbound payloads go through
//! [`remedy_core::sanitize_value`].

use remedy_core::{CoreError, Credential, TenantId};
use remedy_storage::MaterializedState;
use serde_json::{Map, Value};

/// Parse an alias reference into `(name, environment)`.
///
/// Accepted shapes: `NAME`, `NAME@ENV`, `ENV/NAME`, `ENV:NAME`.
pub fn parse_alias_reference(reference: &str) -> (String, Option<String>) {
    let value = reference.trim();
    if value.is_empty() {
        return (String::new(), None);
    }
    if let Some((name, environment)) = value.split_once('@') {
        let environment = environment.trim();
        return (
            name.trim().to_string(),
            (!environment.is_empty()).then(|| environment.to_string()),
        );
    }
    if let Some((environment, name)) = value.split_once('/') {
        let environment = environment.trim();
        return (
            name.trim().to_string(),
            (!environment.is_empty()).then(|| environment.to_string()),
        );
    }
    if let Some((environment, name)) = value.split_once(':') {
        if !environment.is_empty() && !name.is_empty() {
            return (name.trim().to_string(), Some(environment.trim().to_string()));
        }
    }
    (value.to_string(), None)
}

/// Return metadata enriched with resolved credentials, without mutating the
/// input.
pub fn prepare_metadata(
    state: &MaterializedState,
    tenant_id: &TenantId,
    metadata: &Value,
) -> Result<Value, CoreError> {
    if metadata.is_null() {
        return Ok(Value::Object(Map::new()));
    }
    let mut prepared = metadata.clone();
    let Some(map) = prepared.as_object_mut() else {
        return Ok(prepared);
    };

    if map.get("credentials").is_some_and(|c| !c.is_null())
        && map.get("credential_source").is_none()
    {
        map.insert("credential_source".to_string(), Value::String("inline".to_string()));
    }

    let source = map
        .get("credential_source")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    if !source.to_ascii_lowercase().starts_with("alias:") {
        return Ok(prepared);
    }
    let reference = source["alias:".len()..].trim().to_string();
    if reference.is_empty() {
        return Err(CoreError::Validation("Credential alias provided but empty.".to_string()));
    }

    hydrate_alias(state, tenant_id, map, &reference)?;
    Ok(prepared)
}

fn hydrate_alias(
    state: &MaterializedState,
    tenant_id: &TenantId,
    metadata: &mut Map<String, Value>,
    reference: &str,
) -> Result<(), CoreError> {
    let (alias, alias_environment) = parse_alias_reference(reference);
    let environment_hint = metadata
        .get("environment")
        .and_then(Value::as_str)
        .or_else(|| {
            metadata.get("target").and_then(|t| t.get("environment")).and_then(Value::as_str)
        })
        .map(str::to_string)
        .or(alias_environment);

    let credential = state
        .resolve_credential_alias(tenant_id.as_str(), &alias, environment_hint.as_deref())
        .ok_or_else(|| {
            CoreError::NotFound(format!("Credential alias '{reference}' not found."))
        })?
        .clone();

    tracing::info!(tenant = %tenant_id, alias = %alias, "resolved credential alias");

    merge_credential_material(metadata, &credential);

    metadata.insert("credential_alias".to_string(), Value::String(credential.alias.clone()));
    metadata.insert(
        "credential_source".to_string(),
        Value::String(format!("alias:{}", credential.alias)),
    );

    let mut resolved = Map::new();
    resolved.insert("alias".to_string(), Value::String(credential.alias.clone()));
    resolved.insert("type".to_string(), Value::String(credential.credential_type.clone()));
    if let Some(environment) = credential.environment.clone().or(environment_hint) {
        resolved.insert("environment".to_string(), Value::String(environment));
    }
    resolved.insert("source".to_string(), Value::String("alias".to_string()));
    resolved.insert("credential_id".to_string(), Value::String(credential.id.to_string()));
    if let Some(rotated_at_ms) = credential.rotated_at_ms {
        resolved.insert("rotated_at".to_string(), Value::from(rotated_at_ms));
    }
    metadata.insert("credential_resolved".to_string(), Value::Object(resolved));

    Ok(())
}

/// Merge resolved material into the metadata blocks. Inline values win.
fn merge_credential_material(metadata: &mut Map<String, Value>, credential: &Credential) {
    let credentials = block(metadata, "credentials");
    for (key, value) in &credential.material {
        merge_if_missing(credentials, key, value.clone());
    }

    let host = credential.host.clone().map(Value::String);
    let port = credential.port.map(Value::from);

    let connection = block(metadata, "connection");
    if let Some(host) = host.clone() {
        merge_if_missing(connection, "host", host);
    }
    if let Some(port) = port.clone() {
        merge_if_missing(connection, "port", port);
    }

    let environment = credential.environment.clone().map(Value::String);
    let target = block(metadata, "target");
    if let Some(host) = host {
        merge_if_missing(target, "host", host);
    }
    if let Some(port) = port {
        merge_if_missing(target, "port", port);
    }
    if let Some(environment) = environment {
        merge_if_missing(target, "environment", environment);
    }
}

fn block<'a>(metadata: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let entry = metadata
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    match entry.as_object_mut() {
        Some(map) => map,
        // Unreachable: entry was just normalized to an object.
        None => unreachable!("metadata block is always an object"),
    }
}

fn merge_if_missing(target: &mut Map<String, Value>, key: &str, value: Value) {
    if value.is_null() {
        return;
    }
    let missing = match target.get(key) {
        None => true,
        Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    };
    if missing {
        target.insert(key.to_string(), value);
    }
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
