// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential records resolved on demand during step execution.
//!
//! Material is decrypted by an external service before it reaches this type;
//! the core treats it as opaque key/value pairs and guarantees it is never
//! serialized into event payloads (see [`crate::redact`]).

use crate::tenant::TenantId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

crate::define_id! {
    /// Unique identifier for a credential.
    pub struct CredentialId("cred-");
}

/// A stored credential, addressed by `(tenant, alias)` with an optional
/// environment discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub id: CredentialId,
    pub tenant_id: TenantId,
    /// Alias used in step metadata references (`alias:NAME`).
    pub alias: String,
    /// Transport family this credential serves, e.g. "ssh" or "winrm".
    pub credential_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Decrypted secret material: username, password, api_key, private_key,
    /// domain, and tool-specific extras.
    #[serde(default)]
    pub material: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotated_at_ms: Option<u64>,
}

impl Credential {
    /// Look up a string field from the material map.
    pub fn material_str(&self, key: &str) -> Option<&str> {
        self.material.get(key).and_then(Value::as_str)
    }
}

crate::builder! {
    pub struct CredentialBuilder => Credential {
        into {
            alias: String = "app-ssh",
            credential_type: String = "ssh",
        }
        set {
            id: CredentialId = CredentialId::new(),
            tenant_id: TenantId = TenantId::from_string("tnt-test"),
            material: Map<String, Value> = Map::new(),
        }
        option {
            environment: String = None,
            host: String = None,
            port: u16 = None,
            database: String = None,
            rotated_at_ms: u64 = None,
        }
    }
}
