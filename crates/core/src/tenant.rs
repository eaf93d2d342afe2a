// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tenant identity. All entities are tenant-scoped; cross-tenant reads are
//! rejected at the store boundary.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a tenant.
    pub struct TenantId("tnt-");
}

/// A tenant record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Tenant {
    pub fn new(name: impl Into<String>) -> Self {
        Self { id: TenantId::new(), name: name.into(), active: true }
    }
}
