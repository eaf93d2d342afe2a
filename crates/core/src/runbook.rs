// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stored runbook records.

use crate::tenant::TenantId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

crate::define_id! {
    /// Unique identifier for a runbook.
    pub struct RunbookId("rbk-");
}

/// Runbook review status. Approved runbooks are immutable; a revision is a
/// new runbook row pointing back via `parent_version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunbookStatus {
    Draft,
    Approved,
    Archived,
}

crate::simple_display! {
    RunbookStatus {
        Draft => "draft",
        Approved => "approved",
        Archived => "archived",
    }
}

/// A stored runbook. `body` is a markdown document carrying a fenced YAML
/// spec (prechecks / steps / postchecks).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunbookRecord {
    pub id: RunbookId,
    pub tenant_id: TenantId,
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Link to the runbook this one revises, forming a version tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_version: Option<RunbookId>,
    pub status: RunbookStatus,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub metadata: Value,
}

fn default_active() -> bool {
    true
}

crate::builder! {
    pub struct RunbookBuilder => RunbookRecord {
        into {
            title: String = "restart app service",
            body: String = "",
        }
        set {
            id: RunbookId = RunbookId::new(),
            tenant_id: TenantId = TenantId::from_string("tnt-test"),
            status: RunbookStatus = RunbookStatus::Approved,
            active: bool = true,
            metadata: Value = Value::Null,
        }
        option {
            confidence: f64 = None,
            parent_version: RunbookId = None,
        }
    }
}
