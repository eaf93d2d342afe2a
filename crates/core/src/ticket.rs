// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ticket records ingested from external ticketing tools.

use crate::tenant::TenantId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

crate::define_id! {
    /// Unique identifier for a ticket.
    pub struct TicketId("tkt-");
}

crate::define_id! {
    /// Unique identifier for a ticketing-tool connection.
    pub struct ConnectionId("conn-");
}

/// Ticket lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    Analyzing,
    InProgress,
    Resolved,
    Closed,
    Escalated,
}

crate::simple_display! {
    TicketStatus {
        Open => "open",
        Analyzing => "analyzing",
        InProgress => "in_progress",
        Resolved => "resolved",
        Closed => "closed",
        Escalated => "escalated",
    }
}

/// A ticket ingested from an external system.
///
/// `(tenant, source, external_id)` is the upsert key for polled tickets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub tenant_id: TenantId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    pub status: TicketStatus,
    /// Analysis outcome tag, e.g. "actionable" or "false_positive".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_confidence: Option<f64>,
    #[serde(default)]
    pub raw_payload: Value,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub received_at_ms: u64,
    #[serde(default)]
    pub updated_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at_ms: Option<u64>,
}

impl Ticket {
    /// Upsert key within a tenant: `(source, external_id)`.
    pub fn external_key(&self) -> Option<(&str, &str)> {
        match (self.source.as_deref(), self.external_id.as_deref()) {
            (Some(source), Some(external)) => Some((source, external)),
            _ => None,
        }
    }

    /// True when analysis flagged this ticket as a false positive.
    pub fn is_false_positive(&self) -> bool {
        self.classification.as_deref() == Some("false_positive")
    }
}

/// Sync outcome recorded on a ticketing connection after a fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Failed,
}

crate::simple_display! {
    SyncStatus {
        Success => "success",
        Failed => "failed",
    }
}

/// A configured connection to an external ticketing tool.
///
/// `metadata` holds tool-specific state including OAuth tokens; fetchers may
/// mutate it in place when refreshing tokens mid-call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketingConnection {
    pub id: ConnectionId,
    pub tenant_id: TenantId,
    /// Tool identifier, e.g. "zoho" or "manageengine".
    pub tool_name: String,
    /// Connection mode; the poller only considers "api_poll".
    pub connection_type: String,
    #[serde(default)]
    pub api_base_url: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "default_sync_interval")]
    pub sync_interval_minutes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_status: Option<SyncStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default)]
    pub metadata: Value,
}

fn default_true() -> bool {
    true
}

fn default_sync_interval() -> u64 {
    5
}

crate::builder! {
    pub struct TicketBuilder => Ticket {
        into {
            title: String = "disk full on app server",
            description: String = "",
            severity: String = "high",
        }
        set {
            id: TicketId = TicketId::new(),
            tenant_id: TenantId = TenantId::from_string("tnt-test"),
            status: TicketStatus = TicketStatus::Open,
            raw_payload: Value = Value::Null,
            metadata: Value = Value::Null,
            received_at_ms: u64 = 0,
            updated_at_ms: u64 = 0,
        }
        option {
            external_id: String = None,
            source: String = None,
            environment: String = None,
            service: String = None,
            classification: String = None,
            classification_confidence: f64 = None,
            resolved_at_ms: u64 = None,
        }
    }
}

#[cfg(test)]
#[path = "ticket_tests.rs"]
mod tests;
