// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types for the Remedy orchestration core.
//!
//! Two layers of events exist:
//!
//! - [`Event`]: state-mutation facts written to the WAL and folded into the
//!   materialized state. Serializes with `{"type": "entity:verb", ...fields}`;
//!   unknown tags deserialize to `Custom` for forward compatibility.
//! - [`SessionEventKind`] / [`EventEnvelope`] / [`ExecutionEvent`]: the
//!   externally visible execution-event feed persisted per session and fanned
//!   out on the events stream for subscribers.

use crate::credential::CredentialId;
use crate::runbook::RunbookRecord;
use crate::session::{
    AssignmentId, AssignmentStatus, ExecutionSession, SessionFeedback, SessionId, SessionStatus,
    WorkerAssignment,
};
use crate::ticket::{ConnectionId, SyncStatus, Ticket, TicketId, TicketStatus, TicketingConnection};
use crate::credential::Credential;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Type of an externally visible execution event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEventKind {
    #[serde(rename = "session.created")]
    Created,
    #[serde(rename = "session.command.requested")]
    CommandRequested,
    #[serde(rename = "session.command.started")]
    CommandStarted,
    #[serde(rename = "session.command.output")]
    CommandOutput,
    #[serde(rename = "session.command.completed")]
    CommandCompleted,
    #[serde(rename = "session.step.completed")]
    StepCompleted,
    #[serde(rename = "session.state.transition")]
    StateTransition,
    #[serde(rename = "session.waiting_approval")]
    WaitingApproval,
    #[serde(rename = "session.approved")]
    Approved,
    #[serde(rename = "session.rejected")]
    Rejected,
    #[serde(rename = "session.rollback.started")]
    RollbackStarted,
    #[serde(rename = "session.rollback.completed")]
    RollbackCompleted,
    #[serde(rename = "session.completed")]
    Completed,
    #[serde(rename = "session.failed")]
    Failed,
}

crate::simple_display! {
    SessionEventKind {
        Created => "session.created",
        CommandRequested => "session.command.requested",
        CommandStarted => "session.command.started",
        CommandOutput => "session.command.output",
        CommandCompleted => "session.command.completed",
        StepCompleted => "session.step.completed",
        StateTransition => "session.state.transition",
        WaitingApproval => "session.waiting_approval",
        Approved => "session.approved",
        Rejected => "session.rejected",
        RollbackStarted => "session.rollback.started",
        RollbackCompleted => "session.rollback.completed",
        Completed => "session.completed",
        Failed => "session.failed",
    }
}

/// Wire envelope published on the events stream and stored on the event row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event: SessionEventKind,
    pub session_id: SessionId,
    #[serde(default)]
    pub step_number: Option<u32>,
    pub payload: Value,
    /// ISO-8601 UTC timestamp.
    pub timestamp: String,
}

/// A persisted execution event row. `id` increases strictly within a session;
/// a given `stream_id` appears at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub id: u64,
    pub session_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_number: Option<u32>,
    pub kind: SessionEventKind,
    pub envelope: EventEnvelope,
    pub stream_id: String,
    pub created_at_ms: u64,
}

/// State-mutation events that drive the materialized state.
///
/// All handlers folding these into state MUST be idempotent: events are
/// applied once for immediate visibility and again on WAL replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // -- session --
    #[serde(rename = "session:created")]
    SessionCreated { session: ExecutionSession },

    #[serde(rename = "session:started")]
    SessionStarted { id: SessionId, started_at_ms: u64 },

    #[serde(rename = "session:status")]
    SessionStatusChanged {
        id: SessionId,
        status: SessionStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        completed_at_ms: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total_duration_minutes: Option<u64>,
    },

    #[serde(rename = "session:paused")]
    SessionPaused {
        id: SessionId,
        /// Status the session held before pausing, restored on resume.
        prior: SessionStatus,
    },

    #[serde(rename = "session:resumed")]
    SessionResumed { id: SessionId, status: SessionStatus },

    #[serde(rename = "session:current_step")]
    CurrentStepSet { id: SessionId, step_number: u32 },

    #[serde(rename = "session:approval_requested")]
    ApprovalRequested { id: SessionId, step_number: u32 },

    #[serde(rename = "session:approval_cleared")]
    ApprovalCleared { id: SessionId },

    #[serde(rename = "session:feedback")]
    FeedbackRecorded { id: SessionId, feedback: SessionFeedback },

    // -- step --
    #[serde(rename = "step:approval")]
    ApprovalRecorded {
        id: SessionId,
        step_number: u32,
        approved: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        approved_by: Option<String>,
        approved_at_ms: u64,
    },

    #[serde(rename = "step:completed")]
    StepCompleted {
        id: SessionId,
        step_number: u32,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        credentials_used: Vec<CredentialId>,
        completed_at_ms: u64,
    },

    // -- execution event feed --
    #[serde(rename = "event:recorded")]
    EventRecorded { event: ExecutionEvent },

    // -- assignment --
    #[serde(rename = "assignment:recorded")]
    AssignmentRecorded { assignment: WorkerAssignment },

    #[serde(rename = "assignment:status")]
    AssignmentStatusChanged {
        session_id: SessionId,
        assignment_id: AssignmentId,
        status: AssignmentStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        worker_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        acknowledged_at_ms: Option<u64>,
    },

    #[serde(rename = "assignment:details")]
    AssignmentDetailsUpdated {
        session_id: SessionId,
        assignment_id: AssignmentId,
        details: Value,
    },

    // -- ticket --
    #[serde(rename = "ticket:upserted")]
    TicketUpserted { ticket: Ticket },

    #[serde(rename = "ticket:status")]
    TicketStatusChanged {
        id: TicketId,
        status: TicketStatus,
        updated_at_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        resolved_at_ms: Option<u64>,
    },

    // -- ticketing connection --
    #[serde(rename = "connection:stored")]
    ConnectionStored { connection: TicketingConnection },

    #[serde(rename = "connection:sync")]
    ConnectionSyncUpdated {
        id: ConnectionId,
        last_sync_at_ms: u64,
        status: SyncStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// Connection metadata snapshot (carries refreshed OAuth tokens).
        metadata: Value,
    },

    // -- reference data --
    #[serde(rename = "runbook:stored")]
    RunbookStored { runbook: RunbookRecord },

    #[serde(rename = "credential:stored")]
    CredentialStored { credential: Credential },

    /// Catch-all for unknown event types (extensibility)
    #[serde(other, skip_serializing)]
    Custom,
}

impl Event {
    /// Short name for tracing.
    pub fn name(&self) -> &'static str {
        match self {
            Event::SessionCreated { .. } => "session:created",
            Event::SessionStarted { .. } => "session:started",
            Event::SessionStatusChanged { .. } => "session:status",
            Event::SessionPaused { .. } => "session:paused",
            Event::SessionResumed { .. } => "session:resumed",
            Event::CurrentStepSet { .. } => "session:current_step",
            Event::ApprovalRequested { .. } => "session:approval_requested",
            Event::ApprovalCleared { .. } => "session:approval_cleared",
            Event::FeedbackRecorded { .. } => "session:feedback",
            Event::ApprovalRecorded { .. } => "step:approval",
            Event::StepCompleted { .. } => "step:completed",
            Event::EventRecorded { .. } => "event:recorded",
            Event::AssignmentRecorded { .. } => "assignment:recorded",
            Event::AssignmentStatusChanged { .. } => "assignment:status",
            Event::AssignmentDetailsUpdated { .. } => "assignment:details",
            Event::TicketUpserted { .. } => "ticket:upserted",
            Event::TicketStatusChanged { .. } => "ticket:status",
            Event::ConnectionStored { .. } => "connection:stored",
            Event::ConnectionSyncUpdated { .. } => "connection:sync",
            Event::RunbookStored { .. } => "runbook:stored",
            Event::CredentialStored { .. } => "credential:stored",
            Event::Custom => "custom",
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
