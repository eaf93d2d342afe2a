// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from WAL replay

mod helpers;
mod sessions;
mod tickets;

use remedy_core::{
    Credential, CredentialId, Event, ExecutionEvent, ExecutionSession, RunbookId, RunbookRecord,
    SessionId, Ticket, TicketId, TicketingConnection, WorkerAssignment,
};
use remedy_core::ticket::ConnectionId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Materialized state built from WAL events.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MaterializedState {
    pub sessions: HashMap<SessionId, ExecutionSession>,
    /// Execution-event feed per session, ordered by `id` ascending.
    #[serde(default)]
    pub events: HashMap<SessionId, Vec<ExecutionEvent>>,
    /// Worker assignments per session, in creation order (latest wins).
    #[serde(default)]
    pub assignments: HashMap<SessionId, Vec<WorkerAssignment>>,
    #[serde(default)]
    pub tickets: HashMap<TicketId, Ticket>,
    #[serde(default)]
    pub runbooks: HashMap<RunbookId, RunbookRecord>,
    #[serde(default)]
    pub credentials: HashMap<CredentialId, Credential>,
    #[serde(default)]
    pub connections: HashMap<ConnectionId, TicketingConnection>,
    /// `(tenant, source, external_id)` → ticket, for poller upserts.
    /// Rebuilt from ticket events, never serialized.
    #[serde(skip)]
    pub ticket_index: HashMap<(String, String, String), TicketId>,
}

impl MaterializedState {
    /// Get a session by ID or unique prefix (like git commit hashes)
    pub fn get_session(&self, id: &str) -> Option<&ExecutionSession> {
        helpers::find_by_prefix(&self.sessions, id)
    }

    /// Get a ticket by ID or unique prefix
    pub fn get_ticket(&self, id: &str) -> Option<&Ticket> {
        helpers::find_by_prefix(&self.tickets, id)
    }

    /// Look up a ticket by its external upsert key.
    pub fn ticket_by_external(
        &self,
        tenant: &str,
        source: &str,
        external_id: &str,
    ) -> Option<&Ticket> {
        let key = (tenant.to_string(), source.to_string(), external_id.to_string());
        self.ticket_index.get(&key).and_then(|id| self.tickets.get(id))
    }

    /// Resolve a credential alias within a tenant.
    ///
    /// An environment hint narrows the match when given; a credential with no
    /// environment acts as the fallback, then any alias match in the tenant.
    pub fn resolve_credential_alias(
        &self,
        tenant: &str,
        alias: &str,
        environment: Option<&str>,
    ) -> Option<&Credential> {
        let mut fallback = None;
        let mut any = None;
        for credential in self.credentials.values() {
            if credential.tenant_id.as_str() != tenant || credential.alias != alias {
                continue;
            }
            match (environment, credential.environment.as_deref()) {
                (Some(hint), Some(env)) if hint == env => return Some(credential),
                (_, None) if fallback.is_none() => fallback = Some(credential),
                _ if any.is_none() => any = Some(credential),
                _ => {}
            }
        }
        fallback.or(any)
    }

    /// The most recent assignment for a session, preferring ones that carry
    /// metadata details.
    pub fn latest_assignment(&self, session_id: &SessionId) -> Option<&WorkerAssignment> {
        let assignments = self.assignments.get(session_id)?;
        assignments
            .iter()
            .rev()
            .find(|a| !a.details.is_null())
            .or_else(|| assignments.last())
    }

    /// Next event-feed id for a session (`id` strictly increases).
    pub fn next_event_id(&self, session_id: &SessionId) -> u64 {
        self.events
            .get(session_id)
            .and_then(|events| events.last())
            .map(|event| event.id + 1)
            .unwrap_or(1)
    }

    /// True when a stream id was already recorded for the session
    /// (at-most-once event rows).
    pub fn has_stream_id(&self, session_id: &SessionId, stream_id: &str) -> bool {
        self.events
            .get(session_id)
            .is_some_and(|events| events.iter().any(|e| e.stream_id == stream_id))
    }

    /// Apply an event to derive state changes.
    ///
    /// This is the event-sourcing approach where state is derived from
    /// events. Events are facts about what happened; state is derived from
    /// those facts.
    ///
    /// # Idempotency Requirement
    ///
    /// **All event handlers MUST be idempotent.** Applying the same event
    /// twice must produce the same state as applying it once: events are
    /// applied once for immediate visibility and again during WAL replay.
    ///
    /// Guidelines for idempotent handlers:
    /// - Use assignment (`=`) instead of mutation (`+=`, `-=`)
    /// - Guard inserts with existence checks
    /// - Guard completion writes with already-completed checks
    pub fn apply_event(&mut self, event: &Event) {
        match event {
            // Sessions, steps, assignments, and the event feed
            Event::SessionCreated { .. }
            | Event::SessionStarted { .. }
            | Event::SessionStatusChanged { .. }
            | Event::SessionPaused { .. }
            | Event::SessionResumed { .. }
            | Event::CurrentStepSet { .. }
            | Event::ApprovalRequested { .. }
            | Event::ApprovalCleared { .. }
            | Event::ApprovalRecorded { .. }
            | Event::StepCompleted { .. }
            | Event::FeedbackRecorded { .. }
            | Event::EventRecorded { .. }
            | Event::AssignmentRecorded { .. }
            | Event::AssignmentStatusChanged { .. }
            | Event::AssignmentDetailsUpdated { .. } => sessions::apply(self, event),

            // Tickets, connections, and reference data
            Event::TicketUpserted { .. }
            | Event::TicketStatusChanged { .. }
            | Event::ConnectionStored { .. }
            | Event::ConnectionSyncUpdated { .. }
            | Event::RunbookStored { .. }
            | Event::CredentialStored { .. } => tickets::apply(self, event),

            // Unknown events carry no state
            Event::Custom => {}
        }
    }
}

#[cfg(test)]
#[path = "../state_tests.rs"]
mod tests;
