// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution controller façade: the entry points the REST surface consumes.

use crate::engine::{Engine, EngineError};
use crate::events::EventView;
use crate::metadata::prepare_metadata;
use crate::verify::ExecutionDisposition;
use remedy_bus::{PENDING_MARKER, SCOPE_SESSION_ASSIGN, SCOPE_SESSION_COMMAND, SCOPE_SESSION_CREATE};
use remedy_core::{
    sanitize_value, AssignmentId, AssignmentStatus, Clock, Credential, Event, ExecutionSession,
    RunbookId, RunbookRecord, SessionEventKind, SessionFeedback, SessionId, SessionStatus,
    StepType, TenantId, Ticket, TicketId, TicketingConnection, WorkerAssignment,
};
use remedy_runbook::{build_plan, normalize_body, parse_runbook, TicketFacts};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// Request to create an execution session.
#[derive(Debug, Clone)]
pub struct CreateSessionRequest {
    pub runbook_id: RunbookId,
    pub tenant_id: TenantId,
    pub ticket_id: Option<TicketId>,
    pub user_id: Option<String>,
    pub issue_description: Option<String>,
    pub metadata: Option<Value>,
    pub idempotency_key: Option<String>,
}

/// Manual command submission.
#[derive(Debug, Clone)]
pub struct ManualCommandRequest {
    pub command: String,
    pub shell: Option<String>,
    pub run_as: Option<String>,
    pub reason: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub user_id: Option<String>,
    pub idempotency_key: Option<String>,
}

/// Atomic patch of a step's completion state.
#[derive(Debug, Clone)]
pub struct UpdateStepRequest {
    pub step_number: u32,
    pub step_type: StepType,
    pub completed: bool,
    pub success: Option<bool>,
    pub output: Option<String>,
    pub notes: Option<String>,
    pub approved: Option<bool>,
}

/// Session control verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Pause,
    Resume,
    Rollback,
}

remedy_core::simple_display! {
    ControlAction {
        Pause => "pause",
        Resume => "resume",
        Rollback => "rollback",
    }
}

impl<C: Clock> Engine<C> {
    /// Create an execution session with a persisted linear plan.
    ///
    /// With an idempotency key, a repeated request returns the session the
    /// first request created.
    pub async fn create_execution_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<ExecutionSession, EngineError> {
        if let Some(key) = &request.idempotency_key {
            match self.idempotency.reserve(SCOPE_SESSION_CREATE, key).await? {
                Some(existing) if existing == PENDING_MARKER => {
                    return Err(EngineError::conflict(
                        "session creation already in progress for this idempotency key",
                    ));
                }
                Some(existing) => {
                    let state = self.state.lock();
                    return state
                        .get_session(&existing)
                        .cloned()
                        .ok_or_else(|| {
                            EngineError::conflict(format!(
                                "idempotency key maps to missing session {existing}"
                            ))
                        });
                }
                None => {}
            }
        }

        match self.create_session_inner(&request).await {
            Ok(session) => {
                if let Some(key) = &request.idempotency_key {
                    self.idempotency
                        .commit(SCOPE_SESSION_CREATE, key, session.id.as_str())
                        .await?;
                }
                Ok(session)
            }
            Err(error) => {
                if let Some(key) = &request.idempotency_key {
                    let _ = self.idempotency.release(SCOPE_SESSION_CREATE, key).await;
                }
                Err(error)
            }
        }
    }

    async fn create_session_inner(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<ExecutionSession, EngineError> {
        let (runbook, ticket) = {
            let state = self.state.lock();
            let runbook = state
                .runbooks
                .get(&request.runbook_id)
                .filter(|r| r.tenant_id == request.tenant_id)
                .cloned()
                .ok_or_else(|| {
                    EngineError::not_found(format!("runbook {}", request.runbook_id))
                })?;
            let ticket = request.ticket_id.and_then(|id| state.tickets.get(&id).cloned());
            (runbook, ticket)
        };

        // Ticket-specific normalization before parsing; absent facts leave
        // the body untouched.
        let body = match &ticket {
            Some(ticket) => normalize_body(&runbook.body, &TicketFacts::from_ticket(ticket)),
            None => runbook.body.clone(),
        };
        let plan = build_plan(&parse_runbook(&body))
            .map_err(|error| EngineError::validation(error.to_string()))?;

        let session = ExecutionSession {
            id: SessionId::new(),
            tenant_id: request.tenant_id,
            runbook_id: request.runbook_id,
            ticket_id: request.ticket_id,
            user_id: request.user_id.clone(),
            issue_description: request.issue_description.clone(),
            status: SessionStatus::Pending,
            current_step: None,
            total_steps: plan.total_steps(),
            waiting_for_approval: false,
            approval_step_number: None,
            transport_channel: None,
            sandbox_profile: plan.sandbox_profile,
            assignment_retry_count: 0,
            last_event_seq: None,
            created_at_ms: self.clock.epoch_ms(),
            started_at_ms: None,
            completed_at_ms: None,
            total_duration_minutes: None,
            paused_status: None,
            feedback: None,
            steps: plan.steps,
        };
        let session_id = session.id;
        self.commit(Event::SessionCreated { session: session.clone() })?;

        self.publish_assignment(&session, request.metadata.clone().unwrap_or(Value::Null))
            .await?;

        self.publish_event(
            session_id,
            SessionEventKind::Created,
            json!({
                "runbook_id": session.runbook_id,
                "ticket_id": session.ticket_id,
                "total_steps": session.total_steps,
                "sandbox_profile": session.sandbox_profile,
            }),
            None,
        )
        .await?;

        let state = self.state.lock();
        Ok(state.sessions.get(&session_id).cloned().unwrap_or(session))
    }

    /// Publish an assignment for the session on the assign stream and record
    /// it, with at-most-once semantics across orchestrator instances.
    async fn publish_assignment(
        &self,
        session: &ExecutionSession,
        metadata: Value,
    ) -> Result<(), EngineError> {
        let prepared = {
            let state = self.state.lock();
            prepare_metadata(&state, &session.tenant_id, &metadata)?
        };

        let assignment = WorkerAssignment {
            id: AssignmentId::new(),
            session_id: session.id,
            worker_id: None,
            status: AssignmentStatus::Pending,
            details: prepared.clone(),
            created_at_ms: self.clock.epoch_ms(),
            acknowledged_at_ms: None,
        };
        self.commit(Event::AssignmentRecorded { assignment })?;

        if !self.streams.orchestration_enabled {
            return Ok(());
        }

        if let Some(existing) =
            self.idempotency.reserve(SCOPE_SESSION_ASSIGN, session.id.as_str()).await?
        {
            tracing::debug!(session = %session.id, stream_id = %existing, "assignment already published");
            return Ok(());
        }

        let payload = json!({
            "session_id": session.id,
            "tenant_id": session.tenant_id,
            "runbook_id": session.runbook_id,
            "sandbox_profile": session.sandbox_profile,
            "metadata": sanitize_value(&prepared),
        });
        match self
            .bus
            .publish(&self.streams.assign, &payload, Some(self.streams.default_maxlen), true)
            .await
        {
            Ok(stream_id) => {
                self.metrics.record_assignment("published");
                self.idempotency
                    .commit(SCOPE_SESSION_ASSIGN, session.id.as_str(), &stream_id.to_string())
                    .await?;
                Ok(())
            }
            Err(error) => {
                self.metrics.record_assignment("failed");
                let _ = self.idempotency.release(SCOPE_SESSION_ASSIGN, session.id.as_str()).await;
                Err(error.into())
            }
        }
    }

    /// Fetch a session by id or unique prefix.
    pub fn get_execution_session(&self, id: &str) -> Option<ExecutionSession> {
        self.state.lock().get_session(id).cloned()
    }

    /// All sessions, newest first, paginated.
    pub fn list_sessions(&self, limit: usize, offset: usize) -> Vec<ExecutionSession> {
        let state = self.state.lock();
        let mut sessions: Vec<_> = state.sessions.values().cloned().collect();
        sessions.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms));
        sessions.into_iter().skip(offset).take(limit).collect()
    }

    /// Execution history for one runbook, newest first.
    pub fn runbook_execution_history(&self, runbook_id: RunbookId) -> Vec<ExecutionSession> {
        let state = self.state.lock();
        let mut sessions: Vec<_> = state
            .sessions
            .values()
            .filter(|s| s.runbook_id == runbook_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms));
        sessions
    }

    /// Atomic patch of a step. Approval transitions route through the
    /// approval controller; terminal sessions reject all mutation.
    pub async fn update_execution_step(
        &self,
        session_id: SessionId,
        request: UpdateStepRequest,
    ) -> Result<ExecutionSession, EngineError> {
        if let Some(approve) = request.approved {
            self.approve_step(session_id, request.step_number, None, approve).await?;
            let state = self.state.lock();
            return state
                .sessions
                .get(&session_id)
                .cloned()
                .ok_or_else(|| EngineError::not_found(format!("execution session {session_id}")));
        }

        {
            let state = self.state.lock();
            let session = state
                .sessions
                .get(&session_id)
                .ok_or_else(|| EngineError::not_found(format!("execution session {session_id}")))?;
            if session.is_terminal() {
                return Err(EngineError::conflict(format!(
                    "session {session_id} is terminal ({})",
                    session.status
                )));
            }
            let step = session
                .step(request.step_number)
                .ok_or_else(|| EngineError::not_found(format!("step {}", request.step_number)))?;
            if step.step_type != request.step_type {
                return Err(EngineError::validation(format!(
                    "step {} is a {} step, not {}",
                    request.step_number, step.step_type, request.step_type
                )));
            }
            if step.completed {
                return Err(EngineError::conflict(format!(
                    "step {} already completed",
                    request.step_number
                )));
            }
        }

        if request.completed {
            self.commit(Event::StepCompleted {
                id: session_id,
                step_number: request.step_number,
                success: request.success.unwrap_or(false),
                output: request.output.as_deref().map(remedy_core::redact_secrets),
                error: None,
                notes: request.notes.clone(),
                credentials_used: Vec::new(),
                completed_at_ms: self.clock.epoch_ms(),
            })?;
            self.publish_event(
                session_id,
                SessionEventKind::StepCompleted,
                json!({
                    "step_number": request.step_number,
                    "step_type": request.step_type.to_string(),
                    "success": request.success.unwrap_or(false),
                    "manual": true,
                }),
                Some(request.step_number),
            )
            .await?;
        }

        let state = self.state.lock();
        state
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(format!("execution session {session_id}")))
    }

    /// Queue a manual command for a session. Idempotent: a repeated request
    /// (same command/shell/run_as/reason) yields the same stream id.
    pub async fn submit_manual_command(
        &self,
        session_id: SessionId,
        request: ManualCommandRequest,
    ) -> Result<EventView, EngineError> {
        {
            let state = self.state.lock();
            if !state.sessions.contains_key(&session_id) {
                return Err(EngineError::not_found(format!("execution session {session_id}")));
            }
        }

        let key = request
            .idempotency_key
            .clone()
            .unwrap_or_else(|| command_idempotency_key(session_id, &request));

        match self.idempotency.reserve(SCOPE_SESSION_COMMAND, &key).await? {
            Some(existing) if existing == PENDING_MARKER => {
                return Err(EngineError::conflict(
                    "command submission already in progress for this idempotency key",
                ));
            }
            Some(stream_id) => {
                return self.command_event_by_stream_id(session_id, &stream_id).ok_or_else(
                    || {
                        EngineError::conflict(format!(
                            "idempotency key maps to missing command event {stream_id}"
                        ))
                    },
                );
            }
            None => {}
        }

        match self.submit_command_inner(session_id, &request, &key).await {
            Ok(view) => {
                self.idempotency.commit(SCOPE_SESSION_COMMAND, &key, &view.stream_id).await?;
                Ok(view)
            }
            Err(error) => {
                let _ = self.idempotency.release(SCOPE_SESSION_COMMAND, &key).await;
                Err(error)
            }
        }
    }

    async fn submit_command_inner(
        &self,
        session_id: SessionId,
        request: &ManualCommandRequest,
        key: &str,
    ) -> Result<EventView, EngineError> {
        // Hydrate connection metadata from the latest assignment.
        let (tenant_id, assignment) = {
            let state = self.state.lock();
            let session = state
                .sessions
                .get(&session_id)
                .ok_or_else(|| EngineError::not_found(format!("execution session {session_id}")))?;
            (session.tenant_id, state.latest_assignment(&session_id).cloned())
        };

        let prepared = match &assignment {
            Some(assignment) if !assignment.details.is_null() => {
                let prepared = {
                    let state = self.state.lock();
                    prepare_metadata(&state, &tenant_id, &assignment.details)?
                };
                self.commit(Event::AssignmentDetailsUpdated {
                    session_id,
                    assignment_id: assignment.id,
                    details: prepared.clone(),
                })?;
                prepared
            }
            _ => Value::Object(serde_json::Map::new()),
        };
        let connection = prepared.get("connection").cloned().unwrap_or_else(|| prepared.clone());

        let shell = request.shell.clone().unwrap_or_else(|| "bash".to_string());
        let timeout_seconds = request.timeout_seconds.unwrap_or(600);
        let command_payload = json!({
            "session_id": session_id,
            "command": request.command.clone(),
            "shell": shell.clone(),
            "run_as": request.run_as.clone(),
            "reason": request.reason.clone(),
            "timeout_seconds": timeout_seconds,
            "user_id": request.user_id.clone(),
            "idempotency_key": key,
            "metadata": prepared.clone(),
            "connection": connection.clone(),
        });

        let stream_id = if self.streams.orchestration_enabled {
            self.bus
                .publish(
                    &self.streams.command,
                    &command_payload,
                    Some(self.streams.default_maxlen),
                    true,
                )
                .await?
                .to_string()
        } else {
            format!("local-{}", &key[..16.min(key.len())])
        };

        let event_payload = json!({
            "session_id": session_id,
            "command": request.command.clone(),
            "shell": shell,
            "run_as": request.run_as.clone(),
            "reason": request.reason.clone(),
            "timeout_seconds": timeout_seconds,
            "user_id": request.user_id.clone(),
            "stream_id": stream_id.clone(),
            "status": "queued",
            "idempotency_key": key,
            "metadata": prepared,
            "connection": connection,
        });
        self.publish_event(session_id, SessionEventKind::CommandRequested, event_payload, None)
            .await?;

        // The persisted row carries the command stream id in its payload;
        // index by it for idempotent replays.
        self.latest_event_view(session_id).ok_or_else(|| {
            EngineError::conflict("failed to persist manual command event".to_string())
        })
        .map(|mut view| {
            view.stream_id = stream_id;
            view
        })
    }

    fn latest_event_view(&self, session_id: SessionId) -> Option<EventView> {
        let state = self.state.lock();
        state.events.get(&session_id).and_then(|events| events.last()).map(|event| EventView {
            id: event.id,
            session_id: event.session_id,
            step_number: event.step_number,
            event: event.kind,
            payload: event.envelope.payload.clone(),
            stream_id: event.stream_id.clone(),
            created_at: remedy_core::iso8601_utc(event.created_at_ms),
            timestamp: event.envelope.timestamp.clone(),
        })
    }

    /// Pause, resume, or roll back a session.
    pub async fn control_execution_session(
        &self,
        session_id: SessionId,
        action: ControlAction,
        reason: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<ExecutionSession, EngineError> {
        let session = {
            let state = self.state.lock();
            state
                .sessions
                .get(&session_id)
                .cloned()
                .ok_or_else(|| EngineError::not_found(format!("execution session {session_id}")))?
        };

        match action {
            ControlAction::Pause => {
                if !matches!(
                    session.status,
                    SessionStatus::InProgress | SessionStatus::WaitingApproval
                ) {
                    return Err(EngineError::conflict(format!(
                        "cannot pause session in status {}",
                        session.status
                    )));
                }
                self.commit(Event::SessionPaused { id: session_id, prior: session.status })?;
                self.metrics
                    .record_state_transition(&session.status.to_string(), "paused");
                self.publish_event(
                    session_id,
                    SessionEventKind::StateTransition,
                    json!({
                        "from": session.status.to_string(),
                        "to": "paused",
                        "reason": reason,
                        "user_id": user_id,
                    }),
                    None,
                )
                .await?;
            }

            ControlAction::Resume => {
                if session.status != SessionStatus::Paused {
                    return Err(EngineError::conflict(format!(
                        "cannot resume session in status {}",
                        session.status
                    )));
                }
                let restored = session.paused_status.unwrap_or(SessionStatus::InProgress);
                self.commit(Event::SessionResumed { id: session_id, status: restored })?;
                self.metrics.record_state_transition("paused", &restored.to_string());
                self.publish_event(
                    session_id,
                    SessionEventKind::StateTransition,
                    json!({"from": "paused", "to": restored.to_string(), "reason": reason}),
                    None,
                )
                .await?;

                if restored == SessionStatus::InProgress {
                    self.advance_after_resume(session_id).await?;
                }
            }

            ControlAction::Rollback => {
                if !matches!(session.status, SessionStatus::Paused | SessionStatus::Failed) {
                    return Err(EngineError::conflict(format!(
                        "cannot roll back session in status {}",
                        session.status
                    )));
                }
                self.rollback_execution(session_id, None).await?;
                self.transition_session(
                    session_id,
                    SessionStatus::RolledBack,
                    Some(self.clock.epoch_ms()),
                    None,
                )
                .await?;
            }
        }

        let state = self.state.lock();
        state
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(format!("execution session {session_id}")))
    }

    /// After resume, advance to the next not-completed step (the paused step
    /// never started). An approval-gated step re-enters the wait state.
    async fn advance_after_resume(&self, session_id: SessionId) -> Result<(), EngineError> {
        let next = {
            let state = self.state.lock();
            state
                .sessions
                .get(&session_id)
                .and_then(|s| s.steps.iter().find(|step| !step.completed).cloned())
        };
        match next {
            Some(step) if step.requires_approval && step.approved.is_none() => {
                self.commit(Event::ApprovalRequested {
                    id: session_id,
                    step_number: step.step_number,
                })?;
                self.publish_event(
                    session_id,
                    SessionEventKind::WaitingApproval,
                    json!({"step_number": step.step_number}),
                    Some(step.step_number),
                )
                .await
                .map(|_| ())
            }
            Some(step) => self.execute_step(session_id, step.step_number).await,
            None => Ok(()),
        }
    }

    /// Attach operator feedback; completes the session when it is not
    /// already terminal. On terminal sessions only the feedback record is
    /// overwritten.
    pub async fn complete_execution_session(
        &self,
        session_id: SessionId,
        feedback: SessionFeedback,
    ) -> Result<ExecutionSession, EngineError> {
        let session = {
            let state = self.state.lock();
            state
                .sessions
                .get(&session_id)
                .cloned()
                .ok_or_else(|| EngineError::not_found(format!("execution session {session_id}")))?
        };
        let issue_resolved = feedback.issue_resolved;

        self.commit(Event::FeedbackRecorded { id: session_id, feedback })?;

        if session.is_terminal() {
            tracing::debug!(session = %session_id, "terminal session, feedback overwritten");
        } else {
            let now_ms = self.clock.epoch_ms();
            let total_duration_minutes =
                session.started_at_ms.map(|started| now_ms.saturating_sub(started) / 60_000);
            self.transition_session(
                session_id,
                SessionStatus::Completed,
                Some(now_ms),
                total_duration_minutes,
            )
            .await?;
            self.publish_event(
                session_id,
                SessionEventKind::Completed,
                json!({"via": "feedback", "issue_resolved": issue_resolved}),
                None,
            )
            .await?;

            if let Some(ticket_id) = session.ticket_id {
                self.update_ticket_on_execution_complete(
                    ticket_id,
                    ExecutionDisposition::Completed,
                    Some(issue_resolved),
                )
                .await?;
            }
        }

        let state = self.state.lock();
        state
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(format!("execution session {session_id}")))
    }

    /// Abandon a stuck session; the ticket escalates.
    pub async fn abandon_execution_session(
        &self,
        session_id: SessionId,
        reason: Option<&str>,
    ) -> Result<ExecutionSession, EngineError> {
        let session = {
            let state = self.state.lock();
            state
                .sessions
                .get(&session_id)
                .cloned()
                .ok_or_else(|| EngineError::not_found(format!("execution session {session_id}")))?
        };
        if session.is_terminal() {
            return Err(EngineError::conflict(format!(
                "session {session_id} is already terminal ({})",
                session.status
            )));
        }

        self.transition_session(
            session_id,
            SessionStatus::Abandoned,
            Some(self.clock.epoch_ms()),
            None,
        )
        .await?;
        tracing::info!(session = %session_id, reason, "session abandoned");

        if let Some(ticket_id) = session.ticket_id {
            self.update_ticket_on_execution_complete(
                ticket_id,
                ExecutionDisposition::Abandoned,
                Some(false),
            )
            .await?;
        }

        let state = self.state.lock();
        state
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(format!("execution session {session_id}")))
    }

    /// Worker acknowledgement of an assignment.
    pub fn acknowledge_assignment(
        &self,
        session_id: SessionId,
        assignment_id: AssignmentId,
        worker_id: &str,
    ) -> Result<(), EngineError> {
        self.commit(Event::AssignmentStatusChanged {
            session_id,
            assignment_id,
            status: AssignmentStatus::Acknowledged,
            worker_id: Some(worker_id.to_string()),
            acknowledged_at_ms: Some(self.clock.epoch_ms()),
        })?;
        self.metrics.record_assignment("acknowledged");
        Ok(())
    }

    // --- Reference data -------------------------------------------------

    pub fn store_runbook(&self, runbook: RunbookRecord) -> Result<(), EngineError> {
        self.commit(Event::RunbookStored { runbook })
    }

    pub fn store_credential(&self, credential: Credential) -> Result<(), EngineError> {
        self.commit(Event::CredentialStored { credential })
    }

    pub fn store_connection(&self, connection: TicketingConnection) -> Result<(), EngineError> {
        self.commit(Event::ConnectionStored { connection })
    }

    /// Upsert a ticket by `(tenant, source, external_id)` when present,
    /// otherwise insert by id.
    pub fn upsert_ticket(&self, ticket: Ticket) -> Result<Ticket, EngineError> {
        let merged = {
            let state = self.state.lock();
            match ticket.external_key().and_then(|(source, external)| {
                state.ticket_by_external(ticket.tenant_id.as_str(), source, external)
            }) {
                Some(existing) => {
                    let mut merged = ticket.clone();
                    merged.id = existing.id;
                    merged.received_at_ms = existing.received_at_ms;
                    merged
                }
                None => ticket,
            }
        };
        self.commit(Event::TicketUpserted { ticket: merged.clone() })?;
        Ok(merged)
    }

    pub fn get_ticket(&self, id: &str) -> Option<Ticket> {
        self.state.lock().get_ticket(id).cloned()
    }
}

/// Derived idempotency key for manual commands:
/// `SHA-256(session|command|shell|run_as|reason)`.
fn command_idempotency_key(session_id: SessionId, request: &ManualCommandRequest) -> String {
    let raw = [
        session_id.as_str(),
        request.command.as_str(),
        // The effective shell, so explicit "bash" and the default coincide.
        request.shell.as_deref().unwrap_or("bash"),
        request.run_as.as_deref().unwrap_or_default(),
        request.reason.as_deref().unwrap_or_default(),
    ]
    .join("|");

    let mut sha = Sha256::new();
    sha.update(raw.as_bytes());
    let digest = sha.finalize();
    let mut hex = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
