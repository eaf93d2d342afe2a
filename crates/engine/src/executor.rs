// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step executor: runs the linear plan, one step at a time.

use crate::engine::{Engine, EngineError, STEP_TIMEOUT};
use crate::verify::ExecutionDisposition;
use remedy_connectors::{detect_failure_type, ConnectionConfig, ConnectorKind, ExecOutcome};
use remedy_core::{
    redact_secrets, Clock, CredentialId, Event, SessionEventKind, SessionId, SessionStatus,
};
use std::str::FromStr;

impl<C: Clock> Engine<C> {
    /// Start a pending session: run step 1, or wait on its approval gate.
    pub async fn start_execution(&self, session_id: SessionId) -> Result<(), EngineError> {
        let (status, first) = {
            let state = self.state.lock();
            let session = state
                .sessions
                .get(&session_id)
                .ok_or_else(|| EngineError::not_found(format!("execution session {session_id}")))?;
            (session.status, session.step(1).cloned())
        };

        if status != SessionStatus::Pending {
            return Err(EngineError::conflict(format!(
                "session {session_id} is not in pending status (status: {status})"
            )));
        }
        let Some(first) = first else {
            self.transition_session(session_id, SessionStatus::Failed, Some(self.clock.epoch_ms()), None)
                .await?;
            return Err(EngineError::validation(format!("session {session_id} has no steps")));
        };

        if let Some(ticket_id) = self.session_ticket(session_id) {
            self.update_ticket_on_execution_start(ticket_id).await?;
        }

        if first.requires_approval {
            self.commit(Event::ApprovalRequested { id: session_id, step_number: 1 })?;
            self.metrics.record_state_transition("pending", "waiting_approval");
            self.publish_event(
                session_id,
                SessionEventKind::WaitingApproval,
                serde_json::json!({"step_number": 1}),
                Some(1),
            )
            .await?;
            return Ok(());
        }

        self.commit(Event::CurrentStepSet { id: session_id, step_number: 1 })?;
        self.execute_step(session_id, 1).await
    }

    /// Execute a step and chain forward until an approval gate, a failure,
    /// or the end of the plan.
    pub async fn execute_step(
        &self,
        session_id: SessionId,
        step_number: u32,
    ) -> Result<(), EngineError> {
        let mut current = step_number;
        loop {
            let proceed = self.execute_single_step(session_id, current).await?;
            match proceed {
                StepFlow::Continue(next) => current = next,
                StepFlow::Stop => return Ok(()),
            }
        }
    }

    /// Run one step; decide how the session proceeds.
    async fn execute_single_step(
        &self,
        session_id: SessionId,
        step_number: u32,
    ) -> Result<StepFlow, EngineError> {
        let (session, step) = {
            let state = self.state.lock();
            let session = state
                .sessions
                .get(&session_id)
                .ok_or_else(|| EngineError::not_found(format!("execution session {session_id}")))?
                .clone();
            let step = session
                .step(step_number)
                .cloned()
                .ok_or_else(|| EngineError::not_found(format!("step {step_number}")))?;
            (session, step)
        };

        if session.is_terminal() {
            return Err(EngineError::conflict(format!(
                "session {session_id} is terminal ({})",
                session.status
            )));
        }
        if step.completed {
            return Err(EngineError::conflict(format!("step {step_number} already completed")));
        }

        tracing::info!(
            session = %session_id,
            step = step_number,
            step_type = %step.step_type,
            "executing step"
        );

        if session.started_at_ms.is_none() {
            self.commit(Event::SessionStarted {
                id: session_id,
                started_at_ms: self.clock.epoch_ms(),
            })?;
            if session.status == SessionStatus::Pending {
                self.metrics.record_state_transition("pending", "in_progress");
            }
        }
        self.commit(Event::CurrentStepSet { id: session_id, step_number })?;

        let config = self.resolve_connection_config(&session).await;
        let connector = config.connector_type.clone();
        let started = std::time::Instant::now();

        let outcome = match self.connectors.execute(&step.command, &config, STEP_TIMEOUT).await {
            Ok(outcome) => outcome,
            // Unknown connector types fail the step rather than wedging the
            // session.
            Err(error) => ExecOutcome::failure(error.to_string(), -1),
        };

        self.metrics.observe_step_duration(
            &connector_label(&connector),
            started.elapsed().as_secs_f64(),
        );

        let credentials_used: Vec<CredentialId> = config
            .credential_id
            .as_deref()
            .map(|id| vec![CredentialId::from_string(id)])
            .unwrap_or_default();

        let output = redact_secrets(&outcome.output);
        let error = redact_secrets(&outcome.error);
        self.commit(Event::StepCompleted {
            id: session_id,
            step_number,
            success: outcome.success,
            output: (!output.is_empty()).then_some(output.clone()),
            error: (!error.is_empty()).then_some(error.clone()),
            notes: None,
            credentials_used,
            completed_at_ms: self.clock.epoch_ms(),
        })?;

        let mut payload = serde_json::json!({
            "step_number": step_number,
            "step_type": step.step_type.to_string(),
            "success": outcome.success,
            "exit_code": outcome.exit_code,
            "connector": connector_label(&connector),
            "output": output.clone(),
            "error": error.clone(),
        });
        if outcome.simulated {
            payload["simulated"] = serde_json::Value::Bool(true);
        }
        if !outcome.success {
            payload["failure_type"] = serde_json::Value::String(
                detect_failure_type(&outcome).to_string(),
            );
        }
        self.publish_event(session_id, SessionEventKind::StepCompleted, payload, Some(step_number))
            .await?;

        if !outcome.success {
            self.fail_session(session_id, &error, &config).await?;
            return Ok(StepFlow::Stop);
        }

        // Step succeeded: look at the next not-completed step.
        let next = {
            let state = self.state.lock();
            state
                .sessions
                .get(&session_id)
                .and_then(|session| session.next_pending_step(step_number).cloned())
        };
        match next {
            Some(next) if next.requires_approval => {
                self.commit(Event::ApprovalRequested {
                    id: session_id,
                    step_number: next.step_number,
                })?;
                self.metrics.record_state_transition("in_progress", "waiting_approval");
                self.publish_event(
                    session_id,
                    SessionEventKind::WaitingApproval,
                    serde_json::json!({"step_number": next.step_number}),
                    Some(next.step_number),
                )
                .await?;
                Ok(StepFlow::Stop)
            }
            Some(next) => {
                self.commit(Event::CurrentStepSet {
                    id: session_id,
                    step_number: next.step_number,
                })?;
                Ok(StepFlow::Continue(next.step_number))
            }
            None => {
                self.complete_run(session_id).await?;
                Ok(StepFlow::Stop)
            }
        }
    }

    /// Mark the session failed, roll back, and reconcile the ticket.
    pub(crate) async fn fail_session(
        &self,
        session_id: SessionId,
        error: &str,
        config: &ConnectionConfig,
    ) -> Result<(), EngineError> {
        self.transition_session(
            session_id,
            SessionStatus::Failed,
            Some(self.clock.epoch_ms()),
            None,
        )
        .await?;
        self.publish_event(
            session_id,
            SessionEventKind::Failed,
            serde_json::json!({"error": error}),
            None,
        )
        .await?;

        self.rollback_execution(session_id, Some(config.clone())).await?;

        if let Some(ticket_id) = self.session_ticket(session_id) {
            self.update_ticket_on_execution_complete(
                ticket_id,
                ExecutionDisposition::Failed,
                Some(false),
            )
            .await?;
        }
        Ok(())
    }

    /// All steps done: terminal completion, duration accounting, resolution
    /// verification.
    async fn complete_run(&self, session_id: SessionId) -> Result<(), EngineError> {
        let now_ms = self.clock.epoch_ms();
        let started_at_ms = {
            let state = self.state.lock();
            state.sessions.get(&session_id).and_then(|s| s.started_at_ms)
        };
        let total_duration_minutes =
            started_at_ms.map(|started| now_ms.saturating_sub(started) / 60_000);

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
            serde_json::json!({"total_duration_minutes": total_duration_minutes}),
            None,
        )
        .await?;

        let report = self.verify_resolution(session_id).await?;
        tracing::info!(
            session = %session_id,
            resolved = report.resolved,
            confidence = report.confidence,
            "resolution verification finished"
        );
        Ok(())
    }

    pub(crate) fn session_ticket(&self, session_id: SessionId) -> Option<remedy_core::TicketId> {
        let state = self.state.lock();
        state.sessions.get(&session_id).and_then(|s| s.ticket_id)
    }
}

enum StepFlow {
    /// Run the given next step.
    Continue(u32),
    /// Approval gate, failure, or plan end.
    Stop,
}

/// Canonical connector label for metrics (unknown types keep their name).
fn connector_label(connector_type: &str) -> String {
    ConnectorKind::from_str(connector_type)
        .map(|kind| kind.to_string())
        .unwrap_or_else(|_| connector_type.to_string())
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
