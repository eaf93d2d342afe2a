// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Approval gates: record decisions, resume or fail the session.

use crate::engine::{Engine, EngineError};
use crate::verify::ExecutionDisposition;
use remedy_core::{Clock, Event, SessionEventKind, SessionId, SessionStatus};

impl<C: Clock> Engine<C> {
    /// Approve or reject a gated step.
    ///
    /// On approve, the step executes and the session chains forward exactly
    /// like normal post-success flow. On reject, the session fails without
    /// ever publishing the command.
    pub async fn approve_step(
        &self,
        session_id: SessionId,
        step_number: u32,
        user_id: Option<&str>,
        approve: bool,
    ) -> Result<(), EngineError> {
        let step = {
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
            session
                .step(step_number)
                .cloned()
                .ok_or_else(|| EngineError::not_found(format!("step {step_number}")))?
        };

        if !step.requires_approval {
            return Err(EngineError::conflict(format!(
                "step {step_number} does not require approval"
            )));
        }
        if step.approved.is_some() {
            return Err(EngineError::conflict(format!(
                "step {step_number} already approved/rejected"
            )));
        }

        self.commit(Event::ApprovalRecorded {
            id: session_id,
            step_number,
            approved: approve,
            approved_by: user_id.map(str::to_string),
            approved_at_ms: self.clock.epoch_ms(),
        })?;

        if !approve {
            tracing::info!(session = %session_id, step = step_number, "step rejected");
            self.commit(Event::ApprovalCleared { id: session_id })?;
            self.publish_event(
                session_id,
                SessionEventKind::Rejected,
                serde_json::json!({"step_number": step_number, "rejected_by": user_id}),
                Some(step_number),
            )
            .await?;
            self.transition_session(
                session_id,
                SessionStatus::Failed,
                Some(self.clock.epoch_ms()),
                None,
            )
            .await?;

            if let Some(ticket_id) = self.session_ticket(session_id) {
                self.update_ticket_on_execution_complete(
                    ticket_id,
                    ExecutionDisposition::Rejected,
                    Some(false),
                )
                .await?;
            }
            return Ok(());
        }

        tracing::info!(session = %session_id, step = step_number, "step approved, executing");
        self.commit(Event::ApprovalCleared { id: session_id })?;
        self.metrics.record_state_transition("waiting_approval", "in_progress");
        self.publish_event(
            session_id,
            SessionEventKind::Approved,
            serde_json::json!({"step_number": step_number, "approved_by": user_id}),
            Some(step_number),
        )
        .await?;

        self.execute_step(session_id, step_number).await
    }
}

#[cfg(test)]
#[path = "approval_tests.rs"]
mod tests;
