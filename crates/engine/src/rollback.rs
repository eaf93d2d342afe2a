// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rollback engine: undo completed steps in reverse order.

use crate::engine::{Engine, EngineError, ROLLBACK_TIMEOUT};
use remedy_connectors::ConnectionConfig;
use remedy_core::{Clock, SessionEventKind, SessionId};

impl<C: Clock> Engine<C> {
    /// Re-execute the rollback command of every completed successful step,
    /// descending by step number. Individual rollback failures are logged
    /// and do not abort the sweep; the session status is left untouched.
    pub(crate) async fn rollback_execution(
        &self,
        session_id: SessionId,
        config: Option<ConnectionConfig>,
    ) -> Result<(), EngineError> {
        let (session, mut steps) = {
            let state = self.state.lock();
            let Some(session) = state.sessions.get(&session_id).cloned() else {
                return Err(EngineError::not_found(format!("execution session {session_id}")));
            };
            let steps: Vec<_> = session
                .steps
                .iter()
                .filter(|step| step.completed && step.success == Some(true))
                .cloned()
                .collect();
            (session, steps)
        };
        steps.sort_by(|a, b| b.step_number.cmp(&a.step_number));

        if steps.is_empty() {
            tracing::info!(session = %session_id, "no completed steps to roll back");
            return Ok(());
        }

        self.publish_event(
            session_id,
            SessionEventKind::RollbackStarted,
            serde_json::json!({"steps": steps.iter().map(|s| s.step_number).collect::<Vec<_>>()}),
            None,
        )
        .await?;

        // Same connection configuration the execution used.
        let config = match config {
            Some(config) => config,
            None => self.resolve_connection_config(&session).await,
        };

        let mut rolled_back = Vec::new();
        let mut failures = Vec::new();
        for step in &steps {
            let Some(rollback_command) = step.rollback() else {
                tracing::warn!(
                    session = %session_id,
                    step = step.step_number,
                    "step has no rollback command, skipping"
                );
                continue;
            };

            tracing::info!(session = %session_id, step = step.step_number, "rolling back step");
            match self.connectors.execute(rollback_command, &config, ROLLBACK_TIMEOUT).await {
                Ok(outcome) if outcome.success => rolled_back.push(step.step_number),
                Ok(outcome) => {
                    tracing::error!(
                        session = %session_id,
                        step = step.step_number,
                        error = %outcome.error,
                        "rollback failed"
                    );
                    failures.push(step.step_number);
                }
                Err(error) => {
                    tracing::error!(
                        session = %session_id,
                        step = step.step_number,
                        %error,
                        "rollback dispatch failed"
                    );
                    failures.push(step.step_number);
                }
            }
        }

        self.publish_event(
            session_id,
            SessionEventKind::RollbackCompleted,
            serde_json::json!({"rolled_back": rolled_back, "failed": failures}),
            None,
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "rollback_tests.rs"]
mod tests;
