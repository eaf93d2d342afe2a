// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolution verification and ticket-status reconciliation.

use crate::engine::{Engine, EngineError};
use async_trait::async_trait;
use remedy_core::{
    Clock, Event, SessionId, SessionStatus, StepType, TicketId, TicketStatus, TicketingConnection,
};
use serde::Serialize;

/// How an execution ended, for ticket reconciliation. Distinct from the
/// session status: a rejected approval leaves the session `failed` but
/// reconciles the ticket as a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionDisposition {
    Completed,
    Failed,
    Rejected,
    Abandoned,
}

remedy_core::simple_display! {
    ExecutionDisposition {
        Completed => "completed",
        Failed => "failed",
        Rejected => "rejected",
        Abandoned => "abandoned",
    }
}

/// Outcome of resolution verification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationReport {
    pub resolved: bool,
    pub confidence: f64,
    pub reasoning: String,
    pub verification_method: String,
    pub success_rate: f64,
    pub total_steps: usize,
    pub successful_steps: usize,
    pub failed_steps: usize,
}

impl VerificationReport {
    fn skipped(reasoning: &str) -> Self {
        Self {
            resolved: false,
            confidence: 0.0,
            reasoning: reasoning.to_string(),
            verification_method: "none".to_string(),
            success_rate: 0.0,
            total_steps: 0,
            successful_steps: 0,
            failed_steps: 0,
        }
    }
}

/// Push interface to the external ticketing tool.
#[async_trait]
pub trait TicketingClient: Send + Sync {
    /// Push a status (plus comment) to the tool behind `connection` for the
    /// ticket identified by `external_id`.
    async fn update_status(
        &self,
        connection: &TicketingConnection,
        external_id: &str,
        status: TicketStatus,
        comment: &str,
    ) -> Result<(), String>;
}

/// Default client: logs and drops. Used in tests and stream-only deployments.
pub struct NoopTicketingClient;

#[async_trait]
impl TicketingClient for NoopTicketingClient {
    async fn update_status(
        &self,
        connection: &TicketingConnection,
        external_id: &str,
        status: TicketStatus,
        _comment: &str,
    ) -> Result<(), String> {
        tracing::debug!(
            tool = %connection.tool_name,
            external_id,
            status = %status,
            "ticket status push skipped (noop client)"
        );
        Ok(())
    }
}

/// HTTP push client: PATCHes the tool's ticket resource.
pub struct HttpTicketingClient {
    client: reqwest::Client,
}

impl HttpTicketingClient {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

impl Default for HttpTicketingClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TicketingClient for HttpTicketingClient {
    async fn update_status(
        &self,
        connection: &TicketingConnection,
        external_id: &str,
        status: TicketStatus,
        comment: &str,
    ) -> Result<(), String> {
        let url = format!(
            "{}/tickets/{external_id}",
            connection.api_base_url.trim_end_matches('/')
        );
        let body = serde_json::json!({"status": status.to_string(), "comment": comment});
        let response = self
            .client
            .patch(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status().as_u16()));
        }
        Ok(())
    }
}

impl<C: Clock> Engine<C> {
    /// Derive "issue resolved / escalate / manual review" from step outcomes
    /// and reconcile the ticket.
    pub async fn verify_resolution(
        &self,
        session_id: SessionId,
    ) -> Result<VerificationReport, EngineError> {
        let (session, ticket_id) = {
            let state = self.state.lock();
            let session = state
                .sessions
                .get(&session_id)
                .ok_or_else(|| EngineError::not_found(format!("execution session {session_id}")))?
                .clone();
            let ticket_id = session.ticket_id;
            (session, ticket_id)
        };

        let Some(ticket_id) = ticket_id else {
            tracing::warn!(session = %session_id, "no ticket, skipping resolution verification");
            return Ok(VerificationReport::skipped("No ticket associated with execution"));
        };

        if session.status != SessionStatus::Completed {
            return Ok(VerificationReport {
                reasoning: format!("Execution not completed (status: {})", session.status),
                verification_method: "execution_status".to_string(),
                ..VerificationReport::skipped("")
            });
        }
        if session.steps.is_empty() {
            return Ok(VerificationReport {
                verification_method: "step_analysis".to_string(),
                ..VerificationReport::skipped("No execution steps found")
            });
        }

        let total = session.steps.len();
        let successful =
            session.steps.iter().filter(|s| s.completed && s.success == Some(true)).count();
        let failed =
            session.steps.iter().filter(|s| s.completed && s.success == Some(false)).count();
        let success_rate = successful as f64 / total as f64;

        let postchecks: Vec<_> =
            session.steps.iter().filter(|s| s.step_type == StepType::Postcheck).collect();
        let postchecks_passed = postchecks
            .iter()
            .filter(|s| s.completed)
            .all(|s| s.success == Some(true));

        let (resolved, confidence, reasoning) = if success_rate >= 1.0
            && (postchecks.is_empty() || postchecks_passed)
        {
            (true, 0.9, "All execution steps completed successfully".to_string())
        } else if success_rate >= 0.8 {
            (true, 0.7, format!("Most steps succeeded ({successful}/{total})"))
        } else if success_rate >= 0.5 {
            (false, 0.5, format!("Mixed results ({successful}/{total} steps succeeded)"))
        } else {
            (false, 0.9, format!("Most steps failed ({failed}/{total} steps failed)"))
        };

        let issue_resolved = if resolved {
            Some(true)
        } else if confidence < 0.7 {
            // Uncertain: leave for manual review.
            None
        } else {
            Some(false)
        };
        self.update_ticket_on_execution_complete(
            ticket_id,
            ExecutionDisposition::Completed,
            issue_resolved,
        )
        .await?;

        Ok(VerificationReport {
            resolved,
            confidence,
            reasoning,
            verification_method: "step_analysis".to_string(),
            success_rate,
            total_steps: total,
            successful_steps: successful,
            failed_steps: failed,
        })
    }

    /// Ticket → `in_progress` when execution starts (unless already closed).
    pub(crate) async fn update_ticket_on_execution_start(
        &self,
        ticket_id: TicketId,
    ) -> Result<(), EngineError> {
        let status = {
            let state = self.state.lock();
            state.tickets.get(&ticket_id).map(|t| t.status)
        };
        match status {
            Some(TicketStatus::Closed) | None => Ok(()),
            Some(_) => self.set_ticket_status(ticket_id, TicketStatus::InProgress, false).await,
        }
    }

    /// Reconcile the ticket after an execution reaches a disposition.
    pub(crate) async fn update_ticket_on_execution_complete(
        &self,
        ticket_id: TicketId,
        disposition: ExecutionDisposition,
        issue_resolved: Option<bool>,
    ) -> Result<(), EngineError> {
        let new_status = match disposition {
            ExecutionDisposition::Completed => match issue_resolved {
                Some(true) => TicketStatus::Resolved,
                Some(false) => TicketStatus::Escalated,
                // Resolution unknown: manual review.
                None => TicketStatus::InProgress,
            },
            ExecutionDisposition::Failed => TicketStatus::Escalated,
            ExecutionDisposition::Rejected => TicketStatus::InProgress,
            ExecutionDisposition::Abandoned => TicketStatus::Escalated,
        };
        let resolved = new_status == TicketStatus::Resolved;
        self.set_ticket_status(ticket_id, new_status, resolved).await
    }

    /// Ticket → `closed` for false-positive classifications.
    pub async fn update_ticket_on_false_positive(
        &self,
        ticket_id: TicketId,
    ) -> Result<(), EngineError> {
        self.set_ticket_status(ticket_id, TicketStatus::Closed, true).await
    }

    async fn set_ticket_status(
        &self,
        ticket_id: TicketId,
        status: TicketStatus,
        resolved: bool,
    ) -> Result<(), EngineError> {
        let ticket = {
            let state = self.state.lock();
            state.tickets.get(&ticket_id).cloned()
        };
        let Some(ticket) = ticket else {
            tracing::warn!(ticket = %ticket_id, "ticket not found for status update");
            return Ok(());
        };

        let now_ms = self.clock.epoch_ms();
        self.commit(Event::TicketStatusChanged {
            id: ticket_id,
            status,
            updated_at_ms: now_ms,
            resolved_at_ms: resolved.then_some(now_ms),
        })?;
        tracing::info!(ticket = %ticket_id, status = %status, "ticket status updated");

        self.push_ticket_status(&ticket, status).await;
        Ok(())
    }

    /// Push the new status back to the external ticketing tool, when the
    /// ticket originated from one. Best-effort.
    async fn push_ticket_status(&self, ticket: &remedy_core::Ticket, status: TicketStatus) {
        let Some((source, external_id)) = ticket.external_key() else { return };
        let connection = {
            let state = self.state.lock();
            state
                .connections
                .values()
                .find(|c| {
                    c.tenant_id == ticket.tenant_id && c.active && c.tool_name == source
                })
                .cloned()
        };
        let Some(connection) = connection else { return };

        let comment = format!("Remedy execution update: ticket status changed to {status}");
        if let Err(error) = self
            .ticketing
            .update_status(&connection, external_id, status, &comment)
            .await
        {
            tracing::warn!(
                tool = %connection.tool_name,
                external_id,
                %error,
                "failed to push ticket status"
            );
        }
    }
}

#[cfg(test)]
#[path = "verify_tests.rs"]
mod tests;
