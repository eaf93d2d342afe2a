// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine: shared dependencies, the commit path, and the event publisher.

use crate::connection::CloudDiscovery;
use crate::registry::WorkerRegistry;
use crate::verify::{NoopTicketingClient, TicketingClient};
use parking_lot::Mutex;
use remedy_bus::{BusError, IdempotencyStore, StreamBus, StreamConfig};
use remedy_connectors::{ConnectorError, Connectors};
use remedy_core::{
    iso8601_utc, sanitize_value, Clock, CoreError, Event, EventEnvelope, ExecutionEvent, Metrics,
    SessionEventKind, SessionId, SessionStatus,
};
use remedy_storage::{AuditSink, MaterializedState, Wal, WalError};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Fixed per-step connector timeout.
pub(crate) const STEP_TIMEOUT: Duration = Duration::from_secs(30);
/// Fixed timeout for each rollback command.
pub(crate) const ROLLBACK_TIMEOUT: Duration = Duration::from_secs(30);

/// Engine failures, mapped by outer surfaces onto the shared taxonomy.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("stream bus unavailable: {0}")]
    Bus(#[from] BusError),

    #[error("wal error: {0}")]
    Wal(#[from] WalError),

    #[error(transparent)]
    Connector(#[from] ConnectorError),
}

impl EngineError {
    pub fn not_found(what: impl Into<String>) -> Self {
        EngineError::Core(CoreError::NotFound(what.into()))
    }

    pub fn conflict(what: impl Into<String>) -> Self {
        EngineError::Core(CoreError::Conflict(what.into()))
    }

    pub fn validation(what: impl Into<String>) -> Self {
        EngineError::Core(CoreError::Validation(what.into()))
    }
}

/// Shared dependencies handed to the engine at construction.
pub struct EngineDeps<C: Clock> {
    pub state: Arc<Mutex<MaterializedState>>,
    pub wal: Arc<Mutex<Wal>>,
    pub bus: Arc<dyn StreamBus>,
    pub idempotency: Arc<dyn IdempotencyStore>,
    pub audit: Arc<AuditSink<C>>,
    pub metrics: Arc<Metrics>,
    pub streams: StreamConfig,
    pub clock: C,
}

/// Execution orchestration engine.
pub struct Engine<C: Clock> {
    pub(crate) state: Arc<Mutex<MaterializedState>>,
    pub(crate) wal: Arc<Mutex<Wal>>,
    pub(crate) bus: Arc<dyn StreamBus>,
    pub(crate) idempotency: Arc<dyn IdempotencyStore>,
    pub(crate) audit: Arc<AuditSink<C>>,
    pub(crate) metrics: Arc<Metrics>,
    pub(crate) streams: StreamConfig,
    pub(crate) clock: C,
    pub(crate) connectors: Connectors,
    pub(crate) registry: WorkerRegistry<C>,
    pub(crate) ticketing: Arc<dyn TicketingClient>,
    pub(crate) discovery: Option<Arc<dyn CloudDiscovery>>,
}

impl<C: Clock> Engine<C> {
    pub fn new(deps: EngineDeps<C>) -> Self {
        let registry = WorkerRegistry::new(Duration::from_secs(60), deps.clock.clone());
        let connectors = Connectors::with_metrics(Arc::clone(&deps.metrics));
        Self {
            state: deps.state,
            wal: deps.wal,
            bus: deps.bus,
            idempotency: deps.idempotency,
            audit: deps.audit,
            metrics: deps.metrics,
            streams: deps.streams,
            clock: deps.clock,
            connectors,
            registry,
            ticketing: Arc::new(NoopTicketingClient),
            discovery: None,
        }
    }

    /// Swap in the external ticketing push client.
    pub fn with_ticketing_client(mut self, client: Arc<dyn TicketingClient>) -> Self {
        self.ticketing = client;
        self
    }

    /// Attach a cloud discovery collaborator for connection resolution.
    pub fn with_cloud_discovery(mut self, discovery: Arc<dyn CloudDiscovery>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    pub fn state(&self) -> Arc<Mutex<MaterializedState>> {
        Arc::clone(&self.state)
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    pub fn registry(&self) -> &WorkerRegistry<C> {
        &self.registry
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn streams(&self) -> &StreamConfig {
        &self.streams
    }

    /// Create the orchestrator consumer group on the result and dead-letter
    /// streams. Idempotent; called once at process start.
    pub async fn bootstrap_groups(&self) -> Result<(), EngineError> {
        for stream in [&self.streams.result, &self.streams.dead_letter] {
            self.bus.ensure_group(stream, &self.streams.orchestrator_group).await?;
        }
        Ok(())
    }

    /// Apply a state event and append it durably to the WAL.
    pub(crate) fn commit(&self, event: Event) -> Result<(), EngineError> {
        {
            let mut state = self.state.lock();
            state.apply_event(&event);
        }
        let mut wal = self.wal.lock();
        wal.append(&event)?;
        wal.flush()?;
        Ok(())
    }

    /// Record a session status change, emitting the transition metric and a
    /// `session.state.transition` event.
    pub(crate) async fn transition_session(
        &self,
        session_id: SessionId,
        to: SessionStatus,
        completed_at_ms: Option<u64>,
        total_duration_minutes: Option<u64>,
    ) -> Result<(), EngineError> {
        let from = {
            let state = self.state.lock();
            state.sessions.get(&session_id).map(|s| s.status)
        };
        let Some(from) = from else {
            return Err(EngineError::not_found(format!("execution session {session_id}")));
        };
        if from == to {
            return Ok(());
        }

        self.commit(Event::SessionStatusChanged {
            id: session_id,
            status: to,
            completed_at_ms,
            total_duration_minutes,
        })?;
        self.metrics.record_state_transition(&from.to_string(), &to.to_string());
        self.publish_event(
            session_id,
            SessionEventKind::StateTransition,
            serde_json::json!({"from": from.to_string(), "to": to.to_string()}),
            None,
        )
        .await?;
        Ok(())
    }

    /// Persist an execution event and fan it out on the events stream.
    ///
    /// The payload is sanitized before it leaves the engine; the audit
    /// append is best-effort.
    pub(crate) async fn publish_event(
        &self,
        session_id: SessionId,
        kind: SessionEventKind,
        payload: Value,
        step_number: Option<u32>,
    ) -> Result<String, EngineError> {
        let sanitized = sanitize_value(&payload);
        let now_ms = self.clock.epoch_ms();
        let envelope = EventEnvelope {
            event: kind,
            session_id,
            step_number,
            payload: sanitized,
            timestamp: iso8601_utc(now_ms),
        };

        let event_id = {
            let state = self.state.lock();
            state.next_event_id(&session_id)
        };

        let stream_id = if self.streams.orchestration_enabled {
            let envelope_value = serde_json::to_value(&envelope)
                .map_err(|e| EngineError::validation(e.to_string()))?;
            self.bus
                .publish(
                    &self.streams.events,
                    &envelope_value,
                    Some(self.streams.default_maxlen),
                    true,
                )
                .await?
                .to_string()
        } else {
            // Stream publishing disabled: synthesize a per-session id so the
            // at-most-once invariant still holds.
            format!("0-{event_id}")
        };

        let event = ExecutionEvent {
            id: event_id,
            session_id,
            step_number,
            kind,
            envelope: envelope.clone(),
            stream_id: stream_id.clone(),
            created_at_ms: now_ms,
        };
        self.commit(Event::EventRecorded { event })?;

        if let Err(error) = self
            .audit
            .record_event(
                session_id,
                &kind.to_string(),
                &serde_json::to_value(&envelope).unwrap_or(Value::Null),
            )
            .await
        {
            tracing::warn!(session = %session_id, %error, "audit append failed");
        }

        Ok(stream_id)
    }
}
