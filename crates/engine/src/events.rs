// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution-event readback for the REST surface.

use crate::engine::{Engine, EngineError};
use remedy_core::{Clock, SessionEventKind, SessionId};
use serde::Serialize;
use serde_json::Value;

/// Serialized execution event with the envelope unwrapped: `payload` is the
/// inner application payload, `timestamp` the envelope timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventView {
    pub id: u64,
    pub session_id: SessionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_number: Option<u32>,
    pub event: SessionEventKind,
    pub payload: Value,
    pub stream_id: String,
    pub created_at: String,
    pub timestamp: String,
}

impl<C: Clock> Engine<C> {
    /// Events for a session with `id > since_id`, ascending, up to `limit`.
    pub fn list_session_events(
        &self,
        session_id: SessionId,
        since_id: Option<u64>,
        limit: usize,
    ) -> Result<Vec<EventView>, EngineError> {
        let state = self.state.lock();
        if !state.sessions.contains_key(&session_id) {
            return Err(EngineError::not_found(format!("execution session {session_id}")));
        }

        let since = since_id.unwrap_or(0);
        let views = state
            .events
            .get(&session_id)
            .map(|events| {
                events
                    .iter()
                    .filter(|event| event.id > since)
                    .take(limit)
                    .map(|event| EventView {
                        id: event.id,
                        session_id: event.session_id,
                        step_number: event.step_number.or(event.envelope.step_number),
                        event: event.kind,
                        payload: event.envelope.payload.clone(),
                        stream_id: event.stream_id.clone(),
                        created_at: remedy_core::iso8601_utc(event.created_at_ms),
                        timestamp: event.envelope.timestamp.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(views)
    }

    /// Find the persisted `session.command.requested` row whose payload
    /// carries the given command stream id. Used for idempotent replays of
    /// manual command submissions.
    pub(crate) fn command_event_by_stream_id(
        &self,
        session_id: SessionId,
        command_stream_id: &str,
    ) -> Option<EventView> {
        let state = self.state.lock();
        state.events.get(&session_id).and_then(|events| {
            events
                .iter()
                .find(|event| {
                    event.kind == SessionEventKind::CommandRequested
                        && event.envelope.payload.get("stream_id").and_then(|v| v.as_str())
                            == Some(command_stream_id)
                })
                .map(|event| EventView {
                    id: event.id,
                    session_id: event.session_id,
                    step_number: event.step_number.or(event.envelope.step_number),
                    event: event.kind,
                    payload: event.envelope.payload.clone(),
                    stream_id: command_stream_id.to_string(),
                    created_at: remedy_core::iso8601_utc(event.created_at_ms),
                    timestamp: event.envelope.timestamp.clone(),
                })
        })
    }
}
