// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Abstract contract over a persistent, ordered, append-only log with
//! consumer-group semantics, and an in-process implementation.
//!
//! Five logical streams are used by the orchestrator: `session.assign`,
//! `session.command`, `session.result`, `session.events`,
//! `session.deadletter`. Entries carry one JSON payload each; a `StreamId`
//! is a totally ordered per-stream position. Transport errors are surfaced
//! to the caller; the bus never silently drops.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;

/// Errors surfaced by the stream bus.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("stream transport error: {0}")]
    Transport(String),

    #[error("consumer group {group} does not exist on stream {stream}")]
    UnknownGroup { stream: String, group: String },

    #[error("malformed stream id: {0}")]
    MalformedId(String),
}

/// Totally ordered per-stream entry identifier, `{epoch_ms}-{seq}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StreamId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamId {
    pub const ZERO: StreamId = StreamId { ms: 0, seq: 0 };

    pub fn new(ms: u64, seq: u64) -> Self {
        Self { ms, seq }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

impl FromStr for StreamId {
    type Err = BusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ms, seq) = s.split_once('-').ok_or_else(|| BusError::MalformedId(s.to_string()))?;
        let ms = ms.parse().map_err(|_| BusError::MalformedId(s.to_string()))?;
        let seq = seq.parse().map_err(|_| BusError::MalformedId(s.to_string()))?;
        Ok(Self { ms, seq })
    }
}

/// One delivered stream entry.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEntry {
    pub id: StreamId,
    pub payload: Value,
}

/// Append-only ordered log with consumer groups.
#[async_trait]
pub trait StreamBus: Send + Sync {
    /// Append a payload; trims the stream to roughly `maxlen` entries when
    /// given (`approximate` permits lazy trimming).
    async fn publish(
        &self,
        stream: &str,
        payload: &Value,
        maxlen: Option<usize>,
        approximate: bool,
    ) -> Result<StreamId, BusError>;

    /// Read entries strictly after `cursor`, oldest first. With `block`,
    /// waits up to that long for new entries before returning empty.
    async fn read(
        &self,
        stream: &str,
        cursor: StreamId,
        count: usize,
        block: Option<Duration>,
    ) -> Result<Vec<StreamEntry>, BusError>;

    /// Create a consumer group if it does not already exist. Idempotent.
    async fn ensure_group(&self, stream: &str, group: &str) -> Result<(), BusError>;

    /// Deliver entries not yet seen by the group, recording them as pending
    /// for `consumer` until acknowledged.
    async fn read_group(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        count: usize,
        block: Option<Duration>,
    ) -> Result<Vec<StreamEntry>, BusError>;

    /// Acknowledge delivered entries for a group. Returns how many were
    /// still pending.
    async fn ack(&self, stream: &str, group: &str, ids: &[StreamId]) -> Result<usize, BusError>;

    /// Delete entries from the stream. Returns how many existed.
    async fn delete(&self, stream: &str, ids: &[StreamId]) -> Result<usize, BusError>;
}

#[derive(Default)]
struct GroupState {
    /// Highest id handed to any consumer in this group.
    delivered: StreamId,
    /// Delivered-but-unacknowledged ids → consumer name.
    pending: HashMap<StreamId, String>,
}

#[derive(Default)]
struct StreamState {
    entries: VecDeque<StreamEntry>,
    last_id: StreamId,
    groups: HashMap<String, GroupState>,
}

impl StreamState {
    fn next_id(&mut self, now_ms: u64) -> StreamId {
        let id = if now_ms > self.last_id.ms {
            StreamId::new(now_ms, 0)
        } else {
            StreamId::new(self.last_id.ms, self.last_id.seq + 1)
        };
        self.last_id = id;
        id
    }
}

/// In-process stream bus.
///
/// Single-node stand-in for a Redis-Streams deployment: same operation set,
/// same ordering and consumer-group semantics, no network hop. Cheap to
/// clone; clones share the underlying streams.
#[derive(Clone, Default)]
pub struct MemoryBus {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    streams: Mutex<HashMap<String, StreamState>>,
    notify: Notify,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn now_ms() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    /// Total entries currently retained on a stream.
    pub fn len(&self, stream: &str) -> usize {
        self.inner.streams.lock().get(stream).map_or(0, |s| s.entries.len())
    }

    pub fn is_empty(&self, stream: &str) -> bool {
        self.len(stream) == 0
    }
}

#[async_trait]
impl StreamBus for MemoryBus {
    async fn publish(
        &self,
        stream: &str,
        payload: &Value,
        maxlen: Option<usize>,
        _approximate: bool,
    ) -> Result<StreamId, BusError> {
        let id = {
            let mut streams = self.inner.streams.lock();
            let state = streams.entry(stream.to_string()).or_default();
            let id = state.next_id(Self::now_ms());
            state.entries.push_back(StreamEntry { id, payload: payload.clone() });
            if let Some(maxlen) = maxlen {
                while state.entries.len() > maxlen {
                    state.entries.pop_front();
                }
            }
            id
        };
        self.inner.notify.notify_waiters();
        Ok(id)
    }

    async fn read(
        &self,
        stream: &str,
        cursor: StreamId,
        count: usize,
        block: Option<Duration>,
    ) -> Result<Vec<StreamEntry>, BusError> {
        let deadline = block.map(|d| tokio::time::Instant::now() + d);
        loop {
            let entries: Vec<StreamEntry> = {
                let streams = self.inner.streams.lock();
                streams.get(stream).map_or_else(Vec::new, |state| {
                    state
                        .entries
                        .iter()
                        .filter(|e| e.id > cursor)
                        .take(count)
                        .cloned()
                        .collect()
                })
            };
            if !entries.is_empty() {
                return Ok(entries);
            }
            let Some(deadline) = deadline else { return Ok(entries) };
            let notified = self.inner.notify.notified();
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(Vec::new());
            }
        }
    }

    async fn ensure_group(&self, stream: &str, group: &str) -> Result<(), BusError> {
        let mut streams = self.inner.streams.lock();
        let state = streams.entry(stream.to_string()).or_default();
        state.groups.entry(group.to_string()).or_default();
        Ok(())
    }

    async fn read_group(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        count: usize,
        block: Option<Duration>,
    ) -> Result<Vec<StreamEntry>, BusError> {
        let deadline = block.map(|d| tokio::time::Instant::now() + d);
        loop {
            let entries = {
                let mut streams = self.inner.streams.lock();
                let state = streams.get_mut(stream).ok_or_else(|| BusError::UnknownGroup {
                    stream: stream.to_string(),
                    group: group.to_string(),
                })?;
                // Collect undelivered entries first to satisfy the borrow
                // checker, then record them as pending.
                let group_state =
                    state.groups.get(group).ok_or_else(|| BusError::UnknownGroup {
                        stream: stream.to_string(),
                        group: group.to_string(),
                    })?;
                let fresh: Vec<StreamEntry> = state
                    .entries
                    .iter()
                    .filter(|e| e.id > group_state.delivered)
                    .take(count)
                    .cloned()
                    .collect();
                if let Some(group_state) = state.groups.get_mut(group) {
                    for entry in &fresh {
                        group_state.delivered = entry.id;
                        group_state.pending.insert(entry.id, consumer.to_string());
                    }
                }
                fresh
            };
            if !entries.is_empty() {
                return Ok(entries);
            }
            let Some(deadline) = deadline else { return Ok(entries) };
            let notified = self.inner.notify.notified();
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(Vec::new());
            }
        }
    }

    async fn ack(&self, stream: &str, group: &str, ids: &[StreamId]) -> Result<usize, BusError> {
        let mut streams = self.inner.streams.lock();
        let state = streams.get_mut(stream).ok_or_else(|| BusError::UnknownGroup {
            stream: stream.to_string(),
            group: group.to_string(),
        })?;
        let group_state = state.groups.get_mut(group).ok_or_else(|| BusError::UnknownGroup {
            stream: stream.to_string(),
            group: group.to_string(),
        })?;
        let mut acked = 0;
        for id in ids {
            if group_state.pending.remove(id).is_some() {
                acked += 1;
            }
        }
        Ok(acked)
    }

    async fn delete(&self, stream: &str, ids: &[StreamId]) -> Result<usize, BusError> {
        let mut streams = self.inner.streams.lock();
        let Some(state) = streams.get_mut(stream) else { return Ok(0) };
        let before = state.entries.len();
        state.entries.retain(|e| !ids.contains(&e.id));
        Ok(before - state.entries.len())
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
