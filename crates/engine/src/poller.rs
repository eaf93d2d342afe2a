// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ticket poller: periodic pull from external ticketing APIs.
//!
//! Runs a single background loop that ticks every second so shutdown stays
//! responsive; each `api_poll` connection syncs on its own interval.
//! Fetchers may refresh OAuth tokens mid-call by mutating the connection
//! metadata in place. Refreshed tokens are persisted even when the fetch or
//! upsert subsequently fails; a freshly minted refresh must never be lost.

use crate::engine::{Engine, EngineError};
use async_trait::async_trait;
use remedy_core::ticket::{ConnectionId, SyncStatus};
use remedy_core::{Clock, Event, Ticket, TicketId, TicketStatus, TicketingConnection};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const FETCH_LIMIT: usize = 100;
const ERROR_TRUNCATE: usize = 500;
/// Fallback lookback when a connection has never synced.
const DEFAULT_LOOKBACK_MS: u64 = 60 * 60 * 1000;

/// A ticket as returned by a tool-specific fetcher.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedTicket {
    pub source: String,
    pub external_id: String,
    pub title: String,
    pub description: String,
    pub severity: String,
    pub status: TicketStatus,
    pub environment: Option<String>,
    pub service: Option<String>,
    pub metadata: Value,
}

/// Tool-specific ticket fetcher (Zoho, ManageEngine, ...).
#[async_trait]
pub trait TicketFetcher: Send + Sync {
    /// Fetch tickets updated since `since_ms`. Implementations may refresh
    /// OAuth tokens by mutating `connection_meta` in place.
    async fn fetch_tickets(
        &self,
        tool_name: &str,
        api_base_url: &str,
        connection_meta: &mut Value,
        since_ms: u64,
        limit: usize,
    ) -> Result<Vec<FetchedTicket>, String>;
}

/// Background polling service.
pub struct TicketPoller<C: Clock> {
    engine: Arc<Engine<C>>,
    fetcher: Arc<dyn TicketFetcher>,
    running: Arc<AtomicBool>,
}

impl<C: Clock + 'static> TicketPoller<C> {
    pub fn new(engine: Arc<Engine<C>>, fetcher: Arc<dyn TicketFetcher>) -> Self {
        Self { engine, fetcher, running: Arc::new(AtomicBool::new(false)) }
    }

    /// Spawn the polling loop. Returns the join handle; call [`Self::stop`]
    /// for a bounded shutdown.
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        let engine = Arc::clone(&self.engine);
        let fetcher = Arc::clone(&self.fetcher);
        let running = Arc::clone(&self.running);

        tokio::spawn(async move {
            tracing::info!("ticketing poller started");
            while running.load(Ordering::SeqCst) {
                if let Err(error) = poll_due_connections(&engine, fetcher.as_ref()).await {
                    tracing::error!(%error, "polling cycle failed");
                }
                // 1s granularity keeps shutdown bounded.
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            tracing::info!("ticketing poller stopped");
        })
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// One fetch cycle for a single connection (exposed for tests and
    /// manual sync endpoints).
    pub async fn poll_connection(&self, connection_id: ConnectionId) -> Result<(), EngineError> {
        poll_one(&self.engine, self.fetcher.as_ref(), connection_id).await
    }
}

/// Enumerate active `api_poll` connections whose interval has elapsed.
async fn poll_due_connections<C: Clock>(
    engine: &Engine<C>,
    fetcher: &dyn TicketFetcher,
) -> Result<(), EngineError> {
    let now_ms = engine.clock().epoch_ms();
    let state_arc = engine.state();
    let due: Vec<ConnectionId> = {
        let state = state_arc.lock();
        state
            .connections
            .values()
            .filter(|connection| {
                connection.active
                    && connection.connection_type == "api_poll"
                    && is_due(connection, now_ms)
            })
            .map(|connection| connection.id)
            .collect()
    };

    for connection_id in due {
        if let Err(error) = poll_one(engine, fetcher, connection_id).await {
            tracing::error!(connection = %connection_id, %error, "connection poll failed");
        }
    }
    Ok(())
}

fn is_due(connection: &TicketingConnection, now_ms: u64) -> bool {
    match connection.last_sync_at_ms {
        None => true,
        Some(last) => now_ms >= last + connection.sync_interval_minutes * 60_000,
    }
}

async fn poll_one<C: Clock>(
    engine: &Engine<C>,
    fetcher: &dyn TicketFetcher,
    connection_id: ConnectionId,
) -> Result<(), EngineError> {
    let connection = {
        let state_arc = engine.state();
        let state = state_arc.lock();
        state
            .connections
            .get(&connection_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(format!("connection {connection_id}")))?
    };

    tracing::info!(tool = %connection.tool_name, connection = %connection_id, "polling");

    let now_ms = engine.clock().epoch_ms();
    let since_ms = connection
        .last_sync_at_ms
        .unwrap_or_else(|| now_ms.saturating_sub(DEFAULT_LOOKBACK_MS));

    // Snapshot so a token refresh is detectable afterwards.
    let mut meta = connection.metadata.clone();
    let original_meta = meta.to_string();

    let fetch_result = fetcher
        .fetch_tickets(
            &connection.tool_name,
            &connection.api_base_url,
            &mut meta,
            since_ms,
            FETCH_LIMIT,
        )
        .await;

    let tokens_refreshed = meta.to_string() != original_meta;
    if tokens_refreshed {
        tracing::info!(connection = %connection_id, "tokens were refreshed during fetch");
    }

    let sync_error = match fetch_result {
        Ok(fetched) => match upsert_fetched(engine, &connection, fetched) {
            Ok((created, updated)) => {
                tracing::info!(
                    connection = %connection_id,
                    created,
                    updated,
                    "poll finished"
                );
                None
            }
            Err(error) => Some(error.to_string()),
        },
        Err(error) => Some(error),
    };

    // Sync bookkeeping always persists the (possibly refreshed) metadata,
    // even on failure.
    let (status, error) = match sync_error {
        None => (SyncStatus::Success, None),
        Some(error) => {
            // Char-based cap keeps the cut on a boundary.
            let truncated: String = error.chars().take(ERROR_TRUNCATE).collect();
            (SyncStatus::Failed, Some(truncated))
        }
    };
    engine.commit(Event::ConnectionSyncUpdated {
        id: connection_id,
        last_sync_at_ms: engine.clock().epoch_ms(),
        status,
        error: error.clone(),
        metadata: meta,
    })?;

    match error {
        None => Ok(()),
        Some(error) => Err(EngineError::validation(format!(
            "poll failed for connection {connection_id}: {error}"
        ))),
    }
}

fn upsert_fetched<C: Clock>(
    engine: &Engine<C>,
    connection: &TicketingConnection,
    fetched: Vec<FetchedTicket>,
) -> Result<(usize, usize), EngineError> {
    let mut created = 0;
    let mut updated = 0;
    let now_ms = engine.clock().epoch_ms();

    for item in fetched {
        let existing = {
            let state_arc = engine.state();
            let state = state_arc.lock();
            state
                .ticket_by_external(connection.tenant_id.as_str(), &item.source, &item.external_id)
                .cloned()
        };

        let ticket = match existing {
            Some(existing) => {
                updated += 1;
                Ticket {
                    title: item.title,
                    description: item.description,
                    severity: item.severity,
                    status: item.status,
                    metadata: item.metadata,
                    updated_at_ms: now_ms,
                    ..existing
                }
            }
            None => {
                created += 1;
                Ticket {
                    id: TicketId::new(),
                    tenant_id: connection.tenant_id,
                    external_id: Some(item.external_id),
                    source: Some(item.source),
                    title: item.title,
                    description: item.description,
                    severity: item.severity,
                    environment: item.environment.or_else(|| Some("prod".to_string())),
                    service: item.service,
                    status: item.status,
                    classification: None,
                    classification_confidence: None,
                    raw_payload: Value::Null,
                    metadata: item.metadata,
                    received_at_ms: now_ms,
                    updated_at_ms: now_ms,
                    resolved_at_ms: None,
                }
            }
        };
        engine.commit(Event::TicketUpserted { ticket })?;
    }
    Ok((created, updated))
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;
