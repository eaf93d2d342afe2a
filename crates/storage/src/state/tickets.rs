// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event handlers for tickets, ticketing connections, and reference data.

use super::MaterializedState;
use remedy_core::Event;

pub(super) fn apply(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::TicketUpserted { ticket } => {
            if let Some((source, external)) = ticket.external_key() {
                state.ticket_index.insert(
                    (ticket.tenant_id.to_string(), source.to_string(), external.to_string()),
                    ticket.id,
                );
            }
            state.tickets.insert(ticket.id, ticket.clone());
        }

        Event::TicketStatusChanged { id, status, updated_at_ms, resolved_at_ms } => {
            if let Some(ticket) = state.tickets.get_mut(id) {
                ticket.status = *status;
                ticket.updated_at_ms = *updated_at_ms;
                if resolved_at_ms.is_some() {
                    ticket.resolved_at_ms = *resolved_at_ms;
                }
            }
        }

        Event::ConnectionStored { connection } => {
            state.connections.insert(connection.id, connection.clone());
        }

        Event::ConnectionSyncUpdated { id, last_sync_at_ms, status, error, metadata } => {
            if let Some(connection) = state.connections.get_mut(id) {
                connection.last_sync_at_ms = Some(*last_sync_at_ms);
                connection.last_sync_status = Some(*status);
                connection.last_error = error.clone();
                connection.metadata = metadata.clone();
            }
        }

        Event::RunbookStored { runbook } => {
            state.runbooks.insert(runbook.id, runbook.clone());
        }

        Event::CredentialStored { credential } => {
            state.credentials.insert(credential.id, credential.clone());
        }

        _ => {}
    }
}
