// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use remedy_core::session::{AssignmentStatus, SessionStatus};
use remedy_core::ticket::{SyncStatus, TicketStatus};
use remedy_core::{
    Credential, EventEnvelope, ExecutionStep, SessionEventKind, TenantId, Ticket,
};
use serde_json::json;

fn created(session: ExecutionSession) -> Event {
    Event::SessionCreated { session }
}

fn session_with_steps() -> ExecutionSession {
    ExecutionSession::builder()
        .id(SessionId::from_string("ses-state"))
        .steps(vec![
            ExecutionStep::builder().step_number(1).build(),
            ExecutionStep::builder().step_number(2).requires_approval(true).build(),
        ])
        .total_steps(2)
        .build()
}

fn feed_event(session_id: SessionId, id: u64, stream_id: &str) -> ExecutionEvent {
    ExecutionEvent {
        id,
        session_id,
        step_number: None,
        kind: SessionEventKind::Created,
        envelope: EventEnvelope {
            event: SessionEventKind::Created,
            session_id,
            step_number: None,
            payload: json!({}),
            timestamp: "2026-01-01T00:00:00.000Z".into(),
        },
        stream_id: stream_id.to_string(),
        created_at_ms: 1,
    }
}

#[test]
fn session_created_is_idempotent() {
    let mut state = MaterializedState::default();
    let session = session_with_steps();
    state.apply_event(&created(session.clone()));

    // A second apply with a mutated copy must not clobber the original.
    let mut altered = session.clone();
    altered.status = SessionStatus::Failed;
    state.apply_event(&created(altered));

    assert_eq!(state.sessions[&session.id].status, SessionStatus::Pending);
}

#[test]
fn step_completion_is_guarded() {
    let mut state = MaterializedState::default();
    let session = session_with_steps();
    let id = session.id;
    state.apply_event(&created(session));

    let complete = Event::StepCompleted {
        id,
        step_number: 1,
        success: true,
        output: Some("ok".into()),
        error: None,
        notes: None,
        credentials_used: vec![],
        completed_at_ms: 10,
    };
    state.apply_event(&complete);

    // Replay with different data must not overwrite the first completion.
    let replay = Event::StepCompleted {
        id,
        step_number: 1,
        success: false,
        output: None,
        error: Some("late".into()),
        notes: None,
        credentials_used: vec![],
        completed_at_ms: 99,
    };
    state.apply_event(&replay);

    let step = state.sessions[&id].step(1).unwrap().clone();
    assert_eq!(step.success, Some(true));
    assert_eq!(step.output.as_deref(), Some("ok"));
    assert_eq!(step.completed_at_ms, Some(10));
}

#[test]
fn approval_request_sets_waiting_flags() {
    let mut state = MaterializedState::default();
    let session = session_with_steps();
    let id = session.id;
    state.apply_event(&created(session));

    state.apply_event(&Event::ApprovalRequested { id, step_number: 2 });
    let session = &state.sessions[&id];
    assert_eq!(session.status, SessionStatus::WaitingApproval);
    assert!(session.waiting_for_approval);
    assert_eq!(session.approval_step_number, Some(2));
    assert_eq!(session.current_step, Some(2));

    state.apply_event(&Event::ApprovalCleared { id });
    let session = &state.sessions[&id];
    assert!(!session.waiting_for_approval);
    assert_eq!(session.approval_step_number, None);
    assert_eq!(session.status, SessionStatus::InProgress);
}

#[test]
fn approval_record_is_write_once() {
    let mut state = MaterializedState::default();
    let session = session_with_steps();
    let id = session.id;
    state.apply_event(&created(session));

    state.apply_event(&Event::ApprovalRecorded {
        id,
        step_number: 2,
        approved: false,
        approved_by: Some("ops".into()),
        approved_at_ms: 5,
    });
    state.apply_event(&Event::ApprovalRecorded {
        id,
        step_number: 2,
        approved: true,
        approved_by: Some("other".into()),
        approved_at_ms: 9,
    });

    let step = state.sessions[&id].step(2).unwrap().clone();
    assert_eq!(step.approved, Some(false));
    assert_eq!(step.approved_by.as_deref(), Some("ops"));
}

#[test]
fn terminal_status_clears_approval_state() {
    let mut state = MaterializedState::default();
    let session = session_with_steps();
    let id = session.id;
    state.apply_event(&created(session));
    state.apply_event(&Event::ApprovalRequested { id, step_number: 2 });

    state.apply_event(&Event::SessionStatusChanged {
        id,
        status: SessionStatus::Failed,
        completed_at_ms: Some(50),
        total_duration_minutes: None,
    });

    let session = &state.sessions[&id];
    assert!(session.is_terminal());
    assert!(!session.waiting_for_approval);
    assert_eq!(session.approval_step_number, None);
    assert_eq!(session.completed_at_ms, Some(50));
}

#[test]
fn pause_and_resume_restore_prior_status() {
    let mut state = MaterializedState::default();
    let session = session_with_steps();
    let id = session.id;
    state.apply_event(&created(session));
    state.apply_event(&Event::SessionStarted { id, started_at_ms: 1 });

    state.apply_event(&Event::SessionPaused { id, prior: SessionStatus::InProgress });
    assert_eq!(state.sessions[&id].status, SessionStatus::Paused);
    assert_eq!(state.sessions[&id].paused_status, Some(SessionStatus::InProgress));

    state.apply_event(&Event::SessionResumed { id, status: SessionStatus::InProgress });
    assert_eq!(state.sessions[&id].status, SessionStatus::InProgress);
    assert_eq!(state.sessions[&id].paused_status, None);
}

#[test]
fn event_feed_dedupes_stream_ids() {
    let mut state = MaterializedState::default();
    let session = session_with_steps();
    let id = session.id;
    state.apply_event(&created(session));

    state.apply_event(&Event::EventRecorded { event: feed_event(id, 1, "5-0") });
    state.apply_event(&Event::EventRecorded { event: feed_event(id, 2, "5-0") });
    state.apply_event(&Event::EventRecorded { event: feed_event(id, 2, "6-0") });

    let events = &state.events[&id];
    assert_eq!(events.len(), 2);
    assert_eq!(state.next_event_id(&id), 3);
    assert!(state.has_stream_id(&id, "5-0"));
    assert!(!state.has_stream_id(&id, "7-0"));
    assert_eq!(state.sessions[&id].last_event_seq.as_deref(), Some("6-0"));
}

#[test]
fn assignments_track_latest_with_details() {
    let mut state = MaterializedState::default();
    let session = session_with_steps();
    let id = session.id;
    state.apply_event(&created(session));

    let first = WorkerAssignment {
        id: remedy_core::AssignmentId::from_string("asn-1"),
        session_id: id,
        worker_id: None,
        status: AssignmentStatus::Pending,
        details: json!({"connection": {"host": "web-01"}}),
        created_at_ms: 1,
        acknowledged_at_ms: None,
    };
    let second = WorkerAssignment {
        id: remedy_core::AssignmentId::from_string("asn-2"),
        session_id: id,
        worker_id: None,
        status: AssignmentStatus::Pending,
        details: serde_json::Value::Null,
        created_at_ms: 2,
        acknowledged_at_ms: None,
    };
    state.apply_event(&Event::AssignmentRecorded { assignment: first.clone() });
    state.apply_event(&Event::AssignmentRecorded { assignment: first.clone() });
    state.apply_event(&Event::AssignmentRecorded { assignment: second });

    assert_eq!(state.assignments[&id].len(), 2);
    // Latest-with-details wins over a null-details newcomer.
    assert_eq!(state.latest_assignment(&id).unwrap().id, first.id);

    state.apply_event(&Event::AssignmentStatusChanged {
        session_id: id,
        assignment_id: first.id,
        status: AssignmentStatus::Acknowledged,
        worker_id: Some("w1".into()),
        acknowledged_at_ms: Some(9),
    });
    let updated = state.assignments[&id].iter().find(|a| a.id == first.id).unwrap();
    assert_eq!(updated.status, AssignmentStatus::Acknowledged);
    assert_eq!(updated.worker_id.as_deref(), Some("w1"));
}

#[test]
fn ticket_upsert_maintains_external_index() {
    let mut state = MaterializedState::default();
    let tenant = TenantId::from_string("tnt-a");
    let ticket = Ticket::builder()
        .tenant_id(tenant)
        .source("zoho")
        .external_id("Z-1")
        .build();
    let id = ticket.id;
    state.apply_event(&Event::TicketUpserted { ticket });

    let found = state.ticket_by_external("tnt-a", "zoho", "Z-1").unwrap();
    assert_eq!(found.id, id);
    assert!(state.ticket_by_external("tnt-b", "zoho", "Z-1").is_none());

    state.apply_event(&Event::TicketStatusChanged {
        id,
        status: TicketStatus::Resolved,
        updated_at_ms: 7,
        resolved_at_ms: Some(7),
    });
    assert_eq!(state.tickets[&id].status, TicketStatus::Resolved);
    assert_eq!(state.tickets[&id].resolved_at_ms, Some(7));
}

#[test]
fn connection_sync_updates_metadata() {
    let mut state = MaterializedState::default();
    let connection = remedy_core::TicketingConnection {
        id: remedy_core::ConnectionId::from_string("conn-1"),
        tenant_id: TenantId::from_string("tnt-a"),
        tool_name: "zoho".into(),
        connection_type: "api_poll".into(),
        api_base_url: "https://desk.example".into(),
        active: true,
        sync_interval_minutes: 5,
        last_sync_at_ms: None,
        last_sync_status: None,
        last_error: None,
        metadata: json!({"access_token": "old"}),
    };
    let id = connection.id;
    state.apply_event(&Event::ConnectionStored { connection });

    state.apply_event(&Event::ConnectionSyncUpdated {
        id,
        last_sync_at_ms: 100,
        status: SyncStatus::Failed,
        error: Some("boom".into()),
        metadata: json!({"access_token": "fresh"}),
    });

    let connection = &state.connections[&id];
    assert_eq!(connection.last_sync_status, Some(SyncStatus::Failed));
    assert_eq!(connection.last_error.as_deref(), Some("boom"));
    assert_eq!(connection.metadata["access_token"], "fresh");
}

#[test]
fn credential_alias_resolution_prefers_environment() {
    let mut state = MaterializedState::default();
    let tenant = TenantId::from_string("tnt-a");
    let prod = Credential::builder().tenant_id(tenant).alias("db").environment("prod").build();
    let anywhere = Credential::builder().tenant_id(tenant).alias("db").build();
    let prod_id = prod.id;
    let anywhere_id = anywhere.id;
    state.apply_event(&Event::CredentialStored { credential: prod });
    state.apply_event(&Event::CredentialStored { credential: anywhere });

    assert_eq!(state.resolve_credential_alias("tnt-a", "db", Some("prod")).unwrap().id, prod_id);
    assert_eq!(
        state.resolve_credential_alias("tnt-a", "db", Some("staging")).unwrap().id,
        anywhere_id
    );
    assert_eq!(state.resolve_credential_alias("tnt-a", "db", None).unwrap().id, anywhere_id);
    assert!(state.resolve_credential_alias("tnt-b", "db", None).is_none());
}

#[test]
fn get_session_by_prefix() {
    let mut state = MaterializedState::default();
    let session = ExecutionSession::builder().id(SessionId::from_string("ses-abcdef")).build();
    state.apply_event(&created(session));

    assert!(state.get_session("ses-abcdef").is_some());
    assert!(state.get_session("ses-abc").is_some());
    assert!(state.get_session("ses-zzz").is_none());
}
