// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end specs for the orchestration core, driven through the public
//! engine API with an in-process bus and a temp-dir WAL + audit log.

use parking_lot::Mutex;
use remedy_bus::{MemoryBus, MemoryIdempotencyStore, StreamBus, StreamConfig, StreamId};
use remedy_core::{
    FakeClock, Metrics, RunbookRecord, RunbookStatus, SessionEventKind, SessionStatus, TenantId,
    Ticket, TicketStatus, WorkerId,
};
use remedy_engine::{
    ControlAction, CreateSessionRequest, Engine, EngineDeps, ManualCommandRequest, WorkerFilter,
};
use remedy_storage::{verify_chain, AuditConfig, AuditSink, MaterializedState, Wal};
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    engine: Arc<Engine<FakeClock>>,
    clock: FakeClock,
    bus: MemoryBus,
    audit_path: std::path::PathBuf,
    wal_path: std::path::PathBuf,
    _dir: tempfile::TempDir,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    let bus = MemoryBus::new();
    let audit_path = dir.path().join("audit.log");
    let wal_path = dir.path().join("remedy.wal");

    let deps = EngineDeps {
        state: Arc::new(Mutex::new(MaterializedState::default())),
        wal: Arc::new(Mutex::new(Wal::open(&wal_path, 0).unwrap())),
        bus: Arc::new(bus.clone()),
        idempotency: Arc::new(MemoryIdempotencyStore::new(
            Duration::from_secs(3600),
            clock.clone(),
        )),
        audit: Arc::new(AuditSink::new(
            AuditConfig { path: audit_path.clone(), ..AuditConfig::default() },
            clock.clone(),
        )),
        metrics: Arc::new(Metrics::new()),
        streams: StreamConfig::default(),
        clock: clock.clone(),
    };
    Fixture {
        engine: Arc::new(Engine::new(deps)),
        clock,
        bus,
        audit_path,
        wal_path,
        _dir: dir,
    }
}

fn tenant() -> TenantId {
    TenantId::from_string("tnt-spec")
}

fn runbook(body: &str) -> RunbookRecord {
    RunbookRecord {
        id: remedy_core::RunbookId::new(),
        tenant_id: tenant(),
        title: "spec runbook".to_string(),
        body: body.to_string(),
        confidence: None,
        parent_version: None,
        status: RunbookStatus::Approved,
        active: true,
        metadata: serde_json::Value::Null,
    }
}

fn request(runbook_id: remedy_core::RunbookId) -> CreateSessionRequest {
    CreateSessionRequest {
        runbook_id,
        tenant_id: tenant(),
        ticket_id: None,
        user_id: None,
        issue_description: None,
        metadata: None,
        idempotency_key: None,
    }
}

/// Scenario 1: happy path, no approvals. Prechecks `[echo A]`, mains
/// `[echo B]`, postchecks `[echo C]`, local connector.
#[tokio::test]
async fn happy_path_without_approvals() {
    let f = fixture();
    let rb = runbook(
        "```yaml\nprechecks:\n  - description: pre\n    command: echo A\nsteps:\n  - name: main\n    command: echo B\npostchecks:\n  - description: post\n    command: echo C\n```",
    );
    f.engine.store_runbook(rb.clone()).unwrap();
    let ticket = f
        .engine
        .upsert_ticket(Ticket::builder().tenant_id(tenant()).build())
        .unwrap();

    let mut req = request(rb.id);
    req.ticket_id = Some(ticket.id);
    let session = f.engine.create_execution_session(req).await.unwrap();
    f.engine.start_execution(session.id).await.unwrap();

    let done = f.engine.get_execution_session(session.id.as_str()).unwrap();
    assert_eq!(done.status, SessionStatus::Completed);
    assert!(done.total_duration_minutes.is_some());

    let events = f.engine.list_session_events(session.id, None, 100).unwrap();
    let kinds: Vec<_> = events.iter().map(|e| e.event).collect();
    assert_eq!(kinds[0], SessionEventKind::Created);
    let steps: Vec<_> = events
        .iter()
        .filter(|e| e.event == SessionEventKind::StepCompleted)
        .map(|e| (e.step_number.unwrap(), e.payload["success"].as_bool().unwrap()))
        .collect();
    assert_eq!(steps, vec![(1, true), (2, true), (3, true)]);
    assert_eq!(kinds.last(), Some(&SessionEventKind::Completed));

    let ticket = f.engine.get_ticket(ticket.id.as_str()).unwrap();
    assert_eq!(ticket.status, TicketStatus::Resolved);
}

/// Scenario 2: approval then reject. The gated command is never published
/// and the ticket escalates back to the operators as in_progress.
#[tokio::test]
async fn approval_then_reject() {
    let f = fixture();
    let rb = runbook(
        "```yaml\nsteps:\n  - name: gated\n    command: echo danger\n    requires_approval: true\n```",
    );
    f.engine.store_runbook(rb.clone()).unwrap();
    let ticket = f
        .engine
        .upsert_ticket(Ticket::builder().tenant_id(tenant()).build())
        .unwrap();

    let mut req = request(rb.id);
    req.ticket_id = Some(ticket.id);
    let session = f.engine.create_execution_session(req).await.unwrap();
    f.engine.start_execution(session.id).await.unwrap();

    let waiting = f.engine.get_execution_session(session.id.as_str()).unwrap();
    assert_eq!(waiting.status, SessionStatus::WaitingApproval);

    f.engine.approve_step(session.id, 1, Some("ops"), false).await.unwrap();

    let failed = f.engine.get_execution_session(session.id.as_str()).unwrap();
    assert_eq!(failed.status, SessionStatus::Failed);
    assert_eq!(failed.step(1).unwrap().approved, Some(false));
    assert!(!failed.step(1).unwrap().completed);
    assert!(f.bus.is_empty("session.command"));

    let ticket = f.engine.get_ticket(ticket.id.as_str()).unwrap();
    assert_eq!(ticket.status, TicketStatus::InProgress);
}

/// Scenario 3: mid-run failure triggers rollback in reverse order.
#[tokio::test]
async fn mid_run_failure_triggers_rollback() {
    let f = fixture();
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("x");
    let rb = runbook(&format!(
        "```yaml\nsteps:\n  - name: make\n    command: mkdir {m}\n    rollback: rmdir {m}\n  - name: boom\n    command: \"false\"\n```",
        m = marker.display()
    ));
    f.engine.store_runbook(rb.clone()).unwrap();

    let session = f.engine.create_execution_session(request(rb.id)).await.unwrap();
    f.engine.start_execution(session.id).await.unwrap();

    let failed = f.engine.get_execution_session(session.id.as_str()).unwrap();
    assert_eq!(failed.status, SessionStatus::Failed);
    assert!(!marker.exists(), "rollback should have removed the directory");

    let events = f.engine.list_session_events(session.id, None, 100).unwrap();
    assert!(events.iter().any(|e| e.event == SessionEventKind::RollbackCompleted));
}

/// Scenario 4: idempotent manual command submission without an explicit key.
#[tokio::test]
async fn idempotent_command_submission() {
    let f = fixture();
    let rb = runbook("```yaml\nsteps:\n  - name: a\n    command: echo a\n```");
    f.engine.store_runbook(rb.clone()).unwrap();
    let session = f.engine.create_execution_session(request(rb.id)).await.unwrap();

    let req = ManualCommandRequest {
        command: "uptime".to_string(),
        shell: Some("bash".to_string()),
        run_as: None,
        reason: None,
        timeout_seconds: None,
        user_id: None,
        idempotency_key: None,
    };
    let first = f.engine.submit_manual_command(session.id, req.clone()).await.unwrap();
    let second = f.engine.submit_manual_command(session.id, req).await.unwrap();

    assert_eq!(first.stream_id, second.stream_id);
    assert_eq!(f.bus.len("session.command"), 1);

    let requested: Vec<_> = f
        .engine
        .list_session_events(session.id, None, 100)
        .unwrap()
        .into_iter()
        .filter(|e| e.event == SessionEventKind::CommandRequested)
        .collect();
    assert_eq!(requested.len(), 1);
}

/// Scenario 5: an Azure 409 classifies as a conflict, which is not a
/// connection error and is never retried.
#[test]
fn azure_conflict_classification() {
    let outcome = remedy_connectors::ExecOutcome {
        success: false,
        error: "Run command extension execution is in progress. Please wait.".to_string(),
        exit_code: -1,
        ..remedy_connectors::ExecOutcome::default()
    };
    assert_eq!(
        remedy_connectors::detect_failure_type(&outcome),
        remedy_connectors::FailureKind::AzureConflict
    );
    assert_eq!(outcome.retry_count, 0);
}

/// Scenario 6: worker registry filtering and TTL eviction.
#[test]
fn worker_registry_filter_and_ttl() {
    let f = fixture();
    let registry = f.engine.registry();

    registry.register(
        WorkerId::new("A"),
        ["ssh".to_string(), "powershell".to_string()],
        None,
        Some("prod".to_string()),
        2,
        serde_json::Value::Null,
    );
    registry.register(
        WorkerId::new("B"),
        ["ssh".to_string()],
        None,
        Some("staging".to_string()),
        2,
        serde_json::Value::Null,
    );

    let filter = WorkerFilter {
        capabilities: vec!["ssh".to_string(), "powershell".to_string()],
        environment: Some("prod".to_string()),
        network_segment: None,
    };
    let matched = registry.list_active(&filter);
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].worker_id.as_str(), "A");

    f.clock.advance(Duration::from_secs(61));
    assert!(registry.list_active(&WorkerFilter::default()).is_empty());
}

/// Audit chain: replaying the file reproduces the chain end to end.
#[tokio::test]
async fn audit_chain_verifies_end_to_end() {
    let f = fixture();
    let rb = runbook("```yaml\nsteps:\n  - name: a\n    command: echo a\n```");
    f.engine.store_runbook(rb.clone()).unwrap();
    let session = f.engine.create_execution_session(request(rb.id)).await.unwrap();
    f.engine.start_execution(session.id).await.unwrap();

    assert!(verify_chain(&f.audit_path).unwrap() > 0);
}

/// Sanitization: secret material never appears on the events stream.
#[tokio::test]
async fn event_payloads_are_sanitized() {
    let f = fixture();
    let rb = runbook("```yaml\nsteps:\n  - name: a\n    command: echo a\n```");
    f.engine.store_runbook(rb.clone()).unwrap();

    let mut req = request(rb.id);
    req.metadata = Some(serde_json::json!({
        "credentials": {"username": "svc", "password": "hunter2", "api_key": "k-123"},
        "connection": {"host": "web-01", "token": "t-999"},
    }));
    let session = f.engine.create_execution_session(req).await.unwrap();

    f.engine
        .submit_manual_command(
            session.id,
            ManualCommandRequest {
                command: "uptime".to_string(),
                shell: None,
                run_as: None,
                reason: None,
                timeout_seconds: None,
                user_id: None,
                idempotency_key: None,
            },
        )
        .await
        .unwrap();

    let events = f.bus.read("session.events", StreamId::ZERO, 100, None).await.unwrap();
    for entry in &events {
        let raw = entry.payload.to_string();
        assert!(!raw.contains("hunter2"), "secret leaked: {raw}");
        assert!(!raw.contains("k-123"), "secret leaked: {raw}");
        assert!(!raw.contains("t-999"), "secret leaked: {raw}");
    }
    let assigns = f.bus.read("session.assign", StreamId::ZERO, 100, None).await.unwrap();
    for entry in &assigns {
        assert!(!entry.payload.to_string().contains("hunter2"));
    }
}

/// Restart recovery: replaying the WAL reproduces the session state.
#[tokio::test]
async fn wal_replay_restores_state() {
    let f = fixture();
    let rb = runbook("```yaml\nsteps:\n  - name: a\n    command: echo a\n```");
    f.engine.store_runbook(rb.clone()).unwrap();
    let session = f.engine.create_execution_session(request(rb.id)).await.unwrap();
    f.engine.start_execution(session.id).await.unwrap();

    let mut wal = Wal::open(&f.wal_path, 0).unwrap();
    let mut restored = MaterializedState::default();
    wal.replay_into(&mut restored).unwrap();

    let original = f.engine.get_execution_session(session.id.as_str()).unwrap();
    let replayed = restored.sessions.get(&session.id).unwrap();
    assert_eq!(replayed, &original);
    assert_eq!(
        restored.events.get(&session.id).map(Vec::len),
        Some(f.engine.list_session_events(session.id, None, 100).unwrap().len()),
    );
}

/// Idempotent session creation: concurrent requests with one key yield one
/// session.
#[tokio::test]
async fn concurrent_creates_share_one_session() {
    let f = fixture();
    let rb = runbook("```yaml\nsteps:\n  - name: a\n    command: echo a\n```");
    f.engine.store_runbook(rb.clone()).unwrap();

    let mut req = request(rb.id);
    req.idempotency_key = Some("create-once".to_string());

    let first = f.engine.create_execution_session(req.clone()).await.unwrap();
    let mut ids = vec![first.id];
    for _ in 0..4 {
        let session = f.engine.create_execution_session(req.clone()).await.unwrap();
        ids.push(session.id);
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(f.engine.list_sessions(10, 0).len(), 1);
}

/// Sandbox profile is the maximum severity rank across steps.
#[tokio::test]
async fn sandbox_profile_takes_the_maximum() {
    let f = fixture();
    let rb = runbook(
        "```yaml\nsteps:\n  - name: benign\n    command: echo ok\n    severity: low\n  - name: scary\n    command: echo risky\n    severity: critical\n```",
    );
    f.engine.store_runbook(rb.clone()).unwrap();
    let session = f.engine.create_execution_session(request(rb.id)).await.unwrap();
    assert_eq!(session.sandbox_profile, remedy_core::SandboxProfile::ProdCritical);
}

/// Control flow: pause from in-flight approval, resume restores it, rollback
/// from failed is terminal.
#[tokio::test]
async fn control_actions_cover_the_state_machine() {
    let f = fixture();
    let rb = runbook(
        "```yaml\nsteps:\n  - name: gated\n    command: echo go\n    requires_approval: true\n```",
    );
    f.engine.store_runbook(rb.clone()).unwrap();
    let session = f.engine.create_execution_session(request(rb.id)).await.unwrap();
    f.engine.start_execution(session.id).await.unwrap();

    let paused = f
        .engine
        .control_execution_session(session.id, ControlAction::Pause, None, None)
        .await
        .unwrap();
    assert_eq!(paused.status, SessionStatus::Paused);

    let resumed = f
        .engine
        .control_execution_session(session.id, ControlAction::Resume, None, None)
        .await
        .unwrap();
    assert_eq!(resumed.status, SessionStatus::WaitingApproval);

    // Pause again and roll back: terminal, no steps had completed.
    f.engine
        .control_execution_session(session.id, ControlAction::Pause, None, None)
        .await
        .unwrap();
    let rolled = f
        .engine
        .control_execution_session(session.id, ControlAction::Rollback, None, None)
        .await
        .unwrap();
    assert_eq!(rolled.status, SessionStatus::RolledBack);
}
