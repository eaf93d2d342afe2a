// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

use crate::engine::{Engine, EngineDeps};
use parking_lot::Mutex;
use remedy_bus::{MemoryBus, MemoryIdempotencyStore, StreamConfig};
use remedy_core::{FakeClock, Metrics, RunbookRecord, RunbookStatus, TenantId};
use remedy_storage::{AuditConfig, AuditSink, MaterializedState, Wal};
use std::sync::Arc;
use std::time::Duration;

pub(crate) struct TestHarness {
    pub engine: Arc<Engine<FakeClock>>,
    pub clock: FakeClock,
    pub bus: MemoryBus,
    pub audit_path: std::path::PathBuf,
    _dir: tempfile::TempDir,
}

pub(crate) fn harness_with_discovery(
    discovery: Arc<dyn crate::connection::CloudDiscovery>,
) -> TestHarness {
    let mut h = harness();
    if let Some(engine) = Arc::into_inner(h.engine) {
        h.engine = Arc::new(engine.with_cloud_discovery(discovery));
        return h;
    }
    harness()
}

pub(crate) fn harness_with_client(
    client: Arc<dyn crate::verify::TicketingClient>,
) -> TestHarness {
    let mut h = harness();
    if let Some(engine) = Arc::into_inner(h.engine) {
        h.engine = Arc::new(engine.with_ticketing_client(client));
        return h;
    }
    // The fresh harness holds the only reference, so this is unreachable.
    harness()
}

pub(crate) fn harness() -> TestHarness {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    let bus = MemoryBus::new();
    let audit_path = dir.path().join("audit.log");

    let wal = Wal::open(dir.path().join("remedy.wal"), 0).unwrap();
    let audit = AuditSink::new(
        AuditConfig { path: audit_path.clone(), ..AuditConfig::default() },
        clock.clone(),
    );

    let deps = EngineDeps {
        state: Arc::new(Mutex::new(MaterializedState::default())),
        wal: Arc::new(Mutex::new(wal)),
        bus: Arc::new(bus.clone()),
        idempotency: Arc::new(MemoryIdempotencyStore::new(Duration::from_secs(3600), clock.clone())),
        audit: Arc::new(audit),
        metrics: Arc::new(Metrics::new()),
        streams: StreamConfig::default(),
        clock: clock.clone(),
    };

    TestHarness { engine: Arc::new(Engine::new(deps)), clock, bus, audit_path, _dir: dir }
}

pub(crate) fn tenant() -> TenantId {
    TenantId::from_string("tnt-test")
}

pub(crate) fn runbook_with_body(body: &str) -> RunbookRecord {
    RunbookRecord {
        id: remedy_core::RunbookId::new(),
        tenant_id: tenant(),
        title: "test runbook".to_string(),
        body: body.to_string(),
        confidence: None,
        parent_version: None,
        status: RunbookStatus::Approved,
        active: true,
        metadata: serde_json::Value::Null,
    }
}

/// Three-phase echo runbook used across scenarios.
pub(crate) const ECHO_RUNBOOK: &str = r#"```yaml
title: echo everything
prechecks:
  - description: precheck
    command: echo A
steps:
  - name: main
    command: echo B
postchecks:
  - description: postcheck
    command: echo C
```"#;
