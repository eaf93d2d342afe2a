// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use remedy_core::FakeClock;
use serde_json::json;
use tempfile::tempdir;

fn sink(path: &Path, clock: &FakeClock) -> AuditSink<FakeClock> {
    let config = AuditConfig {
        enabled: true,
        path: path.to_path_buf(),
        replica_bucket: None,
        replica_prefix: "audit-log/".to_string(),
    };
    AuditSink::new(config, clock.clone())
}

#[tokio::test]
async fn chain_verifies_after_appends() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.log");
    let clock = FakeClock::new();
    let sink = sink(&path, &clock);

    let session = remedy_core::SessionId::from_string("ses-a");
    for n in 0..4 {
        sink.record_event(session, "session.step.completed", &json!({"n": n}))
            .await
            .unwrap();
        clock.advance(std::time::Duration::from_secs(1));
    }

    assert_eq!(verify_chain(&path).unwrap(), 4);
}

#[tokio::test]
async fn chain_survives_cold_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.log");
    let clock = FakeClock::new();

    {
        let sink = sink(&path, &clock);
        sink.record_event(remedy_core::SessionId::from_string("ses-a"), "session.created", &json!({}))
            .await
            .unwrap();
    }

    // New sink instance reads prev hash from the file tail.
    let sink = sink(&path, &clock);
    sink.record_event(remedy_core::SessionId::from_string("ses-a"), "session.completed", &json!({}))
        .await
        .unwrap();

    assert_eq!(verify_chain(&path).unwrap(), 2);
}

#[tokio::test]
async fn tampering_breaks_verification() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.log");
    let clock = FakeClock::new();
    let sink = sink(&path, &clock);

    sink.record_event(remedy_core::SessionId::from_string("ses-a"), "session.created", &json!({"x": 1}))
        .await
        .unwrap();
    sink.record_event(remedy_core::SessionId::from_string("ses-a"), "session.failed", &json!({"x": 2}))
        .await
        .unwrap();

    let contents = std::fs::read_to_string(&path).unwrap().replace("\"x\":1", "\"x\":9");
    std::fs::write(&path, contents).unwrap();

    assert!(matches!(verify_chain(&path), Err(AuditError::ChainMismatch { line: 1 })));
}

#[tokio::test]
async fn disabled_sink_writes_nothing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.log");
    let config = AuditConfig { enabled: false, path: path.clone(), ..AuditConfig::default() };
    let sink = AuditSink::new(config, FakeClock::new());

    sink.record_event(remedy_core::SessionId::from_string("ses-a"), "session.created", &json!({}))
        .await
        .unwrap();
    assert!(!path.exists());
}

#[tokio::test]
async fn replication_writes_dated_keys() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.log");
    let replica_root = dir.path().join("replica");
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_700_000_000_000); // 2023-11-14

    let config = AuditConfig {
        enabled: true,
        path,
        replica_bucket: Some("audit-bucket".to_string()),
        replica_prefix: "audit-log/".to_string(),
    };
    let sink = AuditSink::new(config, clock)
        .with_replica(Arc::new(FsObjectStore::new(&replica_root)));

    sink.record_event(remedy_core::SessionId::from_string("ses-a"), "session.created", &json!({}))
        .await
        .unwrap();

    let day_dir = replica_root.join("audit-log/2023/11/14");
    let replicated: Vec<_> = std::fs::read_dir(&day_dir).unwrap().collect();
    assert_eq!(replicated.len(), 1);
}

#[test]
fn canonical_sorts_keys_compactly() {
    let value = json!({"b": 2, "a": {"z": 1, "m": [1, 2]}});
    assert_eq!(canonical(&value), r#"{"a":{"m":[1,2],"z":1},"b":2}"#);
}

#[test]
fn verify_chain_rejects_missing_hash_fields() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.log");
    std::fs::write(&path, "{\"ts\":1}\n").unwrap();
    assert!(matches!(verify_chain(&path), Err(AuditError::ChainMismatch { line: 1 })));
}

#[cfg(unix)]
#[tokio::test]
async fn audit_file_mode_is_0600() {
    use std::os::unix::fs::PermissionsExt;
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.log");
    let sink = sink(&path, &FakeClock::new());
    sink.record_event(remedy_core::SessionId::from_string("ses-a"), "session.created", &json!({}))
        .await
        .unwrap();

    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}
