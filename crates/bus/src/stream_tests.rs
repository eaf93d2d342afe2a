// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[tokio::test]
async fn publish_returns_increasing_ids() {
    let bus = MemoryBus::new();
    let a = bus.publish("s", &json!({"n": 1}), None, true).await.unwrap();
    let b = bus.publish("s", &json!({"n": 2}), None, true).await.unwrap();
    let c = bus.publish("s", &json!({"n": 3}), None, true).await.unwrap();
    assert!(a < b && b < c);
}

#[tokio::test]
async fn read_is_monotonic_from_cursor() {
    let bus = MemoryBus::new();
    let first = bus.publish("s", &json!({"n": 1}), None, true).await.unwrap();
    bus.publish("s", &json!({"n": 2}), None, true).await.unwrap();
    bus.publish("s", &json!({"n": 3}), None, true).await.unwrap();

    let entries = bus.read("s", first, 10, None).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].payload["n"], 2);
    assert_eq!(entries[1].payload["n"], 3);

    let from_zero = bus.read("s", StreamId::ZERO, 10, None).await.unwrap();
    assert_eq!(from_zero.len(), 3);
}

#[tokio::test]
async fn read_respects_count() {
    let bus = MemoryBus::new();
    for n in 0..5 {
        bus.publish("s", &json!({"n": n}), None, true).await.unwrap();
    }
    let entries = bus.read("s", StreamId::ZERO, 2, None).await.unwrap();
    assert_eq!(entries.len(), 2);
}

#[tokio::test]
async fn maxlen_trims_oldest() {
    let bus = MemoryBus::new();
    for n in 0..10 {
        bus.publish("s", &json!({"n": n}), Some(3), true).await.unwrap();
    }
    assert_eq!(bus.len("s"), 3);
    let entries = bus.read("s", StreamId::ZERO, 10, None).await.unwrap();
    assert_eq!(entries[0].payload["n"], 7);
}

#[tokio::test]
async fn ensure_group_is_idempotent() {
    let bus = MemoryBus::new();
    bus.ensure_group("s", "orchestrator").await.unwrap();
    bus.ensure_group("s", "orchestrator").await.unwrap();
}

#[tokio::test]
async fn read_group_delivers_each_entry_once() {
    let bus = MemoryBus::new();
    bus.ensure_group("s", "g").await.unwrap();
    bus.publish("s", &json!({"n": 1}), None, true).await.unwrap();
    bus.publish("s", &json!({"n": 2}), None, true).await.unwrap();

    let first = bus.read_group("s", "g", "c1", 1, None).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].payload["n"], 1);

    let second = bus.read_group("s", "g", "c2", 10, None).await.unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].payload["n"], 2);

    let drained = bus.read_group("s", "g", "c1", 10, None).await.unwrap();
    assert!(drained.is_empty());
}

#[tokio::test]
async fn ack_clears_pending() {
    let bus = MemoryBus::new();
    bus.ensure_group("s", "g").await.unwrap();
    let id = bus.publish("s", &json!({}), None, true).await.unwrap();
    let delivered = bus.read_group("s", "g", "c", 10, None).await.unwrap();
    assert_eq!(delivered[0].id, id);

    assert_eq!(bus.ack("s", "g", &[id]).await.unwrap(), 1);
    assert_eq!(bus.ack("s", "g", &[id]).await.unwrap(), 0);
}

#[tokio::test]
async fn read_group_without_group_is_an_error() {
    let bus = MemoryBus::new();
    bus.publish("s", &json!({}), None, true).await.unwrap();
    let result = bus.read_group("s", "missing", "c", 1, None).await;
    assert!(matches!(result, Err(BusError::UnknownGroup { .. })));
}

#[tokio::test]
async fn delete_removes_entries() {
    let bus = MemoryBus::new();
    let a = bus.publish("s", &json!({"n": 1}), None, true).await.unwrap();
    bus.publish("s", &json!({"n": 2}), None, true).await.unwrap();

    assert_eq!(bus.delete("s", &[a]).await.unwrap(), 1);
    assert_eq!(bus.len("s"), 1);
    assert_eq!(bus.delete("s", &[a]).await.unwrap(), 0);
}

#[tokio::test]
async fn blocking_read_wakes_on_publish() {
    let bus = MemoryBus::new();
    let reader = {
        let bus = bus.clone();
        tokio::spawn(async move {
            bus.read("s", StreamId::ZERO, 10, Some(Duration::from_secs(5))).await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    bus.publish("s", &json!({"n": 1}), None, true).await.unwrap();

    let entries = reader.await.unwrap().unwrap();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn blocking_read_times_out_empty() {
    let bus = MemoryBus::new();
    let entries =
        bus.read("s", StreamId::ZERO, 10, Some(Duration::from_millis(30))).await.unwrap();
    assert!(entries.is_empty());
}

#[test]
fn stream_id_parse_roundtrip() {
    let id = StreamId::new(1700, 4);
    let parsed: StreamId = id.to_string().parse().unwrap();
    assert_eq!(parsed, id);
    assert!("not-an-id".parse::<StreamId>().is_err());
    assert!("12".parse::<StreamId>().is_err());
}
