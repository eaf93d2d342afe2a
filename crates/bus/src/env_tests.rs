// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn clear_env() {
    for key in [
        "REDIS_STREAM_ASSIGN",
        "REDIS_STREAM_COMMAND",
        "REDIS_STREAM_RESULT",
        "REDIS_STREAM_EVENTS",
        "REDIS_STREAM_DEAD_LETTER",
        "REDIS_CONSUMER_GROUP_ORCHESTRATOR",
        "REDIS_DEFAULT_MAXLEN",
        "WORKER_ORCHESTRATION_ENABLED",
        "IDEMPOTENCY_TTL_SECONDS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn defaults_match_contract() {
    clear_env();
    let config = StreamConfig::from_env();
    assert_eq!(config.assign, "session.assign");
    assert_eq!(config.command, "session.command");
    assert_eq!(config.result, "session.result");
    assert_eq!(config.events, "session.events");
    assert_eq!(config.dead_letter, "session.deadletter");
    assert_eq!(config.orchestrator_group, "orchestrator");
    assert_eq!(config.default_maxlen, 10_000);
    assert!(config.orchestration_enabled);
}

#[test]
#[serial]
fn env_overrides_apply() {
    clear_env();
    std::env::set_var("REDIS_STREAM_EVENTS", "custom.events");
    std::env::set_var("REDIS_DEFAULT_MAXLEN", "500");
    std::env::set_var("WORKER_ORCHESTRATION_ENABLED", "false");

    let config = StreamConfig::from_env();
    assert_eq!(config.events, "custom.events");
    assert_eq!(config.default_maxlen, 500);
    assert!(!config.orchestration_enabled);
    clear_env();
}

#[test]
#[serial]
fn ttl_default_and_floor() {
    clear_env();
    assert_eq!(idempotency_ttl(), Duration::from_secs(86_400));

    std::env::set_var("IDEMPOTENCY_TTL_SECONDS", "5");
    assert_eq!(idempotency_ttl(), Duration::from_secs(60));

    std::env::set_var("IDEMPOTENCY_TTL_SECONDS", "7200");
    assert_eq!(idempotency_ttl(), Duration::from_secs(7200));
    clear_env();
}

#[test]
fn all_streams_lists_five() {
    let config = StreamConfig::default();
    assert_eq!(config.all_streams().len(), 5);
}
