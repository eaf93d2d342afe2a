// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[yare::parameterized(
    password_eq = { "password=hunter2", "[REDACTED]" },
    password_colon = { "password: hunter2", "[REDACTED]" },
    pwd = { "PWD=abc", "[REDACTED]" },
    api_key = { "api_key=xyz", "[REDACTED]" },
    api_dash_key = { "API-KEY: xyz", "[REDACTED]" },
    token = { "token=tok123", "[REDACTED]" },
    secret = { "secret=shh", "[REDACTED]" },
)]
fn text_patterns_are_masked(input: &str, expected: &str) {
    assert_eq!(redact_secrets(input), expected);
}

#[test]
fn surrounding_text_is_preserved() {
    let out = redact_secrets("connecting with password=hunter2 to host");
    assert_eq!(out, "connecting with [REDACTED] to host");
}

#[test]
fn plain_text_is_untouched() {
    let input = "service restarted cleanly";
    assert_eq!(redact_secrets(input), input);
}

#[yare::parameterized(
    exact_password = { "password", true },
    exact_key = { "key", true },
    fragment_token = { "refresh_token", true },
    fragment_passphrase = { "old_passphrase", true },
    mixed_case = { "Client_Secret", true },
    plain = { "hostname", false },
    port = { "port", false },
)]
fn sensitive_key_detection(key: &str, sensitive: bool) {
    assert_eq!(is_sensitive_key(key), sensitive);
}

#[test]
fn sanitize_masks_nested_trees() {
    let value = json!({
        "connection": {"host": "db1", "password": "hunter2"},
        "credentials": {"api_key": "k", "username": "svc"},
        "targets": [{"ssh_key": "PRIVATE", "name": "web1"}],
    });

    let sanitized = sanitize_value(&value);
    assert_eq!(sanitized["connection"]["password"], "***");
    assert_eq!(sanitized["connection"]["host"], "db1");
    assert_eq!(sanitized["credentials"]["api_key"], "***");
    assert_eq!(sanitized["credentials"]["username"], "svc");
    assert_eq!(sanitized["targets"][0]["ssh_key"], "***");
    assert_eq!(sanitized["targets"][0]["name"], "web1");
}

#[test]
fn sanitize_leaves_original_untouched() {
    let value = json!({"token": "abc"});
    let _ = sanitize_value(&value);
    assert_eq!(value["token"], "abc");
}

#[test]
fn sanitize_no_original_value_survives() {
    let value = json!({
        "outer": {"session_token": "tok-secret", "inner": {"encryption_key": "km"}}
    });
    let sanitized = sanitize_value(&value).to_string();
    assert!(!sanitized.contains("tok-secret"));
    assert!(!sanitized.contains("km"));
}
