// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redaction of secret material from command output and metadata trees.
//!
//! Two surfaces exist: [`redact_secrets`] masks `key=value` shaped secrets in
//! free text before persistence, and [`sanitize_value`] produces a redacted
//! deep copy of structured metadata for every outbound event payload.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static TEXT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)(password|passwd|pwd)\s*[:=]\s*\S+").expect("constant regex is valid"),
        Regex::new(r"(?i)(api[_-]?key|token)\s*[:=]\s*\S+").expect("constant regex is valid"),
        Regex::new(r"(?i)(secret)\s*[:=]\s*\S+").expect("constant regex is valid"),
    ]
});

/// Keys whose values are always masked, regardless of substring matches.
const SENSITIVE_EXACT: &[&str] = &[
    "password",
    "secret",
    "token",
    "api_key",
    "access_key",
    "secret_key",
    "session_token",
    "private_key",
    "client_secret",
    "ssh_key",
    "key_material",
    "tls_key",
    "encryption_key",
    "key",
    "passphrase",
];

const SENSITIVE_FRAGMENTS: &[&str] = &["password", "secret", "token", "passphrase"];

/// Mask `password=...` / `api_key: ...` style tokens in free text.
pub fn redact_secrets(text: &str) -> String {
    let mut redacted = text.to_string();
    for pattern in TEXT_PATTERNS.iter() {
        redacted = pattern.replace_all(&redacted, "[REDACTED]").into_owned();
    }
    redacted
}

/// True when a metadata key names secret material.
pub fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    if SENSITIVE_EXACT.contains(&lower.as_str()) {
        return true;
    }
    SENSITIVE_FRAGMENTS.iter().any(|fragment| lower.contains(fragment))
}

/// Produce a redacted deep copy: every sensitive key maps to the literal
/// string `***`, recursively through objects and arrays.
pub fn sanitize_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, item) in map {
                if is_sensitive_key(key) {
                    out.insert(key.clone(), Value::String("***".to_string()));
                } else {
                    out.insert(key.clone(), sanitize_value(item));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize_value).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
#[path = "redact_tests.rs"]
mod tests;
