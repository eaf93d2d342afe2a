// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only hash-chained audit log with optional object-store replication.
//!
//! Each line is a JSON envelope `{ts, session_id, event_type, payload}`
//! extended with `prev_hash` and `hash`, where
//! `hash = SHA-256(prev_hash || canonical(envelope))` and canonical means
//! sorted keys with compact separators. Replaying the file must reproduce
//! the same chain.
//!
//! The local append is required; replication is best-effort and logged.
//! A single async lock serializes writers within the process; across
//! processes each node writes its own file and replication reconciles.

use async_trait::async_trait;
use remedy_core::{Clock, SessionId};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Audit sink failures.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("audit serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("audit chain mismatch at line {line}")]
    ChainMismatch { line: usize },
}

/// Audit configuration, resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditConfig {
    pub enabled: bool,
    pub path: PathBuf,
    /// Replication target name; replication runs only when this is set and
    /// an [`ObjectStore`] is attached.
    pub replica_bucket: Option<String>,
    pub replica_prefix: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("logs/audit.log"),
            replica_bucket: None,
            replica_prefix: "audit-log/".to_string(),
        }
    }
}

impl AuditConfig {
    /// Resolve from `AUDIT_LOG_ENABLED`, `AUDIT_LOG_PATH`,
    /// `AUDIT_LOG_S3_BUCKET`, and `AUDIT_LOG_S3_PREFIX`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: std::env::var("AUDIT_LOG_ENABLED")
                .map(|s| !matches!(s.trim(), "0" | "false" | "False" | "FALSE"))
                .unwrap_or(defaults.enabled),
            path: std::env::var("AUDIT_LOG_PATH").map(PathBuf::from).unwrap_or(defaults.path),
            replica_bucket: std::env::var("AUDIT_LOG_S3_BUCKET").ok().filter(|s| !s.is_empty()),
            replica_prefix: std::env::var("AUDIT_LOG_S3_PREFIX")
                .unwrap_or(defaults.replica_prefix),
        }
    }
}

/// Destination for replicated audit lines. The production deployment binds
/// this to object storage with server-side encryption; tests and single-node
/// setups use [`FsObjectStore`].
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_json(&self, key: &str, body: &str) -> Result<(), String>;
}

/// Filesystem-backed object store: keys become paths under a root directory.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put_json(&self, key: &str, body: &str) -> Result<(), String> {
        let path = self.root.join(key);
        let parent = path.parent().map(Path::to_path_buf);
        let body = body.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), String> {
            if let Some(parent) = parent {
                std::fs::create_dir_all(&parent).map_err(|e| e.to_string())?;
            }
            std::fs::write(&path, body.as_bytes()).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| e.to_string())?
    }
}

struct ChainState {
    last_hash: Option<String>,
    loaded: bool,
}

/// Hash-chained audit sink. One writer per process; the internal lock
/// serializes the chain update.
pub struct AuditSink<C: Clock> {
    config: AuditConfig,
    chain: Mutex<ChainState>,
    replica: Option<Arc<dyn ObjectStore>>,
    clock: C,
}

impl<C: Clock> AuditSink<C> {
    pub fn new(config: AuditConfig, clock: C) -> Self {
        Self {
            config,
            chain: Mutex::new(ChainState { last_hash: None, loaded: false }),
            replica: None,
            clock,
        }
    }

    /// Attach a replication target.
    pub fn with_replica(mut self, replica: Arc<dyn ObjectStore>) -> Self {
        self.replica = Some(replica);
        self
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Persist an immutable audit record for the given event.
    pub async fn record_event(
        &self,
        session_id: SessionId,
        event_type: &str,
        payload: &Value,
    ) -> Result<(), AuditError> {
        if !self.config.enabled {
            return Ok(());
        }

        let ts_ms = self.clock.epoch_ms();
        let envelope = json!({
            "ts": ts_ms,
            "session_id": session_id,
            "event_type": event_type,
            "payload": payload,
        });

        let mut chain = self.chain.lock().await;
        if !chain.loaded {
            chain.last_hash = load_last_hash(&self.config.path);
            chain.loaded = true;
        }

        let prev_hash = chain.last_hash.clone().unwrap_or_default();
        let digest = compute_hash(&prev_hash, &canonical(&envelope));

        let mut line_value = envelope;
        if let Some(map) = line_value.as_object_mut() {
            map.insert("prev_hash".to_string(), Value::String(prev_hash));
            map.insert("hash".to_string(), Value::String(digest.clone()));
        }
        let line = canonical(&line_value);

        // File append runs off the event loop; the chain lock is held so
        // ordering is preserved.
        let path = self.config.path.clone();
        let line_for_append = line.clone();
        tokio::task::spawn_blocking(move || append_line(&path, &line_for_append))
            .await
            .map_err(|e| AuditError::Io(std::io::Error::other(e)))??;
        self.replicate(&line, &digest, ts_ms).await;

        chain.last_hash = Some(digest);
        Ok(())
    }

    /// Best-effort replication under `prefix/YYYY/MM/DD/{hash}.json`.
    async fn replicate(&self, line: &str, digest: &str, ts_ms: u64) {
        let (Some(replica), Some(bucket)) = (&self.replica, &self.config.replica_bucket) else {
            return;
        };
        let date = chrono::DateTime::from_timestamp_millis(ts_ms as i64)
            .unwrap_or_default()
            .format("%Y/%m/%d");
        let prefix = self.config.replica_prefix.trim_end_matches('/');
        let key = format!("{prefix}/{date}/{digest}.json");
        if let Err(error) = replica.put_json(&key, line).await {
            tracing::warn!(%bucket, %key, %error, "audit log replication failed");
        }
    }
}

/// Verify the hash chain of an audit file. Returns the number of lines on
/// success.
pub fn verify_chain(path: impl AsRef<Path>) -> Result<usize, AuditError> {
    let file = std::fs::File::open(path.as_ref())?;
    let reader = BufReader::new(file);
    let mut prev_hash = String::new();
    let mut count = 0;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut value: Value = serde_json::from_str(&line)?;
        let (recorded_prev, recorded_hash) = match value.as_object_mut() {
            Some(map) => {
                let prev = map.remove("prev_hash").and_then(|v| v.as_str().map(String::from));
                let hash = map.remove("hash").and_then(|v| v.as_str().map(String::from));
                (prev, hash)
            }
            None => (None, None),
        };
        let (Some(recorded_prev), Some(recorded_hash)) = (recorded_prev, recorded_hash) else {
            return Err(AuditError::ChainMismatch { line: idx + 1 });
        };

        let expected = compute_hash(&prev_hash, &canonical(&value));
        if recorded_prev != prev_hash || recorded_hash != expected {
            return Err(AuditError::ChainMismatch { line: idx + 1 });
        }
        prev_hash = expected;
        count += 1;
    }
    Ok(count)
}

/// Canonical JSON: object keys sorted, compact separators.
pub fn canonical(value: &Value) -> String {
    fn write_canonical(value: &Value, out: &mut String) {
        match value {
            Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                out.push('{');
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    out.push_str(&serde_json::to_string(key).unwrap_or_default());
                    out.push(':');
                    if let Some(item) = map.get(*key) {
                        write_canonical(item, out);
                    }
                }
                out.push('}');
            }
            Value::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    write_canonical(item, out);
                }
                out.push(']');
            }
            other => out.push_str(&serde_json::to_string(other).unwrap_or_default()),
        }
    }

    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn compute_hash(prev_hash: &str, body: &str) -> String {
    let mut sha = Sha256::new();
    sha.update(prev_hash.as_bytes());
    sha.update(body.as_bytes());
    let digest = sha.finalize();
    let mut hex = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

fn load_last_hash(path: &Path) -> Option<String> {
    let file = std::fs::File::open(path).ok()?;
    let reader = BufReader::new(file);
    let mut last_line: Option<String> = None;
    for line in reader.lines() {
        let line = line.ok()?;
        if !line.trim().is_empty() {
            last_line = Some(line);
        }
    }
    let parsed: Value = serde_json::from_str(&last_line?).ok()?;
    parsed.get("hash").and_then(|h| h.as_str()).map(String::from)
}

fn append_line(path: &Path, line: &str) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let is_new = !path.exists();
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    file.write_all(b"\n")?;
    #[cfg(unix)]
    if is_new {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    Ok(())
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
