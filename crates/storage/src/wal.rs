// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only write-ahead log of state-mutation events.
//!
//! Entries are JSON lines `{"seq": N, "event": {...}}`. The WAL is the source
//! of truth for restart recovery: on open the existing entries are loaded and
//! can be replayed into a fresh [`crate::MaterializedState`].

use remedy_core::Event;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// WAL failures.
#[derive(Debug, Error)]
pub enum WalError {
    #[error("wal io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wal entry malformed at line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("wal serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A single WAL record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    pub seq: u64,
    pub event: Event,
}

/// Append-only event log backed by a JSON-lines file.
pub struct Wal {
    path: PathBuf,
    writer: BufWriter<File>,
    entries: Vec<WalEntry>,
    write_seq: u64,
    processed_seq: u64,
}

impl Wal {
    /// Open (or create) the WAL at `path`. `processed_seq` marks entries
    /// already folded into a snapshot; `next_unprocessed` starts after it.
    pub fn open(path: impl AsRef<Path>, processed_seq: u64) -> Result<Self, WalError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut entries = Vec::new();
        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            for (idx, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let entry: WalEntry = serde_json::from_str(&line)
                    .map_err(|source| WalError::Malformed { line: idx + 1, source })?;
                entries.push(entry);
            }
        }

        let write_seq = entries.last().map(|e| e.seq).unwrap_or(0);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            entries,
            write_seq,
            processed_seq,
        })
    }

    /// Append an event, returning its sequence number. Call [`Wal::flush`]
    /// to make the write durable.
    pub fn append(&mut self, event: &Event) -> Result<u64, WalError> {
        let seq = self.write_seq + 1;
        let entry = WalEntry { seq, event: event.clone() };
        let line = serde_json::to_string(&entry)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.write_seq = seq;
        self.entries.push(entry);
        Ok(seq)
    }

    /// Flush buffered writes to disk.
    pub fn flush(&mut self) -> Result<(), WalError> {
        self.writer.flush()?;
        Ok(())
    }

    /// The next entry after `processed_seq`, if any. Does not advance the
    /// processed cursor; call [`Wal::mark_processed`] once applied.
    pub fn next_unprocessed(&mut self) -> Result<Option<WalEntry>, WalError> {
        // Entries are seq-ordered, so the cursor is a partition point.
        let idx = self.entries.partition_point(|e| e.seq <= self.processed_seq);
        Ok(self.entries.get(idx).cloned())
    }

    /// Record that everything up to `seq` has been applied.
    pub fn mark_processed(&mut self, seq: u64) {
        self.processed_seq = self.processed_seq.max(seq);
    }

    /// All entries with seq greater than `seq`, in order.
    pub fn entries_after(&self, seq: u64) -> Result<Vec<WalEntry>, WalError> {
        Ok(self.entries.iter().filter(|e| e.seq > seq).cloned().collect())
    }

    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    pub fn processed_seq(&self) -> u64 {
        self.processed_seq
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fold every unprocessed entry into `state`, advancing the cursor.
    pub fn replay_into(
        &mut self,
        state: &mut crate::MaterializedState,
    ) -> Result<usize, WalError> {
        let mut applied = 0;
        while let Some(entry) = self.next_unprocessed()? {
            state.apply_event(&entry.event);
            self.mark_processed(entry.seq);
            applied += 1;
        }
        Ok(applied)
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
