// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! remedy-storage: durable state for the orchestration core.
//!
//! State is event-sourced: typed [`remedy_core::Event`]s are appended to a
//! write-ahead log and folded into a [`MaterializedState`]. Replaying the WAL
//! reproduces the state after a restart. The hash-chained audit sink lives
//! here as well.

pub mod audit;
pub mod state;
pub mod wal;

pub use audit::{
    canonical, verify_chain, AuditConfig, AuditError, AuditSink, FsObjectStore, ObjectStore,
};
pub use state::MaterializedState;
pub use wal::{Wal, WalEntry, WalError};
