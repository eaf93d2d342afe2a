// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! remedy-bus: append-only stream bus with consumer groups, plus the
//! idempotency store used to give publishes at-most-once semantics.

pub mod env;
pub mod idempotency;
pub mod stream;

pub use env::StreamConfig;
pub use idempotency::{
    IdempotencyStore, MemoryIdempotencyStore, PENDING_MARKER, SCOPE_SESSION_ASSIGN,
    SCOPE_SESSION_COMMAND, SCOPE_SESSION_CREATE,
};
pub use stream::{BusError, MemoryBus, StreamBus, StreamEntry, StreamId};
