// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! remedy-core: Core domain library for the Remedy remediation orchestrator

pub mod macros;

pub mod clock;
pub mod credential;
pub mod error;
pub mod event;
pub mod id;
pub mod metrics;
pub mod redact;
pub mod runbook;
pub mod session;
pub mod tenant;
pub mod ticket;
pub mod worker;

pub use clock::{iso8601_utc, Clock, FakeClock, SystemClock};
pub use credential::{Credential, CredentialId};
pub use error::{CoreError, ErrorEnvelope};
pub use event::{Event, EventEnvelope, ExecutionEvent, SessionEventKind};
pub use id::{short, IdBuf};
pub use metrics::{HistogramValue, Metrics};
pub use redact::{is_sensitive_key, redact_secrets, sanitize_value};
pub use runbook::{RunbookId, RunbookRecord, RunbookStatus};
pub use session::{
    AssignmentId, AssignmentStatus, BlastRadius, ExecutionSession, ExecutionStep, SandboxProfile,
    SessionFeedback, SessionId, SessionStatus, Severity, StepType, WorkerAssignment,
};
pub use tenant::{Tenant, TenantId};
pub use ticket::{
    ConnectionId, SyncStatus, Ticket, TicketId, TicketStatus, TicketingConnection,
};
pub use worker::{WorkerId, WorkerState};
