// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution session and step state machine.

use crate::credential::CredentialId;
use crate::runbook::RunbookId;
use crate::tenant::TenantId;
use crate::ticket::TicketId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

crate::define_id! {
    /// Unique identifier for an execution session.
    pub struct SessionId("ses-");
}

crate::define_id! {
    /// Unique identifier for a worker assignment.
    pub struct AssignmentId("asn-");
}

/// Session lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    InProgress,
    WaitingApproval,
    Paused,
    Completed,
    Failed,
    Abandoned,
    RolledBack,
}

crate::simple_display! {
    SessionStatus {
        Pending => "pending",
        InProgress => "in_progress",
        WaitingApproval => "waiting_approval",
        Paused => "paused",
        Completed => "completed",
        Failed => "failed",
        Abandoned => "abandoned",
        RolledBack => "rolled_back",
    }
}

impl SessionStatus {
    /// Terminal sessions admit no further step mutation.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Completed
                | SessionStatus::Failed
                | SessionStatus::Abandoned
                | SessionStatus::RolledBack
        )
    }
}

/// Authoring severity declared on a runbook step. Free-form author strings
/// go through [`Severity::parse`]; unknown values map to `Unspecified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Dangerous,
    Moderate,
    Low,
    Safe,
    Unspecified,
}

crate::simple_display! {
    Severity {
        Critical => "critical",
        High => "high",
        Dangerous => "dangerous",
        Moderate => "moderate",
        Low => "low",
        Safe => "safe",
        Unspecified => "unspecified",
    }
}

impl Severity {
    /// Case-insensitive parse; unknown values map to `Unspecified`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "dangerous" => Severity::Dangerous,
            "moderate" => Severity::Moderate,
            "low" => Severity::Low,
            "safe" => Severity::Safe,
            _ => Severity::Unspecified,
        }
    }
}

/// Potential damage hint derived from step severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlastRadius {
    Low,
    Medium,
    High,
}

crate::simple_display! {
    BlastRadius {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

impl BlastRadius {
    pub fn rank(&self) -> u8 {
        match self {
            BlastRadius::Low => 0,
            BlastRadius::Medium => 1,
            BlastRadius::High => 2,
        }
    }
}

/// Named risk tier capping permissible blast radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SandboxProfile {
    #[serde(rename = "default")]
    Default,
    #[serde(rename = "dev-flex")]
    DevFlex,
    #[serde(rename = "staging-standard")]
    StagingStandard,
    #[serde(rename = "prod-standard")]
    ProdStandard,
    #[serde(rename = "prod-critical")]
    ProdCritical,
}

crate::simple_display! {
    SandboxProfile {
        Default => "default",
        DevFlex => "dev-flex",
        StagingStandard => "staging-standard",
        ProdStandard => "prod-standard",
        ProdCritical => "prod-critical",
    }
}

impl SandboxProfile {
    /// Rank used when taking the session-wide maximum across steps.
    pub fn rank(&self) -> u8 {
        match self {
            SandboxProfile::Default | SandboxProfile::DevFlex => 0,
            SandboxProfile::StagingStandard => 1,
            SandboxProfile::ProdStandard => 2,
            SandboxProfile::ProdCritical => 3,
        }
    }

    /// Highest blast radius a step may carry under this profile.
    pub fn max_blast_radius(&self) -> BlastRadius {
        match self {
            SandboxProfile::Default | SandboxProfile::DevFlex => BlastRadius::Low,
            SandboxProfile::StagingStandard | SandboxProfile::ProdStandard => BlastRadius::Medium,
            SandboxProfile::ProdCritical => BlastRadius::High,
        }
    }

    /// Severity → (profile, blast radius) authoring table.
    pub fn for_severity(severity: Severity) -> (SandboxProfile, BlastRadius) {
        match severity {
            Severity::Critical => (SandboxProfile::ProdCritical, BlastRadius::High),
            Severity::High | Severity::Dangerous => {
                (SandboxProfile::ProdStandard, BlastRadius::Medium)
            }
            Severity::Moderate => (SandboxProfile::StagingStandard, BlastRadius::Medium),
            Severity::Low | Severity::Safe | Severity::Unspecified => {
                (SandboxProfile::DevFlex, BlastRadius::Low)
            }
        }
    }
}

/// Runbook phase a step belongs to. Steps are ordered: all prechecks, then
/// mains, then postchecks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    Precheck,
    Main,
    Postcheck,
}

crate::simple_display! {
    StepType {
        Precheck => "precheck",
        Main => "main",
        Postcheck => "postcheck",
    }
}

impl StepType {
    /// Case-insensitive parse; returns `None` for unknown phases.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "precheck" => Some(StepType::Precheck),
            "main" => Some(StepType::Main),
            "postcheck" => Some(StepType::Postcheck),
            _ => None,
        }
    }
}

/// A single planned step within a session. Step numbers are 1-based and
/// dense within the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub step_number: u32,
    pub step_type: StepType,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_command: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requires_approval: bool,
    pub severity: Severity,
    pub blast_radius: BlastRadius,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    /// Redacted stdout from the connector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Redacted stderr / failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Operator notes from manual step updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credentials_used: Vec<CredentialId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
}

impl ExecutionStep {
    /// A rollback command that is present and non-blank.
    pub fn rollback(&self) -> Option<&str> {
        self.rollback_command.as_deref().filter(|c| !c.trim().is_empty())
    }
}

/// Operator feedback attached when a session is explicitly completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFeedback {
    pub was_successful: bool,
    pub issue_resolved: bool,
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<String>,
    pub recorded_at_ms: u64,
}

/// One execution attempt of one runbook: a linear plan plus a state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSession {
    pub id: SessionId,
    pub tenant_id: TenantId,
    pub runbook_id: RunbookId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<TicketId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_description: Option<String>,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<u32>,
    pub total_steps: u32,
    #[serde(default)]
    pub waiting_for_approval: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_step_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport_channel: Option<String>,
    pub sandbox_profile: SandboxProfile,
    #[serde(default)]
    pub assignment_retry_count: u32,
    /// Stream id of the most recently published session event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_event_seq: Option<String>,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration_minutes: Option<u64>,
    /// Status to restore on resume; set only while paused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_status: Option<SessionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<SessionFeedback>,
    /// Linear plan, ordered by step_number (dense 1..N).
    #[serde(default)]
    pub steps: Vec<ExecutionStep>,
}

impl ExecutionSession {
    /// Check if the session is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Look up a step by its 1-based number.
    pub fn step(&self, step_number: u32) -> Option<&ExecutionStep> {
        step_number
            .checked_sub(1)
            .and_then(|idx| self.steps.get(idx as usize))
            .filter(|s| s.step_number == step_number)
    }

    /// Mutable step lookup by 1-based number.
    pub fn step_mut(&mut self, step_number: u32) -> Option<&mut ExecutionStep> {
        step_number
            .checked_sub(1)
            .and_then(|idx| self.steps.get_mut(idx as usize))
            .filter(|s| s.step_number == step_number)
    }

    /// The next not-completed step after `step_number`, if any.
    pub fn next_pending_step(&self, step_number: u32) -> Option<&ExecutionStep> {
        self.step(step_number + 1).filter(|s| !s.completed)
    }
}

/// Handoff of a session to a worker, published on the assign stream.
/// Multiple assignments per session are permitted; the latest defines the
/// current assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerAssignment {
    pub id: AssignmentId,
    pub session_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,
    pub status: AssignmentStatus,
    /// Metadata snapshot delivered to the worker.
    #[serde(default)]
    pub details: Value,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at_ms: Option<u64>,
}

/// Assignment lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Pending,
    Acknowledged,
    Failed,
    Cancelled,
}

crate::simple_display! {
    AssignmentStatus {
        Pending => "pending",
        Acknowledged => "acknowledged",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

crate::builder! {
    pub struct StepBuilder => ExecutionStep {
        into {
            command: String = "echo ok",
            description: String = "",
        }
        set {
            step_number: u32 = 1,
            step_type: StepType = StepType::Main,
            requires_approval: bool = false,
            severity: Severity = Severity::Low,
            blast_radius: BlastRadius = BlastRadius::Low,
            completed: bool = false,
            credentials_used: Vec<CredentialId> = Vec::new(),
        }
        option {
            rollback_command: String = None,
            success: bool = None,
            output: String = None,
            error: String = None,
            notes: String = None,
            approved: bool = None,
            approved_by: String = None,
            approved_at_ms: u64 = None,
            completed_at_ms: u64 = None,
        }
    }
}

crate::builder! {
    pub struct SessionBuilder => ExecutionSession {
        set {
            id: SessionId = SessionId::from_string("ses-test"),
            tenant_id: TenantId = TenantId::from_string("tnt-test"),
            runbook_id: RunbookId = RunbookId::from_string("rbk-test"),
            status: SessionStatus = SessionStatus::Pending,
            total_steps: u32 = 0,
            waiting_for_approval: bool = false,
            sandbox_profile: SandboxProfile = SandboxProfile::DevFlex,
            assignment_retry_count: u32 = 0,
            created_at_ms: u64 = 1_000_000,
            steps: Vec<ExecutionStep> = Vec::new(),
        }
        option {
            ticket_id: TicketId = None,
            user_id: String = None,
            issue_description: String = None,
            current_step: u32 = None,
            approval_step_number: u32 = None,
            transport_channel: String = None,
            last_event_seq: String = None,
            started_at_ms: u64 = None,
            completed_at_ms: u64 = None,
            total_duration_minutes: u64 = None,
            paused_status: SessionStatus = None,
            feedback: SessionFeedback = None,
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
