// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Linear step-plan construction from a parsed runbook.
//!
//! Steps are concatenated in phase order (prechecks, mains, postchecks) and
//! numbered densely from 1. The session sandbox profile is the maximum rank
//! across all steps; a step whose blast radius exceeds what the profile
//! permits is a construction-time error.

use crate::parser::ParsedRunbook;
use remedy_core::session::{BlastRadius, ExecutionStep, SandboxProfile, Severity, StepType};
use thiserror::Error;

/// Plan construction failures.
#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error(
        "step {step_number} blast radius {radius} exceeds sandbox profile {profile} allowance"
    )]
    SandboxViolation { step_number: u32, radius: BlastRadius, profile: SandboxProfile },

    #[error("runbook defines no executable steps")]
    Empty,
}

/// A validated linear plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub steps: Vec<ExecutionStep>,
    pub sandbox_profile: SandboxProfile,
}

impl Plan {
    pub fn total_steps(&self) -> u32 {
        self.steps.len() as u32
    }
}

/// One item flowing into the plan, regardless of source phase.
struct Item<'a> {
    step_type: StepType,
    command: &'a str,
    description: &'a str,
    severity: Option<&'a str>,
    requires_approval: bool,
    rollback_command: Option<&'a str>,
}

/// Build the execution plan for a parsed runbook.
pub fn build_plan(parsed: &ParsedRunbook) -> Result<Plan, PlanError> {
    if parsed.is_empty() {
        return Err(PlanError::Empty);
    }

    let items = parsed
        .prechecks
        .iter()
        .map(|c| Item {
            step_type: StepType::Precheck,
            command: &c.command,
            description: &c.description,
            severity: c.severity.as_deref(),
            requires_approval: c.requires_approval,
            rollback_command: c.rollback_command.as_deref(),
        })
        .chain(parsed.main_steps.iter().map(|s| Item {
            step_type: StepType::Main,
            command: &s.command,
            description: &s.description,
            severity: s.severity.as_deref(),
            requires_approval: s.requires_approval,
            rollback_command: s.rollback_command.as_deref(),
        }))
        .chain(parsed.postchecks.iter().map(|c| Item {
            step_type: StepType::Postcheck,
            command: &c.command,
            description: &c.description,
            severity: c.severity.as_deref(),
            requires_approval: c.requires_approval,
            rollback_command: c.rollback_command.as_deref(),
        }));

    let mut steps = Vec::with_capacity(parsed.len());
    let mut profile = SandboxProfile::DevFlex;

    for (idx, item) in items.enumerate() {
        let severity = Severity::parse(item.severity.unwrap_or(""));
        let (step_profile, blast_radius) = SandboxProfile::for_severity(severity);
        if step_profile.rank() > profile.rank() {
            profile = step_profile;
        }
        steps.push(ExecutionStep {
            step_number: idx as u32 + 1,
            step_type: item.step_type,
            command: item.command.to_string(),
            rollback_command: item
                .rollback_command
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            description: item.description.to_string(),
            requires_approval: item.requires_approval,
            severity,
            blast_radius,
            completed: false,
            success: None,
            output: None,
            error: None,
            notes: None,
            credentials_used: Vec::new(),
            approved: None,
            approved_by: None,
            approved_at_ms: None,
            completed_at_ms: None,
        });
    }

    for step in &steps {
        if step.blast_radius.rank() > profile.max_blast_radius().rank() {
            return Err(PlanError::SandboxViolation {
                step_number: step.step_number,
                radius: step.blast_radius,
                profile,
            });
        }
    }

    Ok(Plan { steps, sandbox_profile: profile })
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
