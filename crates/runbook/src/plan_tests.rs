// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::parser::parse_runbook;
use remedy_core::session::{SandboxProfile, StepType};

const BODY: &str = r#"```yaml
title: demo
prechecks:
  - description: check
    command: echo A
steps:
  - name: work
    command: echo B
    severity: moderate
    rollback: echo undo-B
postchecks:
  - description: verify
    command: echo C
```"#;

#[test]
fn steps_are_dense_and_phase_ordered() {
    let plan = build_plan(&parse_runbook(BODY)).unwrap();

    assert_eq!(plan.total_steps(), 3);
    let numbers: Vec<u32> = plan.steps.iter().map(|s| s.step_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(plan.steps[0].step_type, StepType::Precheck);
    assert_eq!(plan.steps[1].step_type, StepType::Main);
    assert_eq!(plan.steps[2].step_type, StepType::Postcheck);
    assert_eq!(plan.steps[1].rollback_command.as_deref(), Some("echo undo-B"));
}

#[test]
fn profile_is_maximum_across_steps() {
    let body = r#"```yaml
steps:
  - name: benign
    command: echo hi
    severity: low
  - name: scary
    command: rm -rf /var/cache/app
    severity: critical
```"#;
    let plan = build_plan(&parse_runbook(body)).unwrap();
    assert_eq!(plan.sandbox_profile, SandboxProfile::ProdCritical);
}

#[test]
fn all_low_steps_stay_dev_flex() {
    let body = "```yaml\nsteps:\n  - name: a\n    command: echo a\n    severity: low\n```";
    let plan = build_plan(&parse_runbook(body)).unwrap();
    assert_eq!(plan.sandbox_profile, SandboxProfile::DevFlex);
}

#[test]
fn severity_maps_onto_blast_radius() {
    let body = r#"```yaml
steps:
  - name: a
    command: echo a
    severity: high
```"#;
    let plan = build_plan(&parse_runbook(body)).unwrap();
    assert_eq!(plan.sandbox_profile, SandboxProfile::ProdStandard);
    assert_eq!(plan.steps[0].blast_radius, remedy_core::session::BlastRadius::Medium);
}

#[test]
fn empty_parse_is_rejected() {
    let parsed = ParsedRunbook::default();
    assert_eq!(build_plan(&parsed), Err(PlanError::Empty));
}

#[test]
fn requires_approval_carries_through() {
    let body = r#"```yaml
steps:
  - name: gated
    command: systemctl stop app
    severity: dangerous
    requires_approval: true
```"#;
    let plan = build_plan(&parse_runbook(body)).unwrap();
    assert!(plan.steps[0].requires_approval);
}
