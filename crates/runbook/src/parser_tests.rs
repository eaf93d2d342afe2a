// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const FENCED: &str = r#"# Restart app service

Some prose about the incident.

```yaml
title: Restart app service
service: app
env: prod
risk: medium
prechecks:
  - description: check service state
    command: systemctl status app
    expected_output: active
steps:
  - name: restart
    command: systemctl restart app
    description: restart the service
    severity: moderate
    rollback: systemctl start app
  - name: verify restart
    command: systemctl is-active app
    severity: safe
postchecks:
  - description: confirm healthy
    command: curl -fsS localhost:8080/health
```
"#;

#[test]
fn parses_fenced_yaml() {
    let parsed = parse_runbook(FENCED);

    assert_eq!(parsed.prechecks.len(), 1);
    assert_eq!(parsed.main_steps.len(), 2);
    assert_eq!(parsed.postchecks.len(), 1);
    assert_eq!(parsed.prechecks[0].command, "systemctl status app");
    assert_eq!(parsed.main_steps[0].rollback_command.as_deref(), Some("systemctl start app"));
    assert_eq!(parsed.main_steps[0].severity.as_deref(), Some("moderate"));
    assert_eq!(parsed.metadata.get("title").map(String::as_str), Some("Restart app service"));
    assert_eq!(parsed.metadata.get("service").map(String::as_str), Some("app"));
}

#[test]
fn parses_raw_yaml_without_fence() {
    let body = "title: raw\nsteps:\n  - name: one\n    command: echo raw\n";
    let parsed = parse_runbook(body);
    assert_eq!(parsed.main_steps.len(), 1);
    assert_eq!(parsed.main_steps[0].command, "echo raw");
}

#[test]
fn markdown_fallback_scrapes_bash_blocks() {
    let body = "## Troubleshooting\n\n```bash\ndf -h\nsystemctl restart app\n```\n";
    let parsed = parse_runbook(body);

    assert_eq!(parsed.main_steps.len(), 2);
    assert_eq!(parsed.main_steps[0].command, "df -h");
    assert_eq!(parsed.main_steps[1].command, "systemctl restart app");
    assert_eq!(parsed.main_steps[0].severity.as_deref(), Some("moderate"));
    assert!(parsed.prechecks.is_empty());
}

#[test]
fn markdown_fallback_reads_step_sections() {
    let body = "\
### Step 1: Check disk
Inspect usage first.
### Step 2: Clear tmp
```bash
rm -rf /tmp/cache
```
";
    // Only the section with a bash fence yields a command; fences outside
    // sections take priority and there are none here.
    let parsed = parse_runbook(body);
    assert_eq!(parsed.main_steps.len(), 1);
    assert_eq!(parsed.main_steps[0].command, "rm -rf /tmp/cache");
}

#[test]
fn unparseable_body_degrades_to_placeholder() {
    let parsed = parse_runbook("just prose, nothing runnable");
    assert_eq!(parsed.main_steps.len(), 1);
    assert_eq!(parsed.main_steps[0].step_type, "manual");
    assert!(parsed.main_steps[0].command.contains("No commands found"));
}

#[test]
fn fenced_yaml_with_no_steps_falls_back() {
    let body = "```yaml\ntitle: empty\n```\n\n```bash\nuptime\n```\n";
    let parsed = parse_runbook(body);
    assert_eq!(parsed.main_steps.len(), 1);
    assert_eq!(parsed.main_steps[0].command, "uptime");
}

#[test]
fn broken_yaml_falls_back() {
    let body = "```yaml\nsteps: [unclosed\n```\n\n```bash\nuptime\n```\n";
    let parsed = parse_runbook(body);
    assert_eq!(parsed.main_steps.len(), 1);
    assert_eq!(parsed.main_steps[0].command, "uptime");
}
