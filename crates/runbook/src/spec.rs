// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Serde types for the runbook YAML document.

use serde::{Deserialize, Serialize};

/// A precheck or postcheck item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckSpec {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub expected_output: String,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default, alias = "rollback")]
    pub rollback_command: Option<String>,
}

/// A main step in a runbook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepSpec {
    #[serde(default)]
    pub name: String,
    /// "command", "manual", or "prompt"; only command steps carry a shell line.
    #[serde(default = "default_step_type", rename = "type")]
    pub step_type: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub expected_output: String,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default, alias = "rollback")]
    pub rollback_command: Option<String>,
    #[serde(default)]
    pub timeout: Option<u64>,
}

fn default_step_type() -> String {
    "command".to_string()
}

/// The complete runbook YAML document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunbookSpec {
    #[serde(default)]
    pub runbook_id: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub env: String,
    #[serde(default)]
    pub risk: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub prechecks: Vec<CheckSpec>,
    #[serde(default)]
    pub steps: Vec<StepSpec>,
    #[serde(default)]
    pub postchecks: Vec<CheckSpec>,
}

impl RunbookSpec {
    /// True when the document defines at least one executable item.
    pub fn has_steps(&self) -> bool {
        !self.prechecks.is_empty() || !self.steps.is_empty() || !self.postchecks.is_empty()
    }
}
