// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runbook body parsing.

use crate::spec::{CheckSpec, RunbookSpec, StepSpec};
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static YAML_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:yaml|yml)\n(.*?)```").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static BASH_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```bash\n(.*?)```").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static STEP_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"###\s*Step\s+\d+:").expect("constant regex pattern is valid")
});

/// Parsed runbook: a linear view of the document regardless of its shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedRunbook {
    pub prechecks: Vec<CheckSpec>,
    pub main_steps: Vec<StepSpec>,
    pub postchecks: Vec<CheckSpec>,
    pub metadata: IndexMap<String, String>,
}

impl ParsedRunbook {
    /// Total number of executable items across all phases.
    pub fn len(&self) -> usize {
        self.prechecks.len() + self.main_steps.len() + self.postchecks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parse a runbook body into its linear form.
///
/// Shapes tried in order: fenced YAML, raw YAML, markdown fallback. The
/// parser is pure and never fails; an unreadable body degrades to a
/// placeholder step so the session surfaces the problem at execution time.
pub fn parse_runbook(body: &str) -> ParsedRunbook {
    if let Some(caps) = YAML_FENCE.captures(body) {
        let yaml = caps[1].trim();
        match serde_yaml::from_str::<RunbookSpec>(yaml) {
            Ok(spec) if spec.has_steps() => return from_spec(spec),
            Ok(_) => {
                tracing::warn!("fenced yaml defines no steps, trying markdown fallback");
            }
            Err(error) => {
                tracing::warn!(%error, "fenced yaml failed to parse, trying markdown fallback");
            }
        }
    } else if let Ok(spec) = serde_yaml::from_str::<RunbookSpec>(body) {
        if spec.has_steps() {
            return from_spec(spec);
        }
    }

    markdown_fallback(body)
}

fn from_spec(spec: RunbookSpec) -> ParsedRunbook {
    let mut metadata = IndexMap::new();
    metadata.insert("title".to_string(), spec.title.clone());
    metadata.insert("service".to_string(), spec.service.clone());
    metadata.insert("env".to_string(), spec.env.clone());
    metadata.insert("risk".to_string(), spec.risk.clone());
    if let Some(version) = &spec.version {
        metadata.insert("version".to_string(), version.clone());
    }

    ParsedRunbook {
        prechecks: spec.prechecks,
        main_steps: spec.steps,
        postchecks: spec.postchecks,
        metadata,
    }
}

/// Fallback parser for the old markdown-only format: scrape fenced bash
/// blocks, preferring per-step sections when present.
fn markdown_fallback(body: &str) -> ParsedRunbook {
    let mut main_steps = Vec::new();

    for caps in BASH_FENCE.captures_iter(body) {
        for line in caps[1].lines() {
            let command = line.trim();
            if command.is_empty() {
                continue;
            }
            main_steps.push(StepSpec {
                name: "Command".to_string(),
                description: format!("Execute: {command}"),
                command: command.to_string(),
                severity: Some("moderate".to_string()),
                ..StepSpec::default()
            });
        }
    }

    if main_steps.is_empty() {
        for (idx, section) in step_sections(body).into_iter().enumerate() {
            if let Some(cmd_caps) = BASH_FENCE.captures(section) {
                for line in cmd_caps[1].lines() {
                    let command = line.trim();
                    if command.is_empty() {
                        continue;
                    }
                    main_steps.push(StepSpec {
                        name: format!("Step {}", idx + 1),
                        description: format!("Step {}: {}", idx + 1, first_sentence(section)),
                        command: command.to_string(),
                        severity: Some("moderate".to_string()),
                        ..StepSpec::default()
                    });
                }
            }
        }
    }

    if main_steps.is_empty() {
        tracing::warn!("could not parse any steps from runbook, creating placeholder");
        main_steps.push(StepSpec {
            name: "Unknown".to_string(),
            step_type: "manual".to_string(),
            description: "Placeholder: unable to parse runbook structure".to_string(),
            command: "echo 'No commands found in runbook'".to_string(),
            severity: Some("safe".to_string()),
            ..StepSpec::default()
        });
    }

    let mut metadata = IndexMap::new();
    metadata.insert("title".to_string(), "Unknown".to_string());
    metadata.insert("service".to_string(), "unknown".to_string());

    ParsedRunbook { prechecks: Vec::new(), main_steps, postchecks: Vec::new(), metadata }
}

/// Slice the body between `### Step N:` headers.
fn step_sections(body: &str) -> Vec<&str> {
    let headers: Vec<(usize, usize)> =
        STEP_HEADER.find_iter(body).map(|m| (m.start(), m.end())).collect();
    headers
        .iter()
        .enumerate()
        .map(|(idx, (_, end))| {
            let section_end = headers.get(idx + 1).map(|(start, _)| *start).unwrap_or(body.len());
            &body[*end..section_end]
        })
        .collect()
}

fn first_sentence(text: &str) -> String {
    let stripped = BASH_FENCE.replace_all(text, "");
    stripped
        .split('.')
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
