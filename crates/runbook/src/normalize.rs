// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ticket-specific runbook normalization.
//!
//! Before parsing, a generic runbook body may be specialized with values
//! extracted from the ticket: `{{server_name}}`-style placeholders, their
//! single-brace variants, and whole-word generic tokens like "the server".
//! When no facts are available the body is returned unchanged.

use crate::extract::TicketFacts;
use regex::Regex;

/// Substitute ticket facts into a runbook body.
pub fn normalize_body(body: &str, facts: &TicketFacts) -> String {
    let mut substitutions: Vec<(&str, &str)> = Vec::new();

    let server = facts.server_name.as_deref().or(facts.service.as_deref());
    if let Some(server) = server {
        substitutions.push(("server_name", server));
        substitutions.push(("ci_name", server));
        substitutions.push(("hostname", server));
    }
    if let Some(service) = facts.service.as_deref() {
        substitutions.push(("service", service));
    }
    if let Some(environment) = facts.environment.as_deref() {
        substitutions.push(("environment", environment));
    }

    if substitutions.is_empty() {
        return body.to_string();
    }

    let mut result = body.to_string();
    for (key, value) in &substitutions {
        // {{ key }} and { key } placeholder forms
        for pattern in [
            format!(r"\{{\{{\s*{key}\s*\}}\}}"),
            format!(r"\{{\s*{key}\s*\}}"),
        ] {
            if let Ok(re) = Regex::new(&pattern) {
                result = re.replace_all(&result, *value).into_owned();
            }
        }
    }

    // Whole-word replacement of generic references once a concrete server
    // name is known.
    if let Some(server) = server {
        for token in ["the server", "the affected server", "the target server"] {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(token));
            if let Ok(re) = Regex::new(&pattern) {
                result = re.replace_all(&result, server).into_owned();
            }
        }
    }

    result
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
