// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CI/server-name extraction from tickets.
//!
//! Deterministic and side-effect-free: extraction looks only at ticket
//! metadata keys, description text, and the service field.

use regex::Regex;
use remedy_core::Ticket;
use std::sync::LazyLock;

/// Metadata keys searched for a CI reference, in priority order.
const CI_KEYWORDS: &[&str] =
    &["ci_association", "ci_id", "ci_name", "server_name", "hostname", "host", "server"];

#[allow(clippy::expect_used)]
static TEXT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)\bserver[:\s]+([A-Za-z0-9][A-Za-z0-9_.-]{2,})").expect("valid regex"),
        Regex::new(r"(?i)\bhost(?:name)?[:\s]+([A-Za-z0-9][A-Za-z0-9_.-]{2,})")
            .expect("valid regex"),
        Regex::new(r"(?i)\bon\s+([A-Za-z][A-Za-z0-9-]*\d[A-Za-z0-9-]*)\b").expect("valid regex"),
    ]
});

/// Values extracted from a ticket for runbook normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketFacts {
    pub server_name: Option<String>,
    pub service: Option<String>,
    pub environment: Option<String>,
}

impl TicketFacts {
    /// Build normalization facts from a ticket.
    pub fn from_ticket(ticket: &Ticket) -> Self {
        let server_name = extract_ci_name(ticket);
        Self {
            server_name,
            service: ticket.service.clone(),
            environment: ticket.environment.clone(),
        }
    }
}

/// Extract a CI/server name from a ticket.
///
/// Priority: metadata CI keys → description/title patterns → service field
/// (when it is shaped like a hostname).
pub fn extract_ci_name(ticket: &Ticket) -> Option<String> {
    if let Some(map) = ticket.metadata.as_object() {
        for key in CI_KEYWORDS {
            if let Some(value) = map.get(*key).and_then(|v| v.as_str()) {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
    }

    let text = if ticket.description.is_empty() { &ticket.title } else { &ticket.description };
    if let Some(found) = extract_from_text(text) {
        return Some(found);
    }

    ticket
        .service
        .as_deref()
        .filter(|s| looks_like_server_name(s))
        .map(|s| s.trim().to_string())
}

fn extract_from_text(text: &str) -> Option<String> {
    for pattern in TEXT_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(text) {
            let name = caps[1].trim_end_matches(['.', ',']).to_string();
            if looks_like_server_name(&name) {
                return Some(name);
            }
        }
    }
    None
}

/// Heuristic for hostname-shaped identifiers: single token, 3..64 chars,
/// containing a digit, dot, or dash.
pub fn looks_like_server_name(value: &str) -> bool {
    let value = value.trim();
    (3..=64).contains(&value.len())
        && !value.contains(char::is_whitespace)
        && value.chars().any(|c| c.is_ascii_digit() || c == '.' || c == '-')
        && value.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

#[cfg(test)]
#[path = "extract_tests.rs"]
mod tests;
