// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn external_key_requires_both_parts() {
    let ticket = Ticket::builder().build();
    assert_eq!(ticket.external_key(), None);

    let ticket = Ticket::builder().source("zoho").external_id("Z-100").build();
    assert_eq!(ticket.external_key(), Some(("zoho", "Z-100")));
}

#[test]
fn false_positive_classification() {
    let ticket = Ticket::builder().classification("false_positive").build();
    assert!(ticket.is_false_positive());

    let ticket = Ticket::builder().classification("actionable").build();
    assert!(!ticket.is_false_positive());
}

#[yare::parameterized(
    open = { TicketStatus::Open, "open" },
    in_progress = { TicketStatus::InProgress, "in_progress" },
    escalated = { TicketStatus::Escalated, "escalated" },
)]
fn status_display(status: TicketStatus, expected: &str) {
    assert_eq!(status.to_string(), expected);
}

#[test]
fn status_serde_uses_snake_case() {
    let json = serde_json::to_string(&TicketStatus::InProgress).unwrap();
    assert_eq!(json, "\"in_progress\"");
    let back: TicketStatus = serde_json::from_str("\"escalated\"").unwrap();
    assert_eq!(back, TicketStatus::Escalated);
}
