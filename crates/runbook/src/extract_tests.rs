// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn metadata_ci_association_wins() {
    let ticket = Ticket::builder()
        .metadata(json!({"ci_association": "web-prod-01", "server": "other"}))
        .build();
    assert_eq!(extract_ci_name(&ticket).as_deref(), Some("web-prod-01"));
}

#[test]
fn metadata_keyword_scan() {
    let ticket = Ticket::builder().metadata(json!({"hostname": "db2.internal"})).build();
    assert_eq!(extract_ci_name(&ticket).as_deref(), Some("db2.internal"));
}

#[yare::parameterized(
    server_prefix = { "High CPU on server: app-prod-03 since 9am", "app-prod-03" },
    host_prefix = { "host db-01 unreachable", "db-01" },
    hostname_word = { "hostname: cache7.internal down", "cache7.internal" },
    on_token = { "disk filling up on web12", "web12" },
)]
fn description_patterns(description: &str, expected: &str) {
    let ticket = Ticket::builder().description(description).build();
    assert_eq!(extract_ci_name(&ticket).as_deref(), Some(expected));
}

#[test]
fn service_field_used_when_hostname_shaped() {
    let ticket = Ticket::builder().description("vague alert").service("app-01").build();
    assert_eq!(extract_ci_name(&ticket).as_deref(), Some("app-01"));
}

#[test]
fn plain_service_names_are_not_cis() {
    let ticket = Ticket::builder().description("vague alert").service("payments").build();
    assert_eq!(extract_ci_name(&ticket), None);
}

#[yare::parameterized(
    dashed = { "web-prod-01", true },
    dotted = { "db1.internal", true },
    numbered = { "cache7", true },
    word = { "payments", false },
    spaced = { "web prod", false },
    too_short = { "a1", false },
)]
fn server_name_heuristic(value: &str, expected: bool) {
    assert_eq!(looks_like_server_name(value), expected);
}

#[test]
fn facts_prefer_extracted_server() {
    let ticket = Ticket::builder()
        .metadata(json!({"ci_name": "web-01"}))
        .service("app")
        .environment("prod")
        .build();
    let facts = TicketFacts::from_ticket(&ticket);
    assert_eq!(facts.server_name.as_deref(), Some("web-01"));
    assert_eq!(facts.service.as_deref(), Some("app"));
    assert_eq!(facts.environment.as_deref(), Some("prod"));
}
