// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn facts(server: Option<&str>, service: Option<&str>, env: Option<&str>) -> TicketFacts {
    TicketFacts {
        server_name: server.map(String::from),
        service: service.map(String::from),
        environment: env.map(String::from),
    }
}

#[test]
fn substitutes_double_brace_placeholders() {
    let body = "ssh {{server_name}} 'systemctl restart {{service}}'";
    let out = normalize_body(body, &facts(Some("web-01"), Some("app"), None));
    assert_eq!(out, "ssh web-01 'systemctl restart app'");
}

#[test]
fn substitutes_single_brace_and_spacing_variants() {
    let body = "ping {server_name} in {{ environment }}";
    let out = normalize_body(body, &facts(Some("db-02"), None, Some("staging")));
    assert_eq!(out, "ping db-02 in staging");
}

#[test]
fn hostname_and_ci_name_aliases() {
    let body = "check {{ci_name}} and {{hostname}}";
    let out = normalize_body(body, &facts(Some("web-01"), None, None));
    assert_eq!(out, "check web-01 and web-01");
}

#[test]
fn generic_tokens_replaced_whole_word() {
    let body = "Restart the server. Observe the servers afterwards.";
    let out = normalize_body(body, &facts(Some("web-01"), None, None));
    // "the server" is replaced; "the servers" is a different word and stays.
    assert_eq!(out, "Restart web-01. Observe the servers afterwards.");
}

#[test]
fn service_stands_in_for_missing_server() {
    let body = "restart {{server_name}}";
    let out = normalize_body(body, &facts(None, Some("app"), None));
    assert_eq!(out, "restart app");
}

#[test]
fn no_facts_leaves_body_untouched() {
    let body = "restart {{server_name}} on the server";
    assert_eq!(normalize_body(body, &facts(None, None, None)), body);
}
