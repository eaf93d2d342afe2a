// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn successful_command_captures_stdout() {
    let outcome =
        execute("echo hello", &ConnectionConfig::local(), Duration::from_secs(10)).await;
    assert!(outcome.success);
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(outcome.output.trim(), "hello");
    assert!(!outcome.connection_error);
    assert!(!outcome.simulated);
}

#[tokio::test]
async fn failing_command_reports_exit_code() {
    let outcome = execute("exit 3", &ConnectionConfig::local(), Duration::from_secs(10)).await;
    assert!(!outcome.success);
    assert_eq!(outcome.exit_code, 3);
}

#[tokio::test]
async fn stderr_is_captured() {
    let outcome =
        execute("echo oops >&2; false", &ConnectionConfig::local(), Duration::from_secs(10))
            .await;
    assert!(!outcome.success);
    assert_eq!(outcome.error.trim(), "oops");
}

#[tokio::test]
async fn timeout_is_reported() {
    let outcome = execute("sleep 5", &ConnectionConfig::local(), Duration::from_millis(100)).await;
    assert!(!outcome.success);
    assert_eq!(outcome.exit_code, -1);
    assert!(outcome.error.contains("timed out"));
    assert!(!outcome.connection_error);
}

#[tokio::test]
async fn empty_command_gets_placeholder() {
    let outcome = execute("   ", &ConnectionConfig::local(), Duration::from_secs(10)).await;
    assert!(outcome.success);
    assert!(outcome.output.contains("No command provided"));
}

#[tokio::test]
async fn shell_selection_is_honoured() {
    let config = ConnectionConfig {
        shell: Some("sh".to_string()),
        ..ConnectionConfig::local()
    };
    let outcome = execute("echo $0", &config, Duration::from_secs(10)).await;
    assert!(outcome.success);
    assert!(outcome.output.contains("sh"));
}
