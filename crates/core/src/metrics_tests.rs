// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn counters_increment_per_label_set() {
    let metrics = Metrics::new();
    metrics.record_assignment("published");
    metrics.record_assignment("published");
    metrics.record_assignment("failed");

    assert_eq!(metrics.counter(WORKER_ASSIGNMENTS_TOTAL, &["published"]), 2);
    assert_eq!(metrics.counter(WORKER_ASSIGNMENTS_TOTAL, &["failed"]), 1);
    assert_eq!(metrics.counter(WORKER_ASSIGNMENTS_TOTAL, &["acknowledged"]), 0);
}

#[test]
fn state_transitions_are_labeled_by_pair() {
    let metrics = Metrics::new();
    metrics.record_state_transition("pending", "in_progress");
    metrics.record_state_transition("in_progress", "completed");

    assert_eq!(
        metrics.counter(SESSION_STATE_TRANSITIONS_TOTAL, &["pending", "in_progress"]),
        1
    );
    assert_eq!(
        metrics.counter(SESSION_STATE_TRANSITIONS_TOTAL, &["in_progress", "completed"]),
        1
    );
}

#[test]
fn histograms_accumulate_count_and_sum() {
    let metrics = Metrics::new();
    metrics.observe_step_duration("local", 0.5);
    metrics.observe_step_duration("local", 1.5);
    metrics.observe_step_duration("ssh", 2.0);

    let local = metrics.histogram(EXECUTION_STEP_DURATION_SECONDS, &["local"]);
    assert_eq!(local.count, 2);
    assert!((local.sum - 2.0).abs() < f64::EPSILON);

    let ssh = metrics.histogram(EXECUTION_STEP_DURATION_SECONDS, &["ssh"]);
    assert_eq!(ssh.count, 1);
}

#[test]
fn negative_observations_clamp_to_zero() {
    let metrics = Metrics::new();
    metrics.observe_connector_latency("local", -1.0);
    let value = metrics.histogram(CONNECTOR_COMMAND_LATENCY_SECONDS, &["local"]);
    assert_eq!(value.count, 1);
    assert_eq!(value.sum, 0.0);
}

#[test]
fn empty_retry_reason_maps_to_unknown() {
    let metrics = Metrics::new();
    metrics.record_connector_retry("ssh", "");
    assert_eq!(metrics.counter(CONNECTOR_RETRY_TOTAL, &["ssh", "unknown"]), 1);
}
