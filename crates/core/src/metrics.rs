// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process labeled metrics for orchestrator instrumentation.
//!
//! Construct one [`Metrics`] per engine instance; tests build fresh instances
//! instead of sharing globals.

use parking_lot::Mutex;
use std::collections::HashMap;

pub const WORKER_ASSIGNMENTS_TOTAL: &str = "worker_assignments_total";
pub const SESSION_STATE_TRANSITIONS_TOTAL: &str = "session_state_transitions_total";
pub const EXECUTION_STEP_DURATION_SECONDS: &str = "execution_step_duration_seconds";
pub const CONNECTOR_COMMAND_TOTAL: &str = "connector_command_total";
pub const CONNECTOR_COMMAND_LATENCY_SECONDS: &str = "connector_command_latency_seconds";
pub const CONNECTOR_RETRY_TOTAL: &str = "connector_retry_total";

type SeriesKey = (&'static str, Vec<String>);

/// Histogram accumulator (count + sum; enough for latency summaries).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HistogramValue {
    pub count: u64,
    pub sum: f64,
}

/// Labeled counter / histogram registry.
#[derive(Default)]
pub struct Metrics {
    counters: Mutex<HashMap<SeriesKey, u64>>,
    histograms: Mutex<HashMap<SeriesKey, HistogramValue>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn inc(&self, name: &'static str, labels: &[&str]) {
        let key = (name, labels.iter().map(|l| l.to_string()).collect());
        *self.counters.lock().entry(key).or_insert(0) += 1;
    }

    fn observe(&self, name: &'static str, labels: &[&str], value: f64) {
        let key = (name, labels.iter().map(|l| l.to_string()).collect());
        let mut histograms = self.histograms.lock();
        let entry = histograms.entry(key).or_default();
        entry.count += 1;
        entry.sum += value.max(0.0);
    }

    pub fn record_assignment(&self, status: &str) {
        self.inc(WORKER_ASSIGNMENTS_TOTAL, &[status]);
    }

    pub fn record_state_transition(&self, from_state: &str, to_state: &str) {
        self.inc(SESSION_STATE_TRANSITIONS_TOTAL, &[from_state, to_state]);
    }

    pub fn observe_step_duration(&self, connector: &str, seconds: f64) {
        self.observe(EXECUTION_STEP_DURATION_SECONDS, &[connector], seconds);
    }

    pub fn record_connector_result(&self, connector: &str, status: &str) {
        self.inc(CONNECTOR_COMMAND_TOTAL, &[connector, status]);
    }

    pub fn observe_connector_latency(&self, connector: &str, seconds: f64) {
        self.observe(CONNECTOR_COMMAND_LATENCY_SECONDS, &[connector], seconds);
    }

    pub fn record_connector_retry(&self, connector: &str, reason: &str) {
        let reason = if reason.is_empty() { "unknown" } else { reason };
        self.inc(CONNECTOR_RETRY_TOTAL, &[connector, reason]);
    }

    /// Read a counter series (0 when never incremented).
    pub fn counter(&self, name: &'static str, labels: &[&str]) -> u64 {
        let key = (name, labels.iter().map(|l| l.to_string()).collect());
        self.counters.lock().get(&key).copied().unwrap_or(0)
    }

    /// Read a histogram series.
    pub fn histogram(&self, name: &'static str, labels: &[&str]) -> HistogramValue {
        let key = (name, labels.iter().map(|l| l.to_string()).collect());
        self.histograms.lock().get(&key).copied().unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
