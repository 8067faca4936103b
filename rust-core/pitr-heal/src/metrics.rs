// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Prometheus counters for healing and metadata resolution.

use prometheus::{IntCounterVec, Opts, Registry};

use crate::error::PitrResult;

/// Engine counters, registered on a caller-supplied registry.
///
/// Cloning is cheap; clones update the same series.
#[derive(Clone)]
pub struct HealMetrics {
    heal_actions: IntCounterVec,
    heal_failures: IntCounterVec,
    resolves: IntCounterVec,
}

impl HealMetrics {
    /// Create the counters and register them on `registry`.
    pub fn new(registry: &Registry) -> PitrResult<Self> {
        let heal_actions = IntCounterVec::new(
            Opts::new("pitr_heal_actions_total", "Healing actions started, by archive state"),
            &["state"],
        )?;
        let heal_failures = IntCounterVec::new(
            Opts::new("pitr_heal_failures_total", "Healing actions that failed, by archive state"),
            &["state"],
        )?;
        let resolves = IntCounterVec::new(
            Opts::new("pitr_resolve_total", "Metadata resolutions, by answering source"),
            &["source"],
        )?;

        registry.register(Box::new(heal_actions.clone()))?;
        registry.register(Box::new(heal_failures.clone()))?;
        registry.register(Box::new(resolves.clone()))?;

        Ok(Self {
            heal_actions,
            heal_failures,
            resolves,
        })
    }

    pub fn record_action(&self, state: &str) {
        self.heal_actions.with_label_values(&[state]).inc();
    }

    pub fn record_failure(&self, state: &str) {
        self.heal_failures.with_label_values(&[state]).inc();
    }

    pub fn record_resolve(&self, source: &str) {
        self.resolves.with_label_values(&[source]).inc();
    }

    pub fn actions(&self, state: &str) -> u64 {
        self.heal_actions.with_label_values(&[state]).get()
    }

    pub fn failures(&self, state: &str) -> u64 {
        self.heal_failures.with_label_values(&[state]).get()
    }

    pub fn resolves(&self, source: &str) -> u64 {
        self.resolves.with_label_values(&[source]).get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::TextEncoder;

    #[test]
    fn test_counters_are_exported() {
        let registry = Registry::new();
        let metrics = HealMetrics::new(&registry).unwrap();
        metrics.record_action("total_loss");
        metrics.record_resolve("cache");
        metrics.record_resolve("cache");

        assert_eq!(metrics.actions("total_loss"), 1);
        assert_eq!(metrics.resolves("cache"), 2);
        assert_eq!(metrics.failures("total_loss"), 0);

        let exposition = TextEncoder::new().encode_to_string(&registry.gather()).unwrap();
        assert!(exposition.contains("pitr_heal_actions_total{state=\"total_loss\"} 1"));
        assert!(exposition.contains("pitr_resolve_total{source=\"cache\"} 2"));
    }

    #[test]
    fn test_double_registration_fails() {
        let registry = Registry::new();
        HealMetrics::new(&registry).unwrap();
        assert!(HealMetrics::new(&registry).is_err());
    }
}
