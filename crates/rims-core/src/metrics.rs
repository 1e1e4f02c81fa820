//! Global atomic counters for grading observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a batch).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters. No allocations, no locking.
pub struct Metrics {
    equivalence_checks: AtomicU64,
    equivalence_timeouts: AtomicU64,
    consensus_reached: AtomicU64,
    consensus_missed: AtomicU64,
    code_executions: AtomicU64,
    execution_failures: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            equivalence_checks: AtomicU64::new(0),
            equivalence_timeouts: AtomicU64::new(0),
            consensus_reached: AtomicU64::new(0),
            consensus_missed: AtomicU64::new(0),
            code_executions: AtomicU64::new(0),
            execution_failures: AtomicU64::new(0),
        }
    }

    pub fn inc_equivalence_checks(&self) {
        self.equivalence_checks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_equivalence_timeouts(&self) {
        self.equivalence_timeouts.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "equivalence_timeouts", "counter incremented");
    }

    /// Record one consensus decision, reached or not.
    pub fn record_consensus(&self, reached: bool) {
        if reached {
            self.consensus_reached.fetch_add(1, Ordering::Relaxed);
        } else {
            self.consensus_missed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn inc_code_executions(&self) {
        self.code_executions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_execution_failures(&self) {
        self.execution_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "execution_failures", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            equivalence_checks = self.equivalence_checks(),
            equivalence_timeouts = self.equivalence_timeouts(),
            consensus_reached = self.consensus_reached(),
            consensus_missed = self.consensus_missed(),
            code_executions = self.code_executions(),
            execution_failures = self.execution_failures(),
        );
    }

    pub fn equivalence_checks(&self) -> u64 {
        self.equivalence_checks.load(Ordering::Relaxed)
    }

    pub fn equivalence_timeouts(&self) -> u64 {
        self.equivalence_timeouts.load(Ordering::Relaxed)
    }

    pub fn consensus_reached(&self) -> u64 {
        self.consensus_reached.load(Ordering::Relaxed)
    }

    pub fn consensus_missed(&self) -> u64 {
        self.consensus_missed.load(Ordering::Relaxed)
    }

    pub fn code_executions(&self) -> u64 {
        self.code_executions.load(Ordering::Relaxed)
    }

    pub fn execution_failures(&self) -> u64 {
        self.execution_failures.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.equivalence_checks.store(0, Ordering::Relaxed);
        self.equivalence_timeouts.store(0, Ordering::Relaxed);
        self.consensus_reached.store(0, Ordering::Relaxed);
        self.consensus_missed.store(0, Ordering::Relaxed);
        self.code_executions.store(0, Ordering::Relaxed);
        self.execution_failures.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        m.inc_equivalence_checks();
        m.inc_equivalence_checks();
        assert_eq!(m.equivalence_checks(), 2);

        m.record_consensus(true);
        m.record_consensus(false);
        m.record_consensus(false);
        assert_eq!(m.consensus_reached(), 1);
        assert_eq!(m.consensus_missed(), 2);

        m.inc_code_executions();
        m.inc_execution_failures();
        assert_eq!(m.code_executions(), 1);
        assert_eq!(m.execution_failures(), 1);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_equivalence_timeouts();
        m.record_consensus(true);
        m.inc_code_executions();
        m.reset();
        assert_eq!(m.equivalence_timeouts(), 0);
        assert_eq!(m.consensus_reached(), 0);
        assert_eq!(m.code_executions(), 0);
    }
}
