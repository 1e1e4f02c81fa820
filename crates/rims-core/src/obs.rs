//! Structured observability hooks for grading lifecycle events.
//!
//! - A batch-scoped tracing span from [`batch_span`]
//! - Emission functions for absorbed failures and consensus decisions
//!
//! Absorbed failures are logged at `warn!`/`debug!` so a batch keeps going
//! while still leaving a trail.

use tracing::{debug, info, warn};

/// Span covering one batch run. Instrument the batch future with it:
///
/// ```ignore
/// grade_all(records).instrument(batch_span("6f1c...")).await;
/// // every event inside carries run_id = "6f1c..."
/// ```
pub fn batch_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("rims.batch", run_id = %run_id)
}

/// Emit event: a symbolic comparison hit its wall-clock budget.
pub fn emit_equivalence_timeout(lhs: &str, rhs: &str, limit_ms: u64) {
    warn!(
        event = "equivalence.timeout",
        lhs = %lhs,
        rhs = %rhs,
        limit_ms = limit_ms,
    );
}

/// Emit event: a symbolic comparison failed closed for a non-timeout reason.
pub fn emit_equivalence_failed(lhs: &str, rhs: &str, error: &dyn std::fmt::Display) {
    debug!(event = "equivalence.failed", lhs = %lhs, rhs = %rhs, error = %error);
}

/// Emit event: consensus decided over `candidates` answers.
pub fn emit_consensus_decided(domain: &str, candidates: usize, outcome: &str) {
    debug!(
        event = "consensus.decided",
        domain = %domain,
        candidates = candidates,
        outcome = %outcome,
    );
}

/// Emit event: generated code produced no answer.
pub fn emit_execution_failed(error: &dyn std::fmt::Display) {
    debug!(event = "execution.failed", error = %error);
}

/// Emit event: one batch record could not be graded.
pub fn emit_record_failed(index: usize, error: &dyn std::fmt::Display) {
    warn!(event = "record.failed", index = index, error = %error);
}

/// Emit event: batch finished.
pub fn emit_batch_finished(run_id: &str, total: usize, correct: usize, failed: usize, duration_ms: u64) {
    info!(
        event = "batch.finished",
        run_id = %run_id,
        total = total,
        correct = correct,
        failed = failed,
        duration_ms = duration_ms,
    );
}
