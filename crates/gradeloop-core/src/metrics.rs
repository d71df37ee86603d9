//! Global atomic counters for decision observability.
//!
//! Counters are incremented silently at the call site and never influence a
//! decision. Call [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event.

use std::sync::atomic::{AtomicU64, Ordering};

use gradeloop_ledger::DecisionOutcome;

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Atomic counters, no allocation or locking.
pub struct Metrics {
    decisions: AtomicU64,
    accepted: AtomicU64,
    retried: AtomicU64,
    escalated: AtomicU64,
    verifier_timeouts: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            decisions: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
            retried: AtomicU64::new(0),
            escalated: AtomicU64::new(0),
            verifier_timeouts: AtomicU64::new(0),
        }
    }

    /// Count one finished decision under its outcome.
    pub fn record_outcome(&self, outcome: DecisionOutcome) {
        self.decisions.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            DecisionOutcome::Accept => &self.accepted,
            DecisionOutcome::Retry => &self.retried,
            DecisionOutcome::Escalate => &self.escalated,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "decisions", outcome = %outcome, "counter incremented");
    }

    pub fn inc_verifier_timeouts(&self) {
        self.verifier_timeouts.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "verifier_timeouts", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            decisions = self.decisions(),
            accepted = self.accepted(),
            retried = self.retried(),
            escalated = self.escalated(),
            verifier_timeouts = self.verifier_timeouts(),
        );
    }

    pub fn decisions(&self) -> u64 {
        self.decisions.load(Ordering::Relaxed)
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn retried(&self) -> u64 {
        self.retried.load(Ordering::Relaxed)
    }

    pub fn escalated(&self) -> u64 {
        self.escalated.load(Ordering::Relaxed)
    }

    pub fn verifier_timeouts(&self) -> u64 {
        self.verifier_timeouts.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        for counter in [
            &self.decisions,
            &self.accepted,
            &self.retried,
            &self.escalated,
            &self.verifier_timeouts,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_increment_their_counter() {
        let m = Metrics::new();
        m.record_outcome(DecisionOutcome::Accept);
        m.record_outcome(DecisionOutcome::Retry);
        m.record_outcome(DecisionOutcome::Retry);
        m.record_outcome(DecisionOutcome::Escalate);

        assert_eq!(m.decisions(), 4);
        assert_eq!(m.accepted(), 1);
        assert_eq!(m.retried(), 2);
        assert_eq!(m.escalated(), 1);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.record_outcome(DecisionOutcome::Accept);
        m.inc_verifier_timeouts();
        m.reset();
        assert_eq!(m.decisions(), 0);
        assert_eq!(m.accepted(), 0);
        assert_eq!(m.verifier_timeouts(), 0);
    }
}
