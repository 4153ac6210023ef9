//! Prometheus-style metrics registry.
//!
//! A gauge/counter per fatal or metric-worthy consensus/sharding
//! transition: rounds committed/aborted, quorum failures, view changes,
//! phase timeouts, slashings, pool depth, and cross-shard envelope state.

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};

/// Metrics emitted by the consensus/sharding core.
///
/// All counters/gauges are registered into a private [`Registry`]; callers
/// that want to expose them over `/metrics` gather from
/// [`Metrics::registry`].
pub struct Metrics {
    registry: Registry,
    /// Blocks successfully appended, labeled by shard and algorithm.
    pub blocks_committed_total: IntCounterVec,
    /// Consensus rounds abandoned and retried.
    pub rounds_aborted_total: IntCounter,
    /// `QuorumNotReached` occurrences (PBFT/LSCC).
    pub quorum_failures_total: IntCounter,
    /// PBFT view-change occurrences.
    pub view_changes_total: IntCounter,
    /// LSCC phase-deadline expirations counted as `Rejected`.
    pub phase_timeouts_total: IntCounter,
    /// Validators moved into the slashed set.
    pub validators_slashed_total: IntCounter,
    /// Pending pool size, per shard (last observed).
    pub pool_size: IntGauge,
    /// Cross-shard envelopes currently pending resolution.
    pub cross_shard_envelopes_pending: IntGauge,
    /// Cross-shard envelopes that hit their deadline without resolving.
    pub cross_shard_envelopes_failed_total: IntCounter,
    /// LSCC weighted commit score of the most recent round.
    pub lscc_commit_score: Histogram,
    /// Fatal store errors observed (halts the affected shard).
    pub store_fatal_total: IntCounter,
}

impl Metrics {
    /// Build and register a fresh metrics set.
    pub fn new() -> Self {
        let registry = Registry::new();

        let blocks_committed_total = IntCounterVec::new(
            Opts::new("blocks_committed_total", "Blocks appended per shard/algorithm"),
            &["shard", "algorithm"],
        )
        .expect("valid metric");
        let rounds_aborted_total =
            IntCounter::new("rounds_aborted_total", "Consensus rounds abandoned and retried").expect("valid metric");
        let quorum_failures_total =
            IntCounter::new("quorum_failures_total", "QuorumNotReached occurrences").expect("valid metric");
        let view_changes_total = IntCounter::new("view_changes_total", "PBFT view-change occurrences").expect("valid metric");
        let phase_timeouts_total =
            IntCounter::new("phase_timeouts_total", "LSCC phase deadlines counted as Rejected").expect("valid metric");
        let validators_slashed_total =
            IntCounter::new("validators_slashed_total", "Validators moved into the slashed set").expect("valid metric");
        let pool_size = IntGauge::new("pool_size", "Pending pool size, last observed").expect("valid metric");
        let cross_shard_envelopes_pending = IntGauge::new(
            "cross_shard_envelopes_pending",
            "Cross-shard envelopes awaiting resolution",
        )
        .expect("valid metric");
        let cross_shard_envelopes_failed_total = IntCounter::new(
            "cross_shard_envelopes_failed_total",
            "Cross-shard envelopes that hit their deadline unresolved",
        )
        .expect("valid metric");
        let lscc_commit_score = Histogram::with_opts(
            HistogramOpts::new("lscc_commit_score", "Weighted commit score of each LSCC round")
                .buckets(vec![0.0, 0.2, 0.4, 0.6, 0.7, 0.8, 0.9, 1.0]),
        )
        .expect("valid metric");
        let store_fatal_total =
            IntCounter::new("store_fatal_total", "Fatal store errors observed").expect("valid metric");

        registry.register(Box::new(blocks_committed_total.clone())).ok();
        registry.register(Box::new(rounds_aborted_total.clone())).ok();
        registry.register(Box::new(quorum_failures_total.clone())).ok();
        registry.register(Box::new(view_changes_total.clone())).ok();
        registry.register(Box::new(phase_timeouts_total.clone())).ok();
        registry.register(Box::new(validators_slashed_total.clone())).ok();
        registry.register(Box::new(pool_size.clone())).ok();
        registry.register(Box::new(cross_shard_envelopes_pending.clone())).ok();
        registry.register(Box::new(cross_shard_envelopes_failed_total.clone())).ok();
        registry.register(Box::new(lscc_commit_score.clone())).ok();
        registry.register(Box::new(store_fatal_total.clone())).ok();

        Self {
            registry,
            blocks_committed_total,
            rounds_aborted_total,
            quorum_failures_total,
            view_changes_total,
            phase_timeouts_total,
            validators_slashed_total,
            pool_size,
            cross_shard_envelopes_pending,
            cross_shard_envelopes_failed_total,
            lscc_commit_score,
            store_fatal_total,
        }
    }

    /// The backing registry, for exposition over `/metrics`.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let m = Metrics::new();
        assert_eq!(m.rounds_aborted_total.get(), 0);
    }

    #[test]
    fn gather_produces_families() {
        let m = Metrics::new();
        m.rounds_aborted_total.inc();
        let families = m.registry().gather();
        assert!(!families.is_empty());
    }
}
