//! The cross-shard envelope router.
//!
//! A `cross_shard` transaction is admitted only to its source shard's pool.
//! When the source shard selects it into a committed block, the driver
//! calls [`CrossShardRouter::commit_source`], which enqueues a
//! `CommittedSource` envelope on the destination's outbound queue and holds
//! the envelope in a pending-finalization map keyed by `message_id`.
//!
//! The destination shard drains its queue with [`CrossShardRouter::drain`],
//! applies each envelope in its next block, and reports the outcome back
//! with [`CrossShardRouter::apply_at_destination`] (dedup against
//! `message_id`) and [`CrossShardRouter::resolve_source`] (clears the
//! pending-finalization entry). [`CrossShardRouter::sweep_expired`] fails
//! any pending envelope that missed its deadline without a destination ack.

use shared_observer::{Observer, ObserverEvent};
use shared_types::envelope::{CrossShardEnvelope, EnvelopeState};
use shared_types::{Hash, Transaction};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

/// Result of applying an envelope at its destination shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Applied for the first time.
    Applied,
    /// `message_id` was already applied; the caller must not re-apply the payload.
    AlreadyApplied,
    /// Past `deadline` without prior application.
    Expired,
}

/// Routes `cross_shard` envelopes between shards and tracks their
/// resolution. One instance is shared by every shard's driver in a node.
pub struct CrossShardRouter {
    observer: Arc<dyn Observer>,
    outbound: Mutex<HashMap<u32, VecDeque<CrossShardEnvelope>>>,
    pending: Mutex<HashMap<Hash, CrossShardEnvelope>>,
    applied: Mutex<HashSet<Hash>>,
}

impl CrossShardRouter {
    /// Build a router with empty queues.
    pub fn new(observer: Arc<dyn Observer>) -> Self {
        Self {
            observer,
            outbound: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            applied: Mutex::new(HashSet::new()),
        }
    }

    /// The source shard includes `tx` in a committed block. Enqueues a
    /// `CommittedSource` envelope for `to_shard` and returns its
    /// `message_id`, or `None` if that `message_id` is already pending or
    /// resolved — the source refuses to include the same envelope twice.
    pub fn commit_source(
        &self,
        tx: Transaction,
        from_shard: u32,
        to_shard: u32,
        deadline: i64,
    ) -> Option<Hash> {
        let message_id = CrossShardEnvelope::derive_message_id(&tx.id, from_shard, to_shard);

        let mut pending = self.pending.lock().unwrap();
        if pending.contains_key(&message_id) || self.applied.lock().unwrap().contains(&message_id) {
            return None;
        }

        let mut envelope = CrossShardEnvelope::new(tx, from_shard, to_shard, deadline);
        envelope.state = EnvelopeState::CommittedSource;

        self.outbound
            .lock()
            .unwrap()
            .entry(to_shard)
            .or_default()
            .push_back(envelope.clone());
        pending.insert(message_id, envelope);
        Some(message_id)
    }

    /// Drain up to `limit` outbound envelopes destined for `shard_id`, in
    /// enqueue order.
    pub fn drain(&self, shard_id: u32, limit: usize) -> Vec<CrossShardEnvelope> {
        let mut outbound = self.outbound.lock().unwrap();
        let queue = outbound.entry(shard_id).or_default();
        let n = limit.min(queue.len());
        queue.drain(..n).collect()
    }

    /// The destination shard applies `envelope` in its next block. Returns
    /// [`ApplyOutcome::AlreadyApplied`] without side effects if `message_id`
    /// was applied before, and [`ApplyOutcome::Expired`] if `now` is past
    /// `envelope.deadline` and it was never applied.
    pub fn apply_at_destination(&self, envelope: &CrossShardEnvelope, now: i64) -> ApplyOutcome {
        let mut applied = self.applied.lock().unwrap();
        if applied.contains(&envelope.message_id) {
            return ApplyOutcome::AlreadyApplied;
        }
        if envelope.is_expired(now) {
            self.observer.record(ObserverEvent::CrossShardEnvelopeFailed {
                message_id: envelope.message_id,
                from_shard: envelope.from_shard,
                to_shard: envelope.to_shard,
                reason: "deadline expired before application".to_string(),
            });
            return ApplyOutcome::Expired;
        }
        applied.insert(envelope.message_id);
        self.observer.record(ObserverEvent::CrossShardEnvelopeApplied {
            message_id: envelope.message_id,
            from_shard: envelope.from_shard,
            to_shard: envelope.to_shard,
        });
        ApplyOutcome::Applied
    }

    /// The source shard clears a pending-finalization entry once the
    /// destination's outcome is known. A no-op if `message_id` is not
    /// pending (e.g. a duplicate ack arrived after the first resolved it).
    pub fn resolve_source(&self, message_id: &Hash, outcome: ApplyOutcome) {
        let mut pending = self.pending.lock().unwrap();
        let Some(mut envelope) = pending.remove(message_id) else {
            return;
        };
        match outcome {
            ApplyOutcome::Applied => envelope.state = EnvelopeState::AppliedDest,
            ApplyOutcome::Expired => envelope.state = EnvelopeState::Failed,
            ApplyOutcome::AlreadyApplied => envelope.state = EnvelopeState::AppliedDest,
        }
    }

    /// Fail every pending envelope whose deadline has passed without a
    /// destination ack. Returns the failed `message_id`s so the driver can
    /// return their payloads to the source shard's pool.
    pub fn sweep_expired(&self, now: i64) -> Vec<Hash> {
        let mut pending = self.pending.lock().unwrap();
        let expired_ids: Vec<Hash> = pending
            .values()
            .filter(|e| e.is_expired(now))
            .map(|e| e.message_id)
            .collect();
        for id in &expired_ids {
            if let Some(envelope) = pending.remove(id) {
                self.observer.record(ObserverEvent::CrossShardEnvelopeFailed {
                    message_id: envelope.message_id,
                    from_shard: envelope.from_shard,
                    to_shard: envelope.to_shard,
                    reason: "deadline expired without destination ack".to_string(),
                });
            }
        }
        expired_ids
    }

    /// Number of envelopes still awaiting resolution.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Return previously [`Self::drain`]ed envelopes to the front of
    /// `shard_id`'s outbound queue, undoing the drain for a round that was
    /// abandoned before committing (propose failure, lost fork choice).
    /// Envelopes already passed to [`Self::apply_at_destination`] must not
    /// be requeued — doing so would offer them for a second application.
    pub fn requeue(&self, shard_id: u32, envelopes: Vec<CrossShardEnvelope>) {
        if envelopes.is_empty() {
            return;
        }
        let mut outbound = self.outbound.lock().unwrap();
        let queue = outbound.entry(shard_id).or_default();
        for envelope in envelopes.into_iter().rev() {
            queue.push_front(envelope);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_observer::NullObserver;
    use shared_types::{Address, TransactionKind};

    fn tx(from: u8, to: u8) -> Transaction {
        Transaction::new_unsigned(Address([from; 20]), Address([to; 20]), 10, 1, vec![], 0, 0, 0, TransactionKind::CrossShard)
    }

    #[test]
    fn commit_source_enqueues_and_refuses_duplicates() {
        let router = CrossShardRouter::new(NullObserver::shared());
        let t = tx(1, 2);
        let first = router.commit_source(t.clone(), 0, 1, 1_000);
        assert!(first.is_some());
        let second = router.commit_source(t, 0, 1, 1_000);
        assert!(second.is_none(), "same message_id must not be committed twice");
        assert_eq!(router.pending_len(), 1);
    }

    #[test]
    fn drain_then_apply_is_idempotent() {
        let router = CrossShardRouter::new(NullObserver::shared());
        let t = tx(1, 2);
        router.commit_source(t, 0, 1, 1_000).unwrap();

        let drained = router.drain(1, 10);
        assert_eq!(drained.len(), 1);
        let envelope = &drained[0];

        assert_eq!(router.apply_at_destination(envelope, 0), ApplyOutcome::Applied);
        assert_eq!(router.apply_at_destination(envelope, 0), ApplyOutcome::AlreadyApplied);
    }

    #[test]
    fn drain_respects_limit_and_destination() {
        let router = CrossShardRouter::new(NullObserver::shared());
        router.commit_source(tx(1, 2), 0, 1, 1_000).unwrap();
        router.commit_source(tx(3, 4), 0, 1, 1_000).unwrap();
        router.commit_source(tx(5, 6), 0, 2, 1_000).unwrap();

        assert_eq!(router.drain(1, 1).len(), 1);
        assert_eq!(router.drain(1, 10).len(), 1);
        assert_eq!(router.drain(2, 10).len(), 1);
    }

    #[test]
    fn apply_past_deadline_is_expired() {
        let router = CrossShardRouter::new(NullObserver::shared());
        router.commit_source(tx(1, 2), 0, 1, 100).unwrap();
        let envelope = router.drain(1, 10).remove(0);
        assert_eq!(router.apply_at_destination(&envelope, 500), ApplyOutcome::Expired);
    }

    #[test]
    fn sweep_expired_clears_unresolved_pending_entries() {
        let router = CrossShardRouter::new(NullObserver::shared());
        router.commit_source(tx(1, 2), 0, 1, 100).unwrap();
        router.commit_source(tx(3, 4), 0, 1, 10_000).unwrap();

        let failed = router.sweep_expired(500);
        assert_eq!(failed.len(), 1);
        assert_eq!(router.pending_len(), 1);
    }

    #[test]
    fn resolve_source_clears_pending_entry() {
        let router = CrossShardRouter::new(NullObserver::shared());
        let id = router.commit_source(tx(1, 2), 0, 1, 1_000).unwrap();
        router.resolve_source(&id, ApplyOutcome::Applied);
        assert_eq!(router.pending_len(), 0);
    }

    #[test]
    fn requeue_restores_drained_envelopes_in_order() {
        let router = CrossShardRouter::new(NullObserver::shared());
        router.commit_source(tx(1, 2), 0, 1, 1_000).unwrap();
        router.commit_source(tx(3, 4), 0, 1, 1_000).unwrap();

        let drained = router.drain(1, 10);
        assert_eq!(drained.len(), 2);
        assert!(router.drain(1, 10).is_empty());

        router.requeue(1, drained.clone());
        let redrained = router.drain(1, 10);
        assert_eq!(redrained.len(), 2);
        assert_eq!(redrained[0].message_id, drained[0].message_id);
        assert_eq!(redrained[1].message_id, drained[1].message_id);
    }
}
