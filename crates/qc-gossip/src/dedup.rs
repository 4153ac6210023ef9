//! Message-id deduplication with a TTL, shared by every inbound queue.

use shared_types::Hash;
use std::collections::HashMap;
use std::sync::Mutex;

/// Tracks recently seen message ids so a re-delivered gossip message (the
/// transport gives no cross-peer ordering or delivery-once guarantee) is
/// processed at most once within `ttl_secs`.
pub struct DedupCache {
    ttl_secs: i64,
    seen: Mutex<HashMap<Hash, i64>>,
}

impl DedupCache {
    /// Build a cache retaining each id for `ttl_secs` seconds.
    pub fn new(ttl_secs: i64) -> Self {
        Self { ttl_secs, seen: Mutex::new(HashMap::new()) }
    }

    /// Record `id` as seen at `now` and report whether it was already
    /// present (and not yet expired). A fresh id returns `false`; a
    /// duplicate within the TTL window returns `true` without resetting
    /// its expiry.
    pub fn check_and_insert(&self, id: Hash, now: i64) -> bool {
        let mut seen = self.seen.lock().unwrap();
        if let Some(expires_at) = seen.get(&id) {
            if *expires_at > now {
                return true;
            }
        }
        seen.insert(id, now + self.ttl_secs);
        false
    }

    /// Drop every entry whose TTL has elapsed as of `now`.
    pub fn sweep(&self, now: i64) {
        self.seen.lock().unwrap().retain(|_, expires_at| *expires_at > now);
    }

    /// Number of ids currently tracked (including possibly-expired ones
    /// not yet swept).
    pub fn len(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sighting_is_not_a_duplicate() {
        let cache = DedupCache::new(60);
        assert!(!cache.check_and_insert(Hash::from_slice(&[1u8; 32]).unwrap(), 0));
    }

    #[test]
    fn repeat_within_ttl_is_a_duplicate() {
        let cache = DedupCache::new(60);
        let id = Hash::from_slice(&[1u8; 32]).unwrap();
        assert!(!cache.check_and_insert(id, 0));
        assert!(cache.check_and_insert(id, 30));
    }

    #[test]
    fn repeat_after_ttl_is_treated_as_fresh() {
        let cache = DedupCache::new(60);
        let id = Hash::from_slice(&[1u8; 32]).unwrap();
        assert!(!cache.check_and_insert(id, 0));
        assert!(!cache.check_and_insert(id, 61));
    }

    #[test]
    fn sweep_drops_expired_entries() {
        let cache = DedupCache::new(10);
        cache.check_and_insert(Hash::from_slice(&[1u8; 32]).unwrap(), 0);
        cache.sweep(20);
        assert!(cache.is_empty());
    }
}
