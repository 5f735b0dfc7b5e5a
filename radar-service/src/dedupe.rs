//! Bounded, time-expiring record of claimed delivery ids.
//!
//! GitHub redelivers a webhook with the same `X-GitHub-Delivery` id. When
//! enabled, the web layer claims each id before dispatch and releases it if
//! handling fails, so only failed deliveries are processed again.

use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

/// Remembers delivery ids for `ttl`, holding at most `capacity` of them.
pub struct DeliveryLog {
    capacity: usize,
    ttl: Duration,
    /// id -> time it was claimed
    claims: DashMap<String, Instant>,
}

impl DeliveryLog {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            claims: DashMap::new(),
        }
    }

    /// Atomically claim `id`.
    ///
    /// Returns `true` if the id was unclaimed or its claim had expired,
    /// `false` if another delivery with this id is in flight or was handled
    /// within the last `ttl`.
    pub fn try_claim(&self, id: &str) -> bool {
        self.try_claim_at(id, Instant::now())
    }

    /// Drop the claim on `id` so a redelivery is handled again.
    pub fn release(&self, id: &str) {
        self.claims.remove(id);
    }

    fn try_claim_at(&self, id: &str, now: Instant) -> bool {
        let claimed = match self.claims.entry(id.to_string()) {
            Entry::Occupied(mut entry) => {
                if now.duration_since(*entry.get()) < self.ttl {
                    false
                } else {
                    entry.insert(now);
                    true
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        };

        // The entry guard is dropped here; shard-wide operations are safe.
        if claimed && self.claims.len() > self.capacity {
            self.shrink(now);
        }

        claimed
    }

    /// Purge expired claims, then the oldest ones while over capacity.
    fn shrink(&self, now: Instant) {
        let ttl = self.ttl;
        self.claims
            .retain(|_, claimed| now.duration_since(*claimed) < ttl);

        while self.claims.len() > self.capacity {
            let oldest = self
                .claims
                .iter()
                .min_by_key(|entry| *entry.value())
                .map(|entry| entry.key().clone());

            match oldest {
                Some(id) => {
                    debug!(delivery_id = %id, "delivery_log_evicted");
                    self.claims.remove(&id);
                }
                None => break,
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.claims.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_is_exclusive() {
        let log = DeliveryLog::new(8, Duration::from_secs(60));
        assert!(log.try_claim("a"));
        assert!(!log.try_claim("a"));
        assert!(log.try_claim("b"));
    }

    #[test]
    fn test_release_allows_reclaim() {
        let log = DeliveryLog::new(8, Duration::from_secs(60));
        assert!(log.try_claim("a"));
        log.release("a");
        assert!(log.try_claim("a"));
    }

    #[test]
    fn test_claims_expire() {
        let log = DeliveryLog::new(8, Duration::from_secs(60));
        let start = Instant::now();

        assert!(log.try_claim_at("a", start));
        assert!(!log.try_claim_at("a", start + Duration::from_secs(59)));
        assert!(log.try_claim_at("a", start + Duration::from_secs(60)));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let log = DeliveryLog::new(2, Duration::from_secs(60));
        let start = Instant::now();

        assert!(log.try_claim_at("a", start));
        assert!(log.try_claim_at("b", start + Duration::from_millis(1)));
        assert!(log.try_claim_at("c", start + Duration::from_millis(2)));
        assert_eq!(log.len(), 2);

        let now = start + Duration::from_millis(3);
        assert!(!log.try_claim_at("b", now));
        assert!(!log.try_claim_at("c", now));
        assert!(log.try_claim_at("a", now));
    }

    #[test]
    fn test_expired_claims_purged_before_eviction() {
        let log = DeliveryLog::new(2, Duration::from_secs(60));
        let start = Instant::now();

        assert!(log.try_claim_at("old", start));
        assert!(log.try_claim_at("b", start + Duration::from_secs(30)));
        assert!(log.try_claim_at("c", start + Duration::from_secs(61)));

        let now = start + Duration::from_secs(62);
        assert_eq!(log.len(), 2);
        assert!(!log.try_claim_at("b", now));
        assert!(!log.try_claim_at("c", now));
    }

    #[test]
    fn test_concurrent_claims_admit_one() {
        let log = std::sync::Arc::new(DeliveryLog::new(64, Duration::from_secs(60)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let log = log.clone();
                std::thread::spawn(move || log.try_claim("same-id"))
            })
            .collect();

        let claimed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(claimed, 1);
    }
}
