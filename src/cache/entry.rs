//! Cache entry.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::key::Fingerprint;

/// Deadline offset used when `now + ttl` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// One cached computation result plus its bookkeeping.
///
/// Entries are immutable once inserted apart from the hit counter, which is
/// atomic so readers can bump it under a shard's read lock.
#[derive(Debug)]
pub struct CacheEntry<V> {
    value: Arc<V>,
    created_at: Instant,
    expires_at: Instant,
    hits: AtomicU64,
    scope: Option<String>,
    fingerprint: Fingerprint,
}

impl<V> CacheEntry<V> {
    pub(crate) fn new(
        fingerprint: Fingerprint,
        scope: &str,
        value: Arc<V>,
        ttl: Duration,
        now: Instant,
    ) -> Self {
        Self {
            value,
            created_at: now,
            expires_at: now
                .checked_add(ttl)
                .or_else(|| now.checked_add(FAR_FUTURE))
                .unwrap_or(now),
            hits: AtomicU64::new(0),
            scope: (!scope.is_empty()).then(|| scope.to_string()),
            fingerprint,
        }
    }

    pub fn value(&self) -> &Arc<V> {
        &self.value
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Caller scope, `None` for unscoped entries.
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Whether the entry is past its TTL at `now`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now > self.expires_at
    }

    /// Whether the entry belongs to `scope` (empty string matches unscoped).
    pub fn in_scope(&self, scope: &str) -> bool {
        self.scope.as_deref().unwrap_or("") == scope
    }

    pub fn age_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    /// Count a successful read, returning the new hit count.
    pub(crate) fn record_hit(&self) -> u64 {
        self.hits.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::FINGERPRINT_LEN;

    fn entry(scope: &str, ttl: Duration, now: Instant) -> CacheEntry<u32> {
        CacheEntry::new(
            Fingerprint::from_bytes([1; FINGERPRINT_LEN]),
            scope,
            Arc::new(7),
            ttl,
            now,
        )
    }

    #[test]
    fn expiry_is_strictly_after_deadline() {
        let now = Instant::now();
        let e = entry("", Duration::from_secs(5), now);
        assert!(!e.is_expired_at(now + Duration::from_secs(5)));
        assert!(e.is_expired_at(now + Duration::from_secs(6)));
    }

    #[test]
    fn empty_scope_is_unscoped() {
        let now = Instant::now();
        let e = entry("", Duration::from_secs(1), now);
        assert_eq!(e.scope(), None);
        assert!(e.in_scope(""));
        assert!(!e.in_scope("userA"));

        let scoped = entry("userA", Duration::from_secs(1), now);
        assert_eq!(scoped.scope(), Some("userA"));
        assert!(scoped.in_scope("userA"));
        assert!(!scoped.in_scope(""));
    }

    #[test]
    fn huge_ttl_saturates_instead_of_overflowing() {
        let now = Instant::now();
        let e = entry("", Duration::MAX, now);
        assert!(e.expires_at() > now);
        assert!(!e.is_expired_at(now + Duration::from_secs(365 * 24 * 60 * 60)));
    }

    #[test]
    fn hits_accumulate() {
        let e = entry("", Duration::from_secs(1), Instant::now());
        assert_eq!(e.record_hit(), 1);
        assert_eq!(e.record_hit(), 2);
        assert_eq!(e.hit_count(), 2);
    }
}
