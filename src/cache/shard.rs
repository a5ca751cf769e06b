//! Cache shards and shard routing.
//!
//! # Design
//!
//! - Each shard owns its own `RwLock`, so operations on keys in different
//!   shards never contend
//! - The shard array is fixed at construction and never resized, so it is
//!   read without any lock
//! - Eviction runs synchronously under the write lock taken for insertion,
//!   so a shard is never above capacity once `insert` returns

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use super::entry::CacheEntry;
use super::key::Fingerprint;
use super::stats::StatsAccumulator;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a over `bytes`.
#[inline]
pub fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Maps fingerprints onto shard indices.
///
/// Deterministic: a fingerprint always routes to the same shard, which is
/// what makes `get` find what `set` stored.
#[derive(Debug, Clone, Copy)]
pub struct ShardRouter {
    shard_count: usize,
}

impl ShardRouter {
    /// `shard_count` must be non-zero; [`CacheConfig::validate`](super::CacheConfig::validate)
    /// enforces this before a router is built.
    pub fn new(shard_count: usize) -> Self {
        Self {
            shard_count: shard_count.max(1),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    #[inline]
    pub fn route(&self, fingerprint: &Fingerprint) -> usize {
        (fnv1a(fingerprint.as_bytes()) % self.shard_count as u64) as usize
    }
}

/// Outcome of a shard lookup.
pub(crate) enum Lookup<V> {
    Hit { value: Arc<V>, hits: u64 },
    /// Entry was present but past its TTL; it has been removed.
    Expired,
    Absent,
}

/// Entries removed while making room for an insertion.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Eviction {
    pub expired: usize,
    pub capacity: usize,
}

impl Eviction {
    pub fn total(&self) -> usize {
        self.expired + self.capacity
    }
}

/// One independently locked partition of the cache.
pub(crate) struct Shard<V> {
    entries: RwLock<HashMap<Fingerprint, CacheEntry<V>>>,
    capacity: usize,
}

impl<V> Shard<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Look up a live entry, removing it if it has expired.
    pub fn get(&self, fingerprint: &Fingerprint, now: Instant) -> Lookup<V> {
        {
            let entries = self.entries.read();
            match entries.get(fingerprint) {
                None => return Lookup::Absent,
                Some(entry) if !entry.is_expired_at(now) => {
                    let hits = entry.record_hit();
                    return Lookup::Hit {
                        value: Arc::clone(entry.value()),
                        hits,
                    };
                }
                Some(_) => {}
            }
        }

        // Re-check under the write lock: a concurrent insert may have
        // replaced the expired entry, or the reaper may have removed it.
        let mut entries = self.entries.write();
        match entries.get(fingerprint) {
            Some(entry) if entry.is_expired_at(now) => {
                entries.remove(fingerprint);
                Lookup::Expired
            }
            Some(entry) => {
                let hits = entry.record_hit();
                Lookup::Hit {
                    value: Arc::clone(entry.value()),
                    hits,
                }
            }
            None => Lookup::Absent,
        }
    }

    /// Hit count of a stored entry, without counting as a read.
    pub fn hit_count(&self, fingerprint: &Fingerprint) -> Option<u64> {
        self.entries.read().get(fingerprint).map(CacheEntry::hit_count)
    }

    /// Insert or overwrite an entry, evicting first if a new key would
    /// push the shard past capacity.
    pub fn insert(&self, entry: CacheEntry<V>, now: Instant) -> Eviction {
        let fingerprint = entry.fingerprint();
        let mut entries = self.entries.write();

        let eviction = if !entries.contains_key(&fingerprint) && entries.len() >= self.capacity {
            evict(&mut entries, now)
        } else {
            Eviction::default()
        };

        entries.insert(fingerprint, entry);
        eviction
    }

    /// Remove every expired entry, returning how many were removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        before - entries.len()
    }

    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write();
        let removed = entries.len();
        entries.clear();
        removed
    }

    /// Remove entries stored under `scope` (empty string: unscoped entries).
    pub fn clear_scope(&self, scope: &str) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.in_scope(scope));
        before - entries.len()
    }

    pub fn observe(&self, now: Instant, acc: &mut StatsAccumulator) {
        let entries = self.entries.read();
        for entry in entries.values() {
            acc.observe(entry, now);
        }
    }
}

/// Single pass over a full shard: drop everything expired, and if nothing
/// was expired drop the oldest live entry instead.
fn evict<V>(entries: &mut HashMap<Fingerprint, CacheEntry<V>>, now: Instant) -> Eviction {
    let before = entries.len();
    let mut oldest: Option<(Fingerprint, Instant)> = None;

    entries.retain(|fingerprint, entry| {
        if entry.is_expired_at(now) {
            return false;
        }
        if oldest.is_none_or(|(_, created)| entry.created_at() < created) {
            oldest = Some((*fingerprint, entry.created_at()));
        }
        true
    });

    let expired = before - entries.len();
    if expired > 0 {
        return Eviction {
            expired,
            capacity: 0,
        };
    }

    match oldest {
        Some((fingerprint, _)) => {
            entries.remove(&fingerprint);
            Eviction {
                expired: 0,
                capacity: 1,
            }
        }
        None => Eviction::default(),
    }
}
