//! Cache counters and statistics snapshots.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};

use super::entry::CacheEntry;

/// Process-wide cache counters, updated lock-free.
#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    evictions: AtomicU64,
}

impl CacheCounters {
    pub fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn evicted(&self, n: usize) {
        if n > 0 {
            self.evictions.fetch_add(n as u64, Ordering::Relaxed);
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn sets(&self) -> u64 {
        self.sets.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
}

/// Running totals gathered while walking the shards for a snapshot.
#[derive(Debug, Default)]
pub(crate) struct StatsAccumulator {
    size: usize,
    expired: usize,
    total_age: Duration,
    scopes: HashSet<String>,
}

impl StatsAccumulator {
    pub fn observe<V>(&mut self, entry: &CacheEntry<V>, now: Instant) {
        self.size += 1;
        if entry.is_expired_at(now) {
            self.expired += 1;
        }
        self.total_age += entry.age_at(now);
        if let Some(scope) = entry.scope() {
            if !self.scopes.contains(scope) {
                self.scopes.insert(scope.to_string());
            }
        }
    }
}

/// Point-in-time view of the cache.
///
/// Entry-level figures (`size`, `expired_pending`, `scope_count`,
/// `avg_entry_age_secs`) are gathered shard by shard, so under concurrent
/// writes they are approximate. Counters are exact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Entries currently stored, including expired ones not yet removed.
    pub size: usize,
    /// `max_entries_per_shard * shard_count`.
    pub max_size: usize,
    #[serde(rename = "ttl_secs", serialize_with = "as_secs_f64")]
    pub ttl: Duration,
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub evictions: u64,
    /// Stored entries already past their TTL, awaiting the reaper or a read.
    pub expired_pending: usize,
    pub shard_count: usize,
    /// `hits / (hits + misses)`, `0.0` before any lookup.
    pub hit_rate: f64,
    /// Distinct non-empty scopes with at least one stored entry.
    pub scope_count: usize,
    pub avg_entry_age_secs: f64,
}

impl CacheStats {
    pub(crate) fn build(
        acc: StatsAccumulator,
        counters: &CacheCounters,
        max_size: usize,
        ttl: Duration,
        shard_count: usize,
    ) -> Self {
        let hits = counters.hits();
        let misses = counters.misses();
        let avg_entry_age_secs = if acc.size == 0 {
            0.0
        } else {
            acc.total_age.as_secs_f64() / acc.size as f64
        };

        Self {
            size: acc.size,
            max_size,
            ttl,
            hits,
            misses,
            sets: counters.sets(),
            evictions: counters.evictions(),
            expired_pending: acc.expired,
            shard_count,
            hit_rate: hit_rate(hits, misses),
            scope_count: acc.scopes.len(),
            avg_entry_age_secs,
        }
    }
}

fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

fn as_secs_f64<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}
