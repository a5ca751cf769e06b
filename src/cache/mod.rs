//! Sharded TTL cache for pattern-mining results.
//!
//! [`ShardedCache`] sits in front of the pattern miner. It is keyed on a
//! [`Fingerprint`] of the record batch plus the caller scope, so identical
//! requests from the same tenant reuse one computation and tenants never
//! see each other's results.
//!
//! # Architecture
//!
//! - `shard_count` independent [`Shard`](shard)s, each a bounded map behind
//!   its own `parking_lot::RwLock`. A [`ShardRouter`] (FNV-1a) picks the
//!   shard for a fingerprint; the shard array never changes after
//!   construction.
//! - Global hit/miss/set/eviction counters are atomics, so stats never need
//!   a global lock.
//! - Expired entries are removed lazily when a read finds them, during
//!   capacity eviction, and by the background [`Reaper`].
//!
//! The cache never calls the compute function itself; see [`CacheAside`]
//! for the get-or-compute wrapper call sites use.
//!
//! # Usage
//!
//! ```rust
//! # use huginn::cache::{CacheConfig, ShardedCache};
//! # use huginn::types::LogRecord;
//! # use std::time::Duration;
//! # #[tokio::main]
//! # async fn main() -> huginn::Result<()> {
//! let cache: ShardedCache<String> = ShardedCache::new(
//!     &CacheConfig::new()
//!         .max_entries_per_shard(100)
//!         .ttl(Duration::from_secs(60)),
//! )?;
//!
//! let batch = vec![LogRecord::info("user 42 logged in")];
//! cache.set(&batch, "summary".to_string(), "tenant-a");
//! assert_eq!(cache.get(&batch, "tenant-a").as_deref().map(String::as_str), Some("summary"));
//! assert!(cache.get(&batch, "tenant-b").is_none());
//!
//! cache.close().await;
//! # Ok(())
//! # }
//! ```

pub mod aside;
pub mod entry;
pub mod key;
pub mod reaper;
pub mod shard;
pub mod stats;

pub use aside::CacheAside;
pub use entry::CacheEntry;
pub use key::{FINGERPRINT_LEN, Fingerprint, KEY_SAMPLE_SIZE, KeyDeriver};
pub use reaper::{Reaper, Sweep};
pub use shard::ShardRouter;
pub use stats::CacheStats;

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::telemetry;
use crate::types::{LogPattern, LogRecord};
use crate::{HuginnError, Result};
use shard::{Eviction, Lookup, Shard};
use stats::{CacheCounters, StatsAccumulator};

/// Cache of mined pattern lists, the shape the gateway stores.
pub type PatternCache = ShardedCache<Vec<LogPattern>>;

/// Longest accepted TTL (one year).
pub const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Configuration for a [`ShardedCache`].
///
/// ```rust
/// # use huginn::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries_per_shard(200)
///     .shard_count(32)
///     .ttl(Duration::from_secs(600));
/// assert_eq!(config.max_size(), 6_400);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Entry cap for each shard. Default: 50.
    pub max_entries_per_shard: usize,
    /// Time-to-live shared by every entry. Default: 5 minutes.
    pub ttl: Duration,
    /// Number of independently locked shards. Default: 16.
    pub shard_count: usize,
    /// How often the reaper sweeps for expired entries. Default: 1 minute.
    pub reaper_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries_per_shard: 50,
            ttl: Duration::from_secs(5 * 60),
            shard_count: 16,
            reaper_interval: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-shard entry cap.
    pub fn max_entries_per_shard(mut self, n: usize) -> Self {
        self.max_entries_per_shard = n;
        self
    }

    /// Set the time-to-live for cached entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the number of shards.
    pub fn shard_count(mut self, n: usize) -> Self {
        self.shard_count = n;
        self
    }

    /// Set the reaper sweep interval.
    pub fn reaper_interval(mut self, interval: Duration) -> Self {
        self.reaper_interval = interval;
        self
    }

    /// Total entry cap across all shards.
    pub fn max_size(&self) -> usize {
        self.max_entries_per_shard.saturating_mul(self.shard_count)
    }

    pub fn validate(&self) -> Result<()> {
        if self.shard_count == 0 {
            return Err(HuginnError::Configuration(
                "shard_count must be at least 1".to_string(),
            ));
        }
        if self.max_entries_per_shard == 0 {
            return Err(HuginnError::Configuration(
                "max_entries_per_shard must be at least 1".to_string(),
            ));
        }
        if self.ttl.is_zero() {
            return Err(HuginnError::Configuration("ttl must be non-zero".to_string()));
        }
        if self.ttl > MAX_TTL {
            return Err(HuginnError::Configuration(format!(
                "ttl must be at most {} seconds",
                MAX_TTL.as_secs()
            )));
        }
        if self.reaper_interval.is_zero() {
            return Err(HuginnError::Configuration(
                "reaper_interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// State shared between the cache handle and its reaper task.
struct CacheCore<V> {
    shards: Box<[Shard<V>]>,
    router: ShardRouter,
    deriver: KeyDeriver,
    counters: CacheCounters,
    ttl: Duration,
}

impl<V> CacheCore<V> {
    fn shard(&self, fingerprint: &Fingerprint) -> &Shard<V> {
        &self.shards[self.router.route(fingerprint)]
    }

    fn record_eviction(&self, eviction: Eviction) {
        if eviction.total() == 0 {
            return;
        }
        self.counters.evicted(eviction.total());
        if eviction.expired > 0 {
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL, "reason" => "expired")
                .increment(eviction.expired as u64);
        }
        if eviction.capacity > 0 {
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL, "reason" => "capacity")
                .increment(eviction.capacity as u64);
        }
    }
}

impl<V: Send + Sync + 'static> Sweep for CacheCore<V> {
    fn sweep(&self) -> usize {
        let mut removed = 0;
        for shard in self.shards.iter() {
            // One shard lock at a time; `now` is re-read per shard so a
            // slow sweep doesn't judge later shards by a stale clock.
            removed += shard.purge_expired(Instant::now());
        }
        if removed > 0 {
            self.counters.evicted(removed);
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL, "reason" => "reaped")
                .increment(removed as u64);
        }
        removed
    }
}

/// Sharded, TTL-bounded cache keyed on record batches and caller scope.
///
/// All operations are infallible: anything that prevents returning a live
/// value is reported as a miss. Values are stored behind `Arc`, so hits are
/// cheap clones.
///
/// Construction spawns a [`Reaper`] on the current tokio runtime. Call
/// [`close`](Self::close) once during shutdown to stop it; dropping the
/// cache also signals it to stop but does not wait.
pub struct ShardedCache<V> {
    core: Arc<CacheCore<V>>,
    config: CacheConfig,
    reaper: Mutex<Option<Reaper>>,
}

impl<V: Send + Sync + 'static> ShardedCache<V> {
    /// Build a cache and start its reaper.
    ///
    /// Fails if `config` is invalid or no tokio runtime is available.
    pub fn new(config: &CacheConfig) -> Result<Self> {
        config.validate()?;

        let shards = (0..config.shard_count)
            .map(|_| Shard::new(config.max_entries_per_shard))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        let core = Arc::new(CacheCore {
            shards,
            router: ShardRouter::new(config.shard_count),
            deriver: KeyDeriver::new(),
            counters: CacheCounters::default(),
            ttl: config.ttl,
        });
        let reaper = Reaper::spawn(Arc::clone(&core), config.reaper_interval)?;

        debug!(
            shards = config.shard_count,
            max_entries_per_shard = config.max_entries_per_shard,
            ttl_ms = config.ttl.as_millis() as u64,
            "cache created"
        );

        Ok(Self {
            core,
            config: config.clone(),
            reaper: Mutex::new(Some(reaper)),
        })
    }

    /// Build a cache with [`CacheConfig::default`].
    pub fn with_defaults() -> Result<Self> {
        Self::new(&CacheConfig::default())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Fingerprint `records` under `scope` the same way `get`/`set` do.
    pub fn fingerprint(&self, records: &[LogRecord], scope: &str) -> Fingerprint {
        self.core.deriver.derive(records, scope)
    }

    /// Look up the value stored for `records` under `scope`.
    pub fn get(&self, records: &[LogRecord], scope: &str) -> Option<Arc<V>> {
        self.lookup(&self.fingerprint(records, scope))
    }

    /// Look up by a precomputed fingerprint.
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<Arc<V>> {
        let core = &self.core;
        match core.shard(fingerprint).get(fingerprint, Instant::now()) {
            Lookup::Hit { value, hits } => {
                core.counters.hit();
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                trace!(%fingerprint, hits, "cache hit");
                Some(value)
            }
            Lookup::Expired => {
                core.counters.miss();
                core.record_eviction(Eviction {
                    expired: 1,
                    capacity: 0,
                });
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                trace!(%fingerprint, "cache miss (expired)");
                None
            }
            Lookup::Absent => {
                core.counters.miss();
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                trace!(%fingerprint, "cache miss");
                None
            }
        }
    }

    /// Store `value` for `records` under `scope`, replacing any previous
    /// entry and restarting its TTL.
    pub fn set(&self, records: &[LogRecord], value: impl Into<Arc<V>>, scope: &str) {
        let fingerprint = self.fingerprint(records, scope);
        self.insert(fingerprint, value.into(), scope);
    }

    /// Store by a precomputed fingerprint. `scope` is recorded on the entry
    /// for [`clear_scope`](Self::clear_scope); it should be the scope the
    /// fingerprint was derived with.
    pub fn insert(&self, fingerprint: Fingerprint, value: Arc<V>, scope: &str) {
        let core = &self.core;
        let now = Instant::now();
        let entry = CacheEntry::new(fingerprint, scope, value, core.ttl, now);

        let eviction = core.shard(&fingerprint).insert(entry, now);
        core.record_eviction(eviction);
        core.counters.set();
        metrics::counter!(telemetry::CACHE_SETS_TOTAL).increment(1);

        if eviction.total() > 0 {
            debug!(%fingerprint, expired = eviction.expired, capacity = eviction.capacity, "evicted to make room");
        }
    }

    /// Hit count of the entry for `records` under `scope`, without counting
    /// as a lookup. `None` if no entry is stored.
    pub fn entry_hits(&self, records: &[LogRecord], scope: &str) -> Option<u64> {
        let fingerprint = self.fingerprint(records, scope);
        self.core.shard(&fingerprint).hit_count(&fingerprint)
    }

    /// Remove every entry.
    pub fn clear(&self) {
        let removed: usize = self.core.shards.iter().map(Shard::clear).sum();
        debug!(removed, "cache cleared");
    }

    /// Remove every entry stored under `scope`, leaving other scopes intact.
    /// The empty scope addresses unscoped entries. Returns the number removed.
    pub fn clear_scope(&self, scope: &str) -> usize {
        let removed: usize = self
            .core
            .shards
            .iter()
            .map(|shard| shard.clear_scope(scope))
            .sum();
        debug!(scope, removed, "cache scope cleared");
        removed
    }

    /// Remove expired entries now instead of waiting for the reaper.
    pub fn purge_expired(&self) -> usize {
        self.core.sweep()
    }

    /// Entries currently stored, including expired ones not yet removed.
    pub fn len(&self) -> usize {
        self.core.shards.iter().map(Shard::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Per-shard entry counts, in shard order.
    pub fn shard_lens(&self) -> Vec<usize> {
        self.core.shards.iter().map(Shard::len).collect()
    }

    /// Snapshot of sizes and counters. Takes each shard's read lock in turn.
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let mut acc = StatsAccumulator::default();
        for shard in self.core.shards.iter() {
            shard.observe(now, &mut acc);
        }
        let max_size = self.core.shards.iter().map(Shard::capacity).sum();
        CacheStats::build(
            acc,
            &self.core.counters,
            max_size,
            self.core.ttl,
            self.core.shards.len(),
        )
    }

    /// Stop the reaper and wait for it to exit. Later calls return at once.
    pub async fn close(&self) {
        let reaper = self.reaper.lock().take();
        if let Some(reaper) = reaper {
            reaper.shutdown().await;
        }
    }
}

impl<V> Drop for ShardedCache<V> {
    fn drop(&mut self) {
        if let Some(reaper) = self.reaper.get_mut().take() {
            reaper.stop();
        }
    }
}

impl<V> std::fmt::Debug for ShardedCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedCache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
