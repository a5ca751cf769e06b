//! Cache-aside wrapper.
//!
//! [`CacheAside`] gives call sites one `get_or_compute` call: look up the
//! batch, run the compute function on a miss, store the result, return it.
//! The cache never invokes compute on its own, and compute always runs
//! outside every shard lock.
//!
//! # Small batches
//!
//! Batches shorter than `min_batch_size` skip the cache entirely. For small
//! inputs, deriving a key and managing an entry costs more than recomputing,
//! and caching them would crowd out the large batches worth keeping.
//!
//! Concurrent misses on the same key both compute and both store; the later
//! store wins. Results are deterministic for a given batch, so this only
//! costs duplicate work.

use std::future::Future;
use std::sync::Arc;

use tracing::trace;

use super::ShardedCache;
use crate::telemetry;
use crate::types::LogRecord;

/// Default minimum batch length worth caching.
pub const DEFAULT_MIN_BATCH_SIZE: usize = 10;

/// Get-or-compute front end for a shared [`ShardedCache`].
#[derive(Debug)]
pub struct CacheAside<V> {
    cache: Arc<ShardedCache<V>>,
    min_batch_size: usize,
}

impl<V> Clone for CacheAside<V> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            min_batch_size: self.min_batch_size,
        }
    }
}

impl<V: Send + Sync + 'static> CacheAside<V> {
    pub fn new(cache: Arc<ShardedCache<V>>, min_batch_size: usize) -> Self {
        Self {
            cache,
            min_batch_size,
        }
    }

    pub fn cache(&self) -> &Arc<ShardedCache<V>> {
        &self.cache
    }

    pub fn min_batch_size(&self) -> usize {
        self.min_batch_size
    }

    /// Whether a batch of this size goes through the cache at all.
    pub fn is_cacheable(&self, records: &[LogRecord]) -> bool {
        records.len() >= self.min_batch_size
    }

    /// Return the cached value for `(records, scope)`, computing and storing
    /// it on a miss. Compute errors are returned as-is and nothing is cached.
    pub fn get_or_compute<F, E>(
        &self,
        records: &[LogRecord],
        scope: &str,
        compute: F,
    ) -> Result<Arc<V>, E>
    where
        F: FnOnce(&[LogRecord]) -> Result<V, E>,
    {
        if !self.is_cacheable(records) {
            self.note_bypass(records);
            return compute(records).map(Arc::new);
        }

        let fingerprint = self.cache.fingerprint(records, scope);
        if let Some(value) = self.cache.lookup(&fingerprint) {
            return Ok(value);
        }

        let value = Arc::new(compute(records)?);
        self.cache.insert(fingerprint, Arc::clone(&value), scope);
        Ok(value)
    }

    /// Async variant of [`get_or_compute`](Self::get_or_compute); `compute`
    /// is only called (and its future only awaited) on a miss.
    pub async fn get_or_compute_async<F, Fut, E>(
        &self,
        records: &[LogRecord],
        scope: &str,
        compute: F,
    ) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if !self.is_cacheable(records) {
            self.note_bypass(records);
            return compute().await.map(Arc::new);
        }

        let fingerprint = self.cache.fingerprint(records, scope);
        if let Some(value) = self.cache.lookup(&fingerprint) {
            return Ok(value);
        }

        let value = Arc::new(compute().await?);
        self.cache.insert(fingerprint, Arc::clone(&value), scope);
        Ok(value)
    }

    fn note_bypass(&self, records: &[LogRecord]) {
        metrics::counter!(telemetry::CACHE_BYPASS_TOTAL).increment(1);
        trace!(
            len = records.len(),
            min = self.min_batch_size,
            "batch below cache threshold"
        );
    }
}
