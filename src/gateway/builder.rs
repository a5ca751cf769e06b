//! Builder for configuring gateway instances

use std::sync::Arc;

use super::PatternGateway;
use crate::Result;
use crate::cache::aside::DEFAULT_MIN_BATCH_SIZE;
use crate::cache::{CacheAside, CacheConfig, PatternCache};
use crate::miner::{PatternMiner, TemplateMiner};

/// Main entry point for creating gateway instances.
pub struct Huginn;

impl Huginn {
    /// Create a new builder for configuring the gateway.
    pub fn builder() -> HuginnBuilder {
        HuginnBuilder::new()
    }
}

/// Builder for configuring gateway instances.
pub struct HuginnBuilder {
    cache_config: CacheConfig,
    shared_cache: Option<Arc<PatternCache>>,
    min_batch_size: usize,
    miner: Option<Arc<dyn PatternMiner>>,
}

impl Default for HuginnBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HuginnBuilder {
    pub fn new() -> Self {
        Self {
            cache_config: CacheConfig::default(),
            shared_cache: None,
            min_batch_size: DEFAULT_MIN_BATCH_SIZE,
            miner: None,
        }
    }

    /// Configure the cache this gateway creates and owns.
    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    /// Use an existing cache instead of creating one.
    ///
    /// The gateway will not close a shared cache on
    /// [`shutdown`](PatternGateway::shutdown); its owner must.
    pub fn shared_cache(mut self, cache: Arc<PatternCache>) -> Self {
        self.shared_cache = Some(cache);
        self
    }

    /// Batches shorter than this bypass the cache (default: 10).
    pub fn min_batch_size(mut self, n: usize) -> Self {
        self.min_batch_size = n;
        self
    }

    /// Pattern miner to run on cache misses (default: [`TemplateMiner`]).
    pub fn miner(mut self, miner: Arc<dyn PatternMiner>) -> Self {
        self.miner = Some(miner);
        self
    }

    /// Build the gateway. Must be called inside a tokio runtime when the
    /// gateway creates its own cache, since the cache starts a reaper task.
    pub fn build(self) -> Result<PatternGateway> {
        let miner = self
            .miner
            .unwrap_or_else(|| Arc::new(TemplateMiner::new()));

        let (cache, owns_cache) = match self.shared_cache {
            Some(cache) => (cache, false),
            None => (Arc::new(PatternCache::new(&self.cache_config)?), true),
        };

        Ok(PatternGateway::new(
            CacheAside::new(cache, self.min_batch_size),
            miner,
            owns_cache,
        ))
    }
}
