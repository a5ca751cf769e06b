//! PatternGateway - cached pattern mining per caller scope

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument};

use crate::cache::{CacheAside, CacheStats, PatternCache};
use crate::miner::PatternMiner;
use crate::telemetry;
use crate::types::{LogPattern, LogRecord};
use crate::Result;

/// Resolves record batches to patterns, reusing cached results per scope.
///
/// The scope is the caller (tenant) identity; results mined for one scope
/// are never served to another.
pub struct PatternGateway {
    aside: CacheAside<Vec<LogPattern>>,
    miner: Arc<dyn PatternMiner>,
    owns_cache: bool,
}

impl PatternGateway {
    pub(crate) fn new(
        aside: CacheAside<Vec<LogPattern>>,
        miner: Arc<dyn PatternMiner>,
        owns_cache: bool,
    ) -> Self {
        Self {
            aside,
            miner,
            owns_cache,
        }
    }

    /// Patterns for `records` as seen by `scope`.
    #[instrument(skip(self, records), fields(records = records.len(), miner = self.miner.name()))]
    pub fn patterns(&self, records: &[LogRecord], scope: &str) -> Result<Arc<Vec<LogPattern>>> {
        self.aside
            .get_or_compute(records, scope, |batch| self.mine(batch))
    }

    fn mine(&self, records: &[LogRecord]) -> Result<Vec<LogPattern>> {
        let started = Instant::now();
        let patterns = self.miner.mine(records)?;
        let elapsed = started.elapsed();

        metrics::histogram!(
            telemetry::MINING_DURATION_SECONDS,
            "miner" => self.miner.name().to_string()
        )
        .record(elapsed.as_secs_f64());
        debug!(
            patterns = patterns.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "mined patterns"
        );
        Ok(patterns)
    }

    pub fn miner(&self) -> &Arc<dyn PatternMiner> {
        &self.miner
    }

    pub fn cache(&self) -> &Arc<PatternCache> {
        self.aside.cache()
    }

    pub fn min_batch_size(&self) -> usize {
        self.aside.min_batch_size()
    }

    pub fn stats(&self) -> CacheStats {
        self.cache().stats()
    }

    /// Drop every cached result for `scope`.
    pub fn invalidate_scope(&self, scope: &str) -> usize {
        self.cache().clear_scope(scope)
    }

    pub fn invalidate_all(&self) {
        self.cache().clear();
    }

    /// Stop the cache reaper if this gateway created the cache.
    pub async fn shutdown(&self) {
        if self.owns_cache {
            self.cache().close().await;
        }
    }
}
