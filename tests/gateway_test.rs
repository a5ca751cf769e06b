//! Tests for [`PatternGateway`] — cache-aside mining per scope.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use huginn::cache::{CacheConfig, PatternCache};
use huginn::{Huginn, HuginnError, LogPattern, LogRecord, PatternMiner, Result, TemplateMiner};

/// Miner that counts invocations and delegates to [`TemplateMiner`].
#[derive(Default)]
struct CountingMiner {
    calls: AtomicUsize,
}

impl PatternMiner for CountingMiner {
    fn name(&self) -> &str {
        "counting"
    }

    fn mine(&self, records: &[LogRecord]) -> Result<Vec<LogPattern>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        TemplateMiner::new().mine(records)
    }
}

struct FailingMiner;

impl PatternMiner for FailingMiner {
    fn name(&self) -> &str {
        "failing"
    }

    fn mine(&self, _records: &[LogRecord]) -> Result<Vec<LogPattern>> {
        Err(HuginnError::Mining {
            miner: "failing".to_string(),
            message: "backend unavailable".to_string(),
        })
    }
}

fn login_batch(n: usize) -> Vec<LogRecord> {
    (0..n)
        .map(|i| LogRecord::info(format!("user {i} logged in")))
        .collect()
}

#[tokio::test]
async fn default_gateway_mines_with_template_miner() {
    let gateway = Huginn::builder().min_batch_size(1).build().unwrap();
    assert_eq!(gateway.miner().name(), "template");
    assert_eq!(gateway.min_batch_size(), 1);

    let patterns = gateway.patterns(&login_batch(5), "").unwrap();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].template, "user <*> logged in");
    assert_eq!(patterns[0].count, 5);
    gateway.shutdown().await;
}

#[tokio::test]
async fn repeated_requests_mine_once() {
    let miner = Arc::new(CountingMiner::default());
    let gateway = Huginn::builder()
        .miner(miner.clone())
        .min_batch_size(10)
        .build()
        .unwrap();

    let records = login_batch(20);
    let first = gateway.patterns(&records, "tenant").unwrap();
    let second = gateway.patterns(&records, "tenant").unwrap();

    assert_eq!(miner.calls.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(gateway.stats().hits, 1);
    gateway.shutdown().await;
}

#[tokio::test]
async fn small_batches_are_always_mined() {
    let miner = Arc::new(CountingMiner::default());
    let gateway = Huginn::builder()
        .miner(miner.clone())
        .min_batch_size(10)
        .build()
        .unwrap();

    let records = login_batch(3);
    gateway.patterns(&records, "").unwrap();
    gateway.patterns(&records, "").unwrap();

    assert_eq!(miner.calls.load(Ordering::SeqCst), 2);
    assert!(gateway.cache().is_empty());
    gateway.shutdown().await;
}

#[tokio::test]
async fn tenants_are_mined_separately() {
    let miner = Arc::new(CountingMiner::default());
    let gateway = Huginn::builder()
        .miner(miner.clone())
        .min_batch_size(1)
        .build()
        .unwrap();

    let records = login_batch(12);
    gateway.patterns(&records, "userA").unwrap();
    gateway.patterns(&records, "userB").unwrap();
    assert_eq!(miner.calls.load(Ordering::SeqCst), 2);
    assert_eq!(gateway.stats().scope_count, 2);

    assert_eq!(gateway.invalidate_scope("userA"), 1);
    gateway.patterns(&records, "userB").unwrap();
    assert_eq!(miner.calls.load(Ordering::SeqCst), 2);
    gateway.patterns(&records, "userA").unwrap();
    assert_eq!(miner.calls.load(Ordering::SeqCst), 3);

    gateway.invalidate_all();
    assert!(gateway.cache().is_empty());
    gateway.shutdown().await;
}

#[tokio::test]
async fn miner_errors_propagate_and_are_not_cached() {
    let gateway = Huginn::builder()
        .miner(Arc::new(FailingMiner))
        .min_batch_size(1)
        .build()
        .unwrap();

    let err = gateway.patterns(&login_batch(4), "").unwrap_err();
    assert!(matches!(err, HuginnError::Mining { .. }));
    assert!(err.to_string().contains("backend unavailable"));
    assert!(gateway.cache().is_empty());
    gateway.shutdown().await;
}

#[tokio::test]
async fn invalid_cache_config_fails_build() {
    let result = Huginn::builder()
        .cache(CacheConfig::new().shard_count(0))
        .build();
    assert!(matches!(result, Err(HuginnError::Configuration(_))));
}

#[tokio::test]
async fn gateways_can_share_one_cache() {
    let cache = Arc::new(PatternCache::new(&CacheConfig::default()).unwrap());
    let miner = Arc::new(CountingMiner::default());

    let a = Huginn::builder()
        .shared_cache(Arc::clone(&cache))
        .miner(miner.clone())
        .min_batch_size(1)
        .build()
        .unwrap();
    let b = Huginn::builder()
        .shared_cache(Arc::clone(&cache))
        .miner(miner.clone())
        .min_batch_size(1)
        .build()
        .unwrap();

    let records = login_batch(15);
    a.patterns(&records, "tenant").unwrap();
    b.patterns(&records, "tenant").unwrap();
    assert_eq!(miner.calls.load(Ordering::SeqCst), 1);

    // Gateways don't close a cache they were handed.
    a.shutdown().await;
    b.shutdown().await;
    assert!(b.patterns(&records, "tenant").is_ok());
    cache.close().await;
}
