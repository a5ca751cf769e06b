//! Properties of cache key derivation.

use proptest::prelude::*;

use huginn::cache::{KEY_SAMPLE_SIZE, KeyDeriver};
use huginn::types::{LogRecord, Severity};

fn severity() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::Debug),
        Just(Severity::Info),
        Just(Severity::Warn),
        Just(Severity::Error),
    ]
}

fn record() -> impl Strategy<Value = LogRecord> {
    ("[a-z0-9 ]{0,40}", severity()).prop_map(|(msg, sev)| LogRecord::new(sev, msg))
}

proptest! {
    #[test]
    fn derivation_is_deterministic(
        records in prop::collection::vec(record(), 0..40),
        scope in "[a-zA-Z0-9-]{0,12}",
    ) {
        let d = KeyDeriver::new();
        prop_assert_eq!(d.derive(&records, &scope), d.derive(&records, &scope));
    }

    #[test]
    fn scopes_never_collide(
        records in prop::collection::vec(record(), 0..10),
        a in "[a-z]{1,8}",
        b in "[a-z]{1,8}",
    ) {
        prop_assume!(a != b);
        let d = KeyDeriver::new();
        prop_assert_ne!(d.derive(&records, &a), d.derive(&records, &b));
    }

    #[test]
    fn distinct_sampled_batches_differ(
        a in prop::collection::vec(record(), 1..KEY_SAMPLE_SIZE),
        b in prop::collection::vec(record(), 1..KEY_SAMPLE_SIZE),
    ) {
        prop_assume!(a != b);
        let d = KeyDeriver::new();
        prop_assert_ne!(d.derive(&a, ""), d.derive(&b, ""));
    }
}

#[test]
fn realistic_corpus_has_no_collisions() {
    let d = KeyDeriver::new();
    let mut seen = std::collections::HashSet::new();
    for service in ["api", "worker", "db"] {
        for n in 1..=50 {
            let records: Vec<_> = (0..n)
                .map(|i| LogRecord::info(format!("{service} handled request {i}")))
                .collect();
            for scope in ["", "tenant-1", "tenant-2"] {
                assert!(seen.insert(d.derive(&records, scope)));
            }
        }
    }
    assert_eq!(seen.len(), 3 * 50 * 3);
}

/// Records past the sampled prefix don't feed the key, so batches that agree
/// on the prefix and length share one cache entry.
#[test]
fn prefix_equal_batches_share_a_key() {
    let d = KeyDeriver::new();
    let prefix: Vec<_> = (0..KEY_SAMPLE_SIZE)
        .map(|i| LogRecord::info(format!("line {i}")))
        .collect();

    let mut a = prefix.clone();
    a.push(LogRecord::info("tail one"));
    let mut b = prefix;
    b.push(LogRecord::error("a completely different tail"));

    assert_eq!(d.derive(&a, "s"), d.derive(&b, "s"));
}

#[tokio::test]
async fn prefix_equal_batches_share_a_cache_entry() {
    use huginn::cache::{CacheConfig, ShardedCache};

    let cache: ShardedCache<&'static str> = ShardedCache::new(&CacheConfig::default()).unwrap();
    let prefix: Vec<_> = (0..KEY_SAMPLE_SIZE)
        .map(|i| LogRecord::info(format!("line {i}")))
        .collect();
    let mut a = prefix.clone();
    a.push(LogRecord::info("x"));
    let mut b = prefix;
    b.push(LogRecord::info("y"));

    cache.set(&a, "from a", "");
    assert_eq!(cache.get(&b, "").as_deref(), Some(&"from a"));
    cache.close().await;
}
