//! Huginn - tool-calling gateway for log observability APIs
//!
//! Tool handlers fetch log batches from an observability backend and ask
//! Huginn to group similar lines into patterns. Pattern mining is expensive
//! and repeatable, so results go through a sharded TTL cache keyed on the
//! batch and the caller scope: identical requests from the same tenant are
//! served from memory, and no tenant ever sees another tenant's results.
//!
//! # Example
//!
//! ```rust
//! use huginn::{CacheConfig, Huginn, LogRecord};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> huginn::Result<()> {
//!     let gateway = Huginn::builder()
//!         .cache(CacheConfig::new().ttl(Duration::from_secs(120)))
//!         .min_batch_size(2)
//!         .build()?;
//!
//!     let batch = vec![
//!         LogRecord::info("user 17 logged in"),
//!         LogRecord::info("user 23 logged in"),
//!         LogRecord::error("payment 981 declined"),
//!     ];
//!
//!     let patterns = gateway.patterns(&batch, "tenant-a")?;
//!     assert_eq!(patterns[0].template, "user <*> logged in");
//!
//!     // Same batch, same tenant: served from the cache.
//!     gateway.patterns(&batch, "tenant-a")?;
//!     assert_eq!(gateway.stats().hits, 1);
//!
//!     gateway.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod cache;
#[cfg(feature = "config")]
pub mod config;
pub mod error;
pub mod gateway;
pub mod miner;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use cache::{CacheAside, CacheConfig, CacheStats, Fingerprint, PatternCache, ShardedCache};
pub use error::{HuginnError, Result};
pub use gateway::{Huginn, HuginnBuilder, PatternGateway};
pub use miner::{PatternMiner, TemplateMiner};
pub use types::{LogPattern, LogRecord, Severity};
