//! Telemetry metric name constants.
//!
//! Centralised metric names for huginn operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! The in-process counters behind [`CacheStats`](crate::cache::CacheStats)
//! are kept regardless of whether a recorder is installed.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `huginn_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `reason` — why an entry left the cache: "capacity", "expired", "reaped"
//! - `miner` — pattern miner name (e.g. "template")

/// Total cache hits.
pub const CACHE_HITS_TOTAL: &str = "huginn_cache_hits_total";

/// Total cache misses (absent or expired).
pub const CACHE_MISSES_TOTAL: &str = "huginn_cache_misses_total";

/// Total cache insertions, including overwrites.
pub const CACHE_SETS_TOTAL: &str = "huginn_cache_sets_total";

/// Total entries removed by the cache itself.
///
/// Labels: `reason` ("capacity" | "expired" | "reaped").
pub const CACHE_EVICTIONS_TOTAL: &str = "huginn_cache_evictions_total";

/// Total lookups that skipped the cache because the batch was too small.
pub const CACHE_BYPASS_TOTAL: &str = "huginn_cache_bypass_total";

/// Time spent inside the pattern miner, in seconds.
///
/// Labels: `miner`.
pub const MINING_DURATION_SECONDS: &str = "huginn_mining_duration_seconds";
