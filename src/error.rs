//! Huginn error types

/// Huginn error types
///
/// The cache itself never fails; these cover construction, configuration
/// and the compute side of cache-aside lookups.
#[derive(Debug, thiserror::Error)]
pub enum HuginnError {
    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Data errors
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The pattern miner rejected or failed on a batch.
    #[error("pattern mining failed ({miner}): {message}")]
    Mining { miner: String, message: String },
}

/// Result type alias for Huginn operations
pub type Result<T> = std::result::Result<T, HuginnError>;
