//! Cache key derivation.
//!
//! A [`Fingerprint`] is a truncated SHA-256 digest over the caller scope and
//! a bounded sample of the batch. It identifies a cache entry; it is not a
//! security boundary and nothing else in the crate relies on it being
//! collision resistant.
//!
//! # Sampling
//!
//! Only the first [`KEY_SAMPLE_SIZE`] records contribute their content to the
//! digest, so key derivation costs the same for a batch of 25 or 25,000
//! records. The total record count is mixed in last, which separates batches
//! that share a prefix but differ in length.
//!
//! Batches of equal length that agree on the first [`KEY_SAMPLE_SIZE`]
//! records and differ only afterwards produce the **same** fingerprint and
//! therefore share a cache entry. This is an accepted trade-off: callers who
//! need exact reproducibility must supply records in a consistent order.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::types::LogRecord;

/// Number of leading records whose content feeds the fingerprint.
pub const KEY_SAMPLE_SIZE: usize = 20;

/// Length in bytes of a [`Fingerprint`].
pub const FINGERPRINT_LEN: usize = 16;

// Field and record separators keep adjacent strings from running together.
const FIELD_SEP: u8 = 0x1f;
const RECORD_SEP: u8 = 0x1e;

/// Fixed-width cache key for one `(batch, scope)` pair.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    pub fn from_bytes(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// Lowercase hex form, 32 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

/// Derives [`Fingerprint`]s from record batches.
#[derive(Debug, Clone, Copy)]
pub struct KeyDeriver {
    sample_size: usize,
}

impl Default for KeyDeriver {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyDeriver {
    /// Deriver sampling the default [`KEY_SAMPLE_SIZE`] records.
    pub const fn new() -> Self {
        Self {
            sample_size: KEY_SAMPLE_SIZE,
        }
    }

    /// Deriver sampling a custom number of leading records.
    pub const fn with_sample_size(sample_size: usize) -> Self {
        Self { sample_size }
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Compute the fingerprint for `records` under `scope`.
    ///
    /// An empty `scope` means unscoped. The scope is hashed before any record
    /// content, so the same batch under two scopes never shares a key.
    pub fn derive(&self, records: &[LogRecord], scope: &str) -> Fingerprint {
        let mut hasher = Sha256::new();

        if !scope.is_empty() {
            hasher.update(b"scope:");
            hasher.update(scope.as_bytes());
            hasher.update([RECORD_SEP]);
        }

        for record in records.iter().take(self.sample_size) {
            hasher.update(record.message.as_bytes());
            hasher.update([FIELD_SEP]);
            hasher.update(record.severity.as_str().as_bytes());
            hasher.update([RECORD_SEP]);
        }

        hasher.update(b"count:");
        hasher.update((records.len() as u64).to_le_bytes());

        let digest = hasher.finalize();
        let mut bytes = [0u8; FINGERPRINT_LEN];
        bytes.copy_from_slice(&digest[..FINGERPRINT_LEN]);
        Fingerprint(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;

    fn batch(prefix: &str, n: usize) -> Vec<LogRecord> {
        (0..n)
            .map(|i| LogRecord::info(format!("{prefix} request {i} served")))
            .collect()
    }

    #[test]
    fn deterministic() {
        let d = KeyDeriver::new();
        let records = batch("a", 5);
        assert_eq!(d.derive(&records, "tenant"), d.derive(&records, "tenant"));
    }

    #[test]
    fn empty_batch_and_scope_still_produce_a_key() {
        let d = KeyDeriver::new();
        let k = d.derive(&[], "");
        assert_eq!(k, d.derive(&[], ""));
        assert_eq!(k.to_hex().len(), FINGERPRINT_LEN * 2);
    }

    #[test]
    fn scope_changes_key() {
        let d = KeyDeriver::new();
        let records = batch("a", 3);
        assert_ne!(d.derive(&records, "userA"), d.derive(&records, "userB"));
        assert_ne!(d.derive(&records, ""), d.derive(&records, "userA"));
    }

    #[test]
    fn severity_changes_key() {
        let d = KeyDeriver::new();
        let a = vec![LogRecord::new(Severity::Info, "disk full")];
        let b = vec![LogRecord::new(Severity::Error, "disk full")];
        assert_ne!(d.derive(&a, ""), d.derive(&b, ""));
    }

    #[test]
    fn length_terminator_separates_prefix_batches() {
        let d = KeyDeriver::new();
        let short = batch("a", 3);
        let long = batch("a", 4);
        assert_ne!(d.derive(&short, ""), d.derive(&long, ""));
    }

    #[test]
    fn field_boundaries_matter() {
        let d = KeyDeriver::new();
        let a = vec![LogRecord::info("ab"), LogRecord::info("c")];
        let b = vec![LogRecord::info("a"), LogRecord::info("bc")];
        assert_ne!(d.derive(&a, ""), d.derive(&b, ""));
    }

    #[test]
    fn records_past_the_sample_do_not_affect_key() {
        let d = KeyDeriver::new();
        let mut a = batch("a", KEY_SAMPLE_SIZE + 5);
        let b = a.clone();
        a[KEY_SAMPLE_SIZE + 2] = LogRecord::error("something else entirely");
        assert_eq!(d.derive(&a, "s"), d.derive(&b, "s"));
    }

    #[test]
    fn custom_sample_size() {
        let d = KeyDeriver::with_sample_size(1);
        let a = vec![LogRecord::info("x"), LogRecord::info("y")];
        let b = vec![LogRecord::info("x"), LogRecord::info("z")];
        assert_eq!(d.derive(&a, ""), d.derive(&b, ""));
        assert_ne!(KeyDeriver::new().derive(&a, ""), KeyDeriver::new().derive(&b, ""));
    }

    #[test]
    fn display_is_hex() {
        let fp = Fingerprint::from_bytes([0xab; FINGERPRINT_LEN]);
        assert_eq!(fp.to_string(), "ab".repeat(FINGERPRINT_LEN));
        assert!(format!("{fp:?}").starts_with("Fingerprint(abab"));
    }
}
