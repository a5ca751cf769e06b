//! Pattern mining: collapsing similar log lines into templates.
//!
//! [`PatternMiner`] is the expensive, repeatable computation the cache sits
//! in front of. [`TemplateMiner`] is the built-in implementation: it masks
//! tokens that look like variables and groups lines by what is left.

use std::collections::HashMap;

use crate::Result;
use crate::types::{LogPattern, LogRecord};

/// Placeholder substituted for variable tokens.
pub const WILDCARD: &str = "<*>";

/// Turns a batch of records into pattern descriptors.
///
/// Implementations must be deterministic for a given batch; results are
/// cached and shared between identical requests.
pub trait PatternMiner: Send + Sync {
    /// Short name used in metrics and error messages.
    fn name(&self) -> &str;

    fn mine(&self, records: &[LogRecord]) -> Result<Vec<LogPattern>>;
}

/// Token-masking miner.
///
/// A token is treated as variable when it contains a digit, looks like a hex
/// identifier or UUID, or is a quoted string. `key=value` tokens keep the key
/// and mask only a variable value.
#[derive(Debug, Clone, Default)]
pub struct TemplateMiner {
    max_patterns: Option<usize>,
}

impl TemplateMiner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only the `n` most frequent patterns.
    #[must_use]
    pub fn max_patterns(mut self, n: usize) -> Self {
        self.max_patterns = Some(n);
        self
    }

    /// Template for a single message.
    pub fn template(message: &str) -> String {
        message
            .split_whitespace()
            .map(mask_token)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl PatternMiner for TemplateMiner {
    fn name(&self) -> &str {
        "template"
    }

    fn mine(&self, records: &[LogRecord]) -> Result<Vec<LogPattern>> {
        let mut groups: HashMap<String, LogPattern> = HashMap::new();
        for record in records {
            let template = Self::template(&record.message);
            groups
                .entry(template)
                .or_insert_with_key(|t| LogPattern::new(t.clone(), record.message.clone()))
                .observe(record.severity);
        }

        let mut patterns: Vec<LogPattern> = groups.into_values().collect();
        patterns.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.template.cmp(&b.template)));
        if let Some(n) = self.max_patterns {
            patterns.truncate(n);
        }
        Ok(patterns)
    }
}

fn mask_token(token: &str) -> std::borrow::Cow<'_, str> {
    if let Some((key, value)) = token.split_once('=') {
        if !key.is_empty() && is_variable(value) {
            return format!("{key}={WILDCARD}").into();
        }
        return token.into();
    }
    if is_variable(token) {
        WILDCARD.into()
    } else {
        token.into()
    }
}

fn is_variable(token: &str) -> bool {
    let trimmed = token.trim_matches(|c: char| matches!(c, ',' | ';' | ':' | '(' | ')' | '[' | ']'));
    if trimmed.is_empty() {
        return false;
    }
    if is_quoted(trimmed) {
        return true;
    }
    if trimmed.chars().any(|c| c.is_ascii_digit()) {
        return true;
    }
    is_hex_id(trimmed)
}

fn is_quoted(s: &str) -> bool {
    s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
}

/// Long hex runs such as digests or ids without decimal digits ("deadbeefcafe").
fn is_hex_id(s: &str) -> bool {
    let hex: String = s.chars().filter(|c| *c != '-').collect();
    hex.len() >= 8 && hex.chars().all(|c| c.is_ascii_hexdigit())
}
