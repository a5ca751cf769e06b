//! Pattern (log template cluster) types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Severity;

/// One group of similar log lines collapsed into a template.
///
/// Variable tokens in `template` are replaced with `<*>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogPattern {
    pub template: String,
    pub count: usize,
    #[serde(default)]
    pub severities: BTreeMap<Severity, usize>,
    /// First message that produced this template.
    pub sample: String,
}

impl LogPattern {
    pub fn new(template: impl Into<String>, sample: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            count: 0,
            severities: BTreeMap::new(),
            sample: sample.into(),
        }
    }

    /// Count one more occurrence at `severity`.
    pub fn observe(&mut self, severity: Severity) {
        self.count += 1;
        *self.severities.entry(severity).or_default() += 1;
    }

    /// Most frequent severity, preferring the more severe level on ties.
    pub fn dominant_severity(&self) -> Option<Severity> {
        self.severities
            .iter()
            .max_by(|(la, ca), (lb, cb)| ca.cmp(cb).then(la.cmp(lb)))
            .map(|(level, _)| *level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observe_tracks_counts_per_severity() {
        let mut p = LogPattern::new("conn <*> closed", "conn 7 closed");
        p.observe(Severity::Info);
        p.observe(Severity::Info);
        p.observe(Severity::Error);
        assert_eq!(p.count, 3);
        assert_eq!(p.severities[&Severity::Info], 2);
        assert_eq!(p.dominant_severity(), Some(Severity::Info));
    }

    #[test]
    fn dominant_severity_tie_prefers_more_severe() {
        let mut p = LogPattern::new("t", "s");
        p.observe(Severity::Warn);
        p.observe(Severity::Error);
        assert_eq!(p.dominant_severity(), Some(Severity::Error));
    }

    #[test]
    fn severity_map_serializes_as_object() {
        let mut p = LogPattern::new("t", "s");
        p.observe(Severity::Warn);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["severities"]["warn"], 1);
    }
}
