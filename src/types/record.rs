//! Log record types

use std::fmt;
use std::io::BufRead;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::HuginnError;

/// Log severity level.
///
/// Parsing is case-insensitive and accepts the common aliases emitted by
/// logging libraries (`warning`, `err`, `critical`, ...). Anything else maps
/// to [`Severity::Unknown`] when deserializing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    #[default]
    Unknown,
}

impl Severity {
    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = HuginnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" | "information" | "notice" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" | "err" => Ok(Self::Error),
            "fatal" | "critical" | "crit" | "emerg" | "alert" | "panic" => Ok(Self::Fatal),
            "unknown" => Ok(Self::Unknown),
            other => Err(HuginnError::InvalidInput(format!(
                "unknown severity '{other}'"
            ))),
        }
    }
}

impl From<String> for Severity {
    fn from(s: String) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl From<Severity> for String {
    fn from(s: Severity) -> Self {
        s.as_str().to_string()
    }
}

/// A single log line as returned by the observability API.
///
/// Only `message` and `severity` contribute to cache fingerprints; the
/// remaining fields ride along for the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(alias = "msg", alias = "body")]
    pub message: String,
    #[serde(default, alias = "level")]
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl LogRecord {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity,
            ..Default::default()
        }
    }

    /// Shorthand for an info-level record.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    /// Shorthand for a warn-level record.
    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(Severity::Warn, message)
    }

    /// Shorthand for an error-level record.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Parse one JSON-lines entry, falling back to an `Unknown`-severity
    /// record carrying the raw line when it isn't a JSON object.
    pub fn from_json_line(line: &str) -> Self {
        serde_json::from_str(line)
            .unwrap_or_else(|_| Self::new(Severity::Unknown, line.trim_end()))
    }

    /// Read a JSON-lines stream, skipping blank lines.
    ///
    /// Lines that aren't JSON objects become raw `Unknown` records, see
    /// [`LogRecord::from_json_line`]. Only I/O failures are errors.
    pub fn read_json_lines(reader: impl BufRead) -> crate::Result<Vec<Self>> {
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(Self::from_json_line(&line));
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_aliases() {
        assert_eq!("WARNING".parse::<Severity>().unwrap(), Severity::Warn);
        assert_eq!("err".parse::<Severity>().unwrap(), Severity::Error);
        assert_eq!("critical".parse::<Severity>().unwrap(), Severity::Fatal);
        assert!("loud".parse::<Severity>().is_err());
    }

    #[test]
    fn deserialize_with_field_aliases() {
        let record: LogRecord =
            serde_json::from_str(r#"{"msg": "disk full", "level": "ERROR"}"#).unwrap();
        assert_eq!(record.message, "disk full");
        assert_eq!(record.severity, Severity::Error);
    }

    #[test]
    fn unrecognised_severity_is_unknown() {
        let record: LogRecord =
            serde_json::from_str(r#"{"message": "x", "severity": "chatty"}"#).unwrap();
        assert_eq!(record.severity, Severity::Unknown);
    }

    #[test]
    fn from_json_line_falls_back_to_raw_text() {
        let record = LogRecord::from_json_line("plain text line\n");
        assert_eq!(record.message, "plain text line");
        assert_eq!(record.severity, Severity::Unknown);
    }

    #[test]
    fn read_json_lines_mixes_json_and_raw_text() {
        let input = "{\"msg\": \"disk full\", \"level\": \"error\"}\n\n   \nplain text\r\n";
        let records = LogRecord::read_json_lines(std::io::Cursor::new(input)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message, "disk full");
        assert_eq!(records[0].severity, Severity::Error);
        assert_eq!(records[1].message, "plain text");
        assert_eq!(records[1].severity, Severity::Unknown);
    }

    #[test]
    fn read_json_lines_surfaces_invalid_utf8() {
        let input: &[u8] = b"{\"message\": \"ok\"}\n\xff\xfe\n";
        let err = LogRecord::read_json_lines(input).unwrap_err();
        assert!(matches!(err, HuginnError::Io(_)));
    }

    #[test]
    fn serialize_skips_empty_fields() {
        let json = serde_json::to_string(&LogRecord::info("hello")).unwrap();
        assert_eq!(json, r#"{"message":"hello","severity":"info"}"#);
    }
}
