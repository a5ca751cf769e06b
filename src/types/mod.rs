//! Public types for the Huginn API.

mod pattern;
mod record;

pub use pattern::LogPattern;
pub use record::{LogRecord, Severity};
