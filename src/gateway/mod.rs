//! Gateway: the pattern-mining front end tool handlers call into.

mod builder;
mod patterns;

pub use builder::{Huginn, HuginnBuilder};
pub use patterns::PatternGateway;
