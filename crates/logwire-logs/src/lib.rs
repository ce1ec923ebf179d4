//! Log view state for logwire
//!
//! This crate provides the bounded display buffer, severity counters and the
//! filter predicate fed by pushed and pulled log records.

mod counters;
mod filter;
mod view;

pub use counters::SeverityCounters;
pub use filter::LogFilter;
pub use view::{DEFAULT_DISPLAY_CAP, ViewEntry, ViewState};

// Re-export types used in our public API
pub use logwire_types::{Category, LogRecord, SeverityBucket, StatsSnapshot};
