//! Trading-terminal protocol log analyzer.
//!
//! Reconstructs request/response conversations from raw terminal logs,
//! classifies them by wire protocol, and exposes statistics, a merged
//! timeline, fund-token resolution, and per-domain trading views over
//! the result. One parse run is one immutable snapshot.

pub mod analysis;
pub mod models;
pub mod parser;
pub mod views;

pub use analysis::LogAnalysis;
pub use models::{CorrelationRecord, Diagnostics, Protocol, PushCategory, TimelineEntry};
pub use parser::{LogParser, ParsedLog};
