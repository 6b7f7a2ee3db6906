//! Hop discovery: configuration, the engine, and its results

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod report;
pub mod result;
pub mod types;

// Re-export commonly used types
pub use api::{resolve_target, trace};
pub use config::{TracerouteConfig, TracerouteConfigBuilder, MAX_HOP_CEILING};
pub use engine::TracerouteEngine;
pub use error::TracerouteError;
pub use report::{HopReporter, JsonReporter, TextReporter};
pub use result::{TraceOutcome, TraceSummary};
pub use types::{HopOutcome, HopResult};
