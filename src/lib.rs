//! hoptrace - a sequential UDP traceroute
//!
//! Sends one UDP probe per TTL to a closed port on the target and listens on
//! a raw ICMP socket for the Time Exceeded and Destination Unreachable messages that
//! reveal each hop along the path.

pub mod socket;
pub mod traceroute;

// Re-export core types for library users
pub use socket::{Probe, ProbeSender, Reply, ReplyKind, ReplyListener, DEFAULT_PROBE_PORT};
pub use traceroute::{
    resolve_target, trace, HopOutcome, HopReporter, HopResult, JsonReporter, TextReporter,
    TraceOutcome, TraceSummary, TracerouteConfig, TracerouteConfigBuilder, TracerouteEngine,
    TracerouteError, MAX_HOP_CEILING,
};
