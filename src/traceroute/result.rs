//! Result types for traceroute operations

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Duration;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TraceOutcome {
    /// The destination answered with Destination Unreachable
    Reached {
        /// TTL at which the destination answered
        ttl: u8,
        /// Address that answered
        responder: Ipv4Addr,
    },
    /// The hop ceiling was hit without reaching the destination
    Incomplete {
        /// Number of hops probed
        max_hops: u8,
    },
}

/// Summary of a finished traceroute run.
///
/// Individual hops are not kept; they are streamed to the reporter as they
/// are produced.
///
/// # Examples
///
/// ```no_run
/// use hoptrace::{trace, TextReporter, TracerouteConfig};
/// use std::net::Ipv4Addr;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = TracerouteConfig::builder()
///     .target("example.com")
///     .target_ip(Ipv4Addr::new(93, 184, 216, 34))
///     .build()?;
///
/// let mut reporter = TextReporter::new(std::io::stdout());
/// let summary = trace(config, &mut reporter)?;
/// println!("Reached destination: {}", summary.destination_reached());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceSummary {
    /// Target hostname as provided
    pub target: String,
    /// Resolved target address
    pub target_ip: Ipv4Addr,
    /// How the run ended
    pub outcome: TraceOutcome,
    /// Number of probes sent
    pub probes_sent: u8,
    /// Wall-clock duration of the run
    pub total_duration: Duration,
}

impl TraceSummary {
    /// Whether the destination was reached
    pub fn destination_reached(&self) -> bool {
        matches!(self.outcome, TraceOutcome::Reached { .. })
    }

    /// TTL at which the destination answered, if it did
    pub fn destination_ttl(&self) -> Option<u8> {
        match self.outcome {
            TraceOutcome::Reached { ttl, .. } => Some(ttl),
            TraceOutcome::Incomplete { .. } => None,
        }
    }
}
