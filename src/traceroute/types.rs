//! Per-hop result types

use crate::socket::{Reply, ReplyKind};
use std::net::Ipv4Addr;
use std::time::Duration;

/// What happened to the probe sent at one TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HopOutcome {
    /// An ICMP message arrived within the timeout
    Responded(ReplyKind),
    /// Nothing usable arrived within the timeout
    TimedOut,
}

/// Result of probing a single TTL.
///
/// Produced once per loop iteration and handed straight to the reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HopResult {
    /// Time-to-live value of the probe
    pub ttl: u8,
    /// Address that answered, if any
    pub responder: Option<Ipv4Addr>,
    /// How the hop resolved
    pub outcome: HopOutcome,
    /// Time between sending the probe and receiving the reply
    pub rtt: Option<Duration>,
}

impl HopResult {
    /// A hop that received a reply
    pub fn responded(ttl: u8, reply: Reply, rtt: Duration) -> Self {
        Self {
            ttl,
            responder: Some(reply.source),
            outcome: HopOutcome::Responded(reply.kind),
            rtt: Some(rtt),
        }
    }

    /// A hop that got no reply
    pub fn timed_out(ttl: u8) -> Self {
        Self {
            ttl,
            responder: None,
            outcome: HopOutcome::TimedOut,
            rtt: None,
        }
    }

    /// Whether this hop ends the trace: any Destination Unreachable reply
    pub fn is_destination(&self) -> bool {
        matches!(
            self.outcome,
            HopOutcome::Responded(ReplyKind::DestinationUnreachable { .. })
        )
    }

    /// Human-readable classification tag
    pub fn tag(&self) -> String {
        match self.outcome {
            HopOutcome::Responded(kind) => kind.to_string(),
            HopOutcome::TimedOut => "Request timed out".to_string(),
        }
    }

    /// Get RTT in milliseconds
    pub fn rtt_ms(&self) -> Option<f64> {
        self.rtt.map(|d| d.as_secs_f64() * 1000.0)
    }
}
