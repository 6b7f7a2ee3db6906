//! Socket layer: the probe sender and the ICMP reply listener
//!
//! The engine only talks to the two traits defined here, so it can be driven
//! by real sockets or by a scripted network in tests.

use std::io::ErrorKind;
use std::net::Ipv4Addr;
use std::time::Instant;
use thiserror::Error;
use tracing::{trace, warn};

pub mod factory;
pub mod icmp_v4;
pub mod udp;
pub mod utils;

pub use icmp_v4::{decode_reply, RawIcmpListener};
pub use udp::UdpProbeSender;

/// Conventional traceroute destination port, almost always closed
pub const DEFAULT_PROBE_PORT: u16 = 33434;

/// Receive buffer size, one Ethernet MTU
pub const RECV_BUFFER_LEN: usize = 1500;

/// One outbound probe: a UDP datagram limited to `ttl` hops.
///
/// A probe has no identity beyond its TTL. Nothing in the packet ties a reply
/// back to it; the engine relies on having a single probe in flight instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    /// Hop limit written into the IP header
    pub ttl: u8,
    /// Resolved destination address
    pub destination: Ipv4Addr,
    /// Destination UDP port
    pub port: u16,
}

/// Semantic kind of a decoded ICMP message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// ICMP Time Exceeded: a router on the path dropped the probe
    TimeExceeded,
    /// ICMP Destination Unreachable: the probe went no further
    DestinationUnreachable {
        /// ICMP code field; 3 (port unreachable) when the destination host answered
        code: u8,
    },
    /// Anything else, kept verbatim for reporting
    Other {
        /// ICMP type field
        icmp_type: u8,
        /// ICMP code field
        code: u8,
    },
}

impl std::fmt::Display for ReplyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplyKind::TimeExceeded => write!(f, "Time Exceeded"),
            ReplyKind::DestinationUnreachable { .. } => write!(f, "Destination Unreachable"),
            ReplyKind::Other { icmp_type, code } => {
                write!(f, "Unknown ICMP type: {}, code {}", icmp_type, code)
            }
        }
    }
}

/// A decoded inbound ICMP message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    /// Address the message came from
    pub source: Ipv4Addr,
    /// What the message means for the trace
    pub kind: ReplyKind,
    /// Size of the raw datagram in bytes
    pub len: usize,
}

/// Reasons a received datagram could not be decoded.
///
/// These are never fatal: the listener logs them and keeps waiting.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes than an IPv4 header plus an ICMP header
    #[error("datagram truncated ({len} bytes)")]
    Truncated {
        /// Number of bytes received
        len: usize,
    },

    /// The IP version nibble was not 4
    #[error("not an IPv4 datagram (version {version})")]
    NotIpv4 {
        /// Version found in the header
        version: u8,
    },

    /// The IPv4 header length field is out of range
    #[error("invalid IPv4 header length {header_len}")]
    BadHeaderLength {
        /// Header length in bytes
        header_len: usize,
    },

    /// The IPv4 payload is not ICMP
    #[error("unexpected IP protocol {protocol}")]
    NotIcmp {
        /// Protocol number found in the header
        protocol: u8,
    },
}

/// Failures while emitting a probe.
///
/// Either one means the local stack is unusable, so the trace stops.
#[derive(Debug, Error)]
pub enum SendError {
    /// Could not create, bind or configure the per-probe socket
    #[error("failed to prepare probe socket: {0}")]
    Setup(#[source] std::io::Error),

    /// The send call itself failed
    #[error("failed to transmit probe: {0}")]
    Transmit(#[source] std::io::Error),
}

/// Emits probes, one call per hop.
pub trait ProbeSender: Send {
    /// Send exactly one zero-payload datagram for `probe`
    fn send(&mut self, probe: &Probe) -> Result<(), SendError>;
}

/// Source of ICMP replies for the whole run.
pub trait ReplyListener: Send {
    /// Block until one raw datagram arrives or `deadline` passes.
    ///
    /// Returns `Ok(None)` on timeout. The datagram, IPv4 header included, is
    /// written to the front of `buf`.
    fn recv_datagram(
        &mut self,
        buf: &mut [u8],
        deadline: Instant,
    ) -> std::io::Result<Option<(usize, Ipv4Addr)>>;

    /// Wait for the next decodable reply until `deadline`.
    ///
    /// Malformed datagrams are logged and skipped within the same deadline.
    /// `None` means nothing usable arrived in time.
    fn receive(&mut self, deadline: Instant) -> Option<Reply> {
        let mut buf = [0u8; RECV_BUFFER_LEN];
        loop {
            if Instant::now() >= deadline {
                return None;
            }
            match self.recv_datagram(&mut buf, deadline) {
                Ok(Some((len, source))) => match decode_reply(&buf[..len], source) {
                    Ok(reply) => {
                        trace!(%source, len, kind = ?reply.kind, "Decoded ICMP reply");
                        return Some(reply);
                    }
                    Err(e) => {
                        warn!(%source, len, error = %e, "Discarding malformed ICMP message");
                    }
                },
                Ok(None) => return None,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!(error = %e, "ICMP receive failed, treating hop as unanswered");
                    return None;
                }
            }
        }
    }
}
