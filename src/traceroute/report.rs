//! Rendering of hop results as they are produced

use crate::traceroute::{HopResult, TraceOutcome, TraceSummary};
use serde::Serialize;
use std::io::Write;
use std::net::Ipv4Addr;
use tracing::warn;

/// Marker printed in place of an address when a hop does not answer
pub const TIMEOUT_MARKER: &str = "* * *";

/// Line printed after the destination answers
pub const COMPLETION_MARKER: &str = "Trace complete.";

/// Receives hop results from the engine, in TTL order, one at a time.
pub trait HopReporter {
    /// Called once before the first probe
    fn start(&mut self, _target: &str, _target_ip: Ipv4Addr, _max_hops: u8) {}

    /// Called once per probed TTL
    fn hop(&mut self, hop: &HopResult);

    /// Called once when the run ends without a fatal error
    fn finish(&mut self, _summary: &TraceSummary) {}
}

/// Classic one-line-per-hop console output
pub struct TextReporter<W: Write> {
    out: W,
}

impl<W: Write> TextReporter<W> {
    /// Create a reporter writing to `out`
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Consume the reporter and return the writer
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, line: std::fmt::Arguments<'_>) {
        if let Err(e) = writeln!(self.out, "{}", line).and_then(|()| self.out.flush()) {
            warn!(error = %e, "Failed to write report line");
        }
    }
}

impl<W: Write> HopReporter for TextReporter<W> {
    fn start(&mut self, target: &str, target_ip: Ipv4Addr, max_hops: u8) {
        self.line(format_args!(
            "traceroute to {} ({}), {} hops max",
            target, target_ip, max_hops
        ));
    }

    fn hop(&mut self, hop: &HopResult) {
        let addr = hop
            .responder
            .map_or_else(|| TIMEOUT_MARKER.to_string(), |a| a.to_string());
        self.line(format_args!("{:2} {:<15} ({})", hop.ttl, addr, hop.tag()));
    }

    fn finish(&mut self, summary: &TraceSummary) {
        if summary.destination_reached() {
            self.line(format_args!("{}", COMPLETION_MARKER));
        }
    }
}

/// Newline-delimited JSON records
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum JsonRecord<'a> {
    Start {
        target: &'a str,
        target_ip: Ipv4Addr,
        max_hops: u8,
    },
    Hop {
        ttl: u8,
        address: Option<Ipv4Addr>,
        result: String,
        rtt_ms: Option<f64>,
        destination: bool,
    },
    Summary {
        target: &'a str,
        target_ip: Ipv4Addr,
        outcome: TraceOutcome,
        probes_sent: u8,
        total_ms: f64,
    },
}

/// Machine-readable output, one JSON object per line
pub struct JsonReporter<W: Write> {
    out: W,
}

impl<W: Write> JsonReporter<W> {
    /// Create a reporter writing to `out`
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Consume the reporter and return the writer
    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, record: &JsonRecord<'_>) {
        let written = serde_json::to_writer(&mut self.out, record)
            .map_err(std::io::Error::from)
            .and_then(|()| writeln!(self.out))
            .and_then(|()| self.out.flush());
        if let Err(e) = written {
            warn!(error = %e, "Failed to write JSON record");
        }
    }
}

impl<W: Write> HopReporter for JsonReporter<W> {
    fn start(&mut self, target: &str, target_ip: Ipv4Addr, max_hops: u8) {
        self.emit(&JsonRecord::Start {
            target,
            target_ip,
            max_hops,
        });
    }

    fn hop(&mut self, hop: &HopResult) {
        self.emit(&JsonRecord::Hop {
            ttl: hop.ttl,
            address: hop.responder,
            result: hop.tag(),
            rtt_ms: hop.rtt_ms(),
            destination: hop.is_destination(),
        });
    }

    fn finish(&mut self, summary: &TraceSummary) {
        self.emit(&JsonRecord::Summary {
            target: &summary.target,
            target_ip: summary.target_ip,
            outcome: summary.outcome,
            probes_sent: summary.probes_sent,
            total_ms: summary.total_duration.as_secs_f64() * 1000.0,
        });
    }
}
