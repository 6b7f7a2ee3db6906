//! Core traceroute engine implementation
//!
//! The engine walks TTLs upward from 1, sending one probe and waiting for
//! one reply at a time. Replies carry nothing that links them to a probe, so
//! the only correlation is that exactly one probe is ever outstanding. That
//! rule is enforced by [`InFlight`]: it borrows the engine mutably, so no new
//! probe can be dispatched until the current one has been resolved.

use crate::socket::{Probe, ProbeSender, ReplyListener};
use crate::traceroute::{
    HopReporter, HopResult, TraceOutcome, TraceSummary, TracerouteConfig, TracerouteError,
};
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Sequential hop-discovery engine.
///
/// Owns the run's reply listener; it is released when [`run`](Self::run)
/// returns, on every exit path.
pub struct TracerouteEngine<S, L> {
    config: TracerouteConfig,
    target_ip: Ipv4Addr,
    sender: S,
    listener: L,
}

/// A probe that has been sent and not yet resolved
#[must_use = "an in-flight probe must be resolved before the next one is sent"]
struct InFlight<'a, L> {
    listener: &'a mut L,
    ttl: u8,
    sent_at: Instant,
    timeout: Duration,
}

impl<L: ReplyListener> InFlight<'_, L> {
    /// Wait for the reply to this probe and turn it into a hop result
    fn resolve(self) -> HopResult {
        let deadline = self.sent_at + self.timeout;
        match self.listener.receive(deadline) {
            Some(reply) => {
                let rtt = reply_rtt(self.sent_at);
                debug!(
                    ttl = self.ttl,
                    responder = %reply.source,
                    kind = ?reply.kind,
                    len = reply.len,
                    rtt_ms = rtt.as_secs_f64() * 1000.0,
                    "Received reply"
                );
                HopResult::responded(self.ttl, reply, rtt)
            }
            None => {
                debug!(ttl = self.ttl, "No reply before deadline");
                HopResult::timed_out(self.ttl)
            }
        }
    }
}

fn reply_rtt(sent_at: Instant) -> Duration {
    Instant::now().saturating_duration_since(sent_at)
}

impl<S: ProbeSender, L: ReplyListener> TracerouteEngine<S, L> {
    /// Create an engine for a resolved target
    ///
    /// # Errors
    ///
    /// * `TracerouteError::ConfigError` - If the configuration is invalid or
    ///   the target address has not been resolved
    pub fn new(config: TracerouteConfig, sender: S, listener: L) -> Result<Self, TracerouteError> {
        config.validate().map_err(TracerouteError::ConfigError)?;
        let target_ip = config.target_ip.ok_or_else(|| {
            TracerouteError::ConfigError("target address must be resolved".to_string())
        })?;

        Ok(Self {
            config,
            target_ip,
            sender,
            listener,
        })
    }

    /// Run the trace, streaming each hop to `reporter`.
    ///
    /// Stops when the destination answers with Destination Unreachable, or after
    /// `max_hops` probes. A failed send aborts the run.
    pub fn run(mut self, reporter: &mut dyn HopReporter) -> Result<TraceSummary, TracerouteError> {
        let started = Instant::now();
        let max_hops = self.config.max_hops;
        info!(
            target = %self.config.target,
            target_ip = %self.target_ip,
            max_hops,
            port = self.config.port,
            "Starting traceroute"
        );
        reporter.start(&self.config.target, self.target_ip, max_hops);

        let mut outcome = TraceOutcome::Incomplete { max_hops };
        let mut probes_sent = 0;

        for ttl in 1..=max_hops {
            let hop = self.dispatch(ttl)?.resolve();
            probes_sent = ttl;
            reporter.hop(&hop);

            if let Some(responder) = hop.responder.filter(|_| hop.is_destination()) {
                outcome = TraceOutcome::Reached { ttl, responder };
                break;
            }
        }

        let summary = TraceSummary {
            target: self.config.target.clone(),
            target_ip: self.target_ip,
            outcome,
            probes_sent,
            total_duration: started.elapsed(),
        };
        match summary.outcome {
            TraceOutcome::Reached { ttl, .. } => info!(ttl, "Destination reached"),
            TraceOutcome::Incomplete { max_hops } => {
                info!(max_hops, "Hop ceiling reached without a conclusive route")
            }
        }
        reporter.finish(&summary);
        Ok(summary)
    }

    /// Send the probe for `ttl` and hand back the pending reply wait
    fn dispatch(&mut self, ttl: u8) -> Result<InFlight<'_, L>, TracerouteError> {
        let probe = Probe {
            ttl,
            destination: self.target_ip,
            port: self.config.port,
        };
        debug!(ttl, destination = %probe.destination, port = probe.port, "Sending probe");

        self.sender
            .send(&probe)
            .map_err(|source| TracerouteError::ProbeSendError { ttl, source })?;

        Ok(InFlight {
            listener: &mut self.listener,
            ttl,
            sent_at: Instant::now(),
            timeout: self.config.probe_timeout,
        })
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod engine_tests;
