//! Tests for the traceroute engine against a scripted network

#![allow(clippy::unwrap_used)]

use super::*;
use crate::socket::icmp_v4::test_datagram;
use crate::socket::{ReplyKind, SendError};
use crate::traceroute::{HopOutcome, TextReporter};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};

const TARGET: Ipv4Addr = Ipv4Addr::new(93, 184, 216, 34);
const ROUTER: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);

/// ICMP datagrams that arrive after the probe for a given TTL is sent
#[derive(Default)]
struct Network {
    replies: HashMap<u8, Vec<(Vec<u8>, Ipv4Addr)>>,
    pending: VecDeque<(Vec<u8>, Ipv4Addr)>,
    sent: Vec<Probe>,
    fail_at: Option<u8>,
    listener_closed: bool,
}

impl Network {
    fn reply(mut self, ttl: u8, datagram: Vec<u8>, from: Ipv4Addr) -> Self {
        self.replies.entry(ttl).or_default().push((datagram, from));
        self
    }

    fn time_exceeded(self, ttl: u8, from: Ipv4Addr) -> Self {
        self.reply(ttl, test_datagram(11, 0), from)
    }

    fn port_unreachable(self, ttl: u8, from: Ipv4Addr) -> Self {
        self.reply(ttl, test_datagram(3, 3), from)
    }

    fn fail_send_at(mut self, ttl: u8) -> Self {
        self.fail_at = Some(ttl);
        self
    }

    fn into_shared(self) -> Arc<Mutex<Network>> {
        Arc::new(Mutex::new(self))
    }
}

struct FakeSender {
    net: Arc<Mutex<Network>>,
}

impl ProbeSender for FakeSender {
    fn send(&mut self, probe: &Probe) -> Result<(), SendError> {
        let mut net = self.net.lock().unwrap();
        if net.fail_at == Some(probe.ttl) {
            return Err(SendError::Transmit(io::Error::from(
                io::ErrorKind::NetworkUnreachable,
            )));
        }
        net.sent.push(*probe);
        let replies = net.replies.remove(&probe.ttl).unwrap_or_default();
        net.pending.extend(replies);
        Ok(())
    }
}

struct FakeListener {
    net: Arc<Mutex<Network>>,
}

impl ReplyListener for FakeListener {
    fn recv_datagram(
        &mut self,
        buf: &mut [u8],
        _deadline: Instant,
    ) -> io::Result<Option<(usize, Ipv4Addr)>> {
        let next = self.net.lock().unwrap().pending.pop_front();
        Ok(next.map(|(bytes, from)| {
            buf[..bytes.len()].copy_from_slice(&bytes);
            (bytes.len(), from)
        }))
    }
}

impl Drop for FakeListener {
    fn drop(&mut self) {
        if let Ok(mut net) = self.net.lock() {
            net.listener_closed = true;
        }
    }
}

#[derive(Default)]
struct CollectingReporter {
    hops: Vec<HopResult>,
    summary: Option<TraceSummary>,
}

impl HopReporter for CollectingReporter {
    fn hop(&mut self, hop: &HopResult) {
        self.hops.push(*hop);
    }

    fn finish(&mut self, summary: &TraceSummary) {
        self.summary = Some(summary.clone());
    }
}

fn config(max_hops: u8) -> TracerouteConfig {
    TracerouteConfig::builder()
        .target("example.com")
        .target_ip(TARGET)
        .max_hops(max_hops)
        .probe_timeout(Duration::from_millis(100))
        .build()
        .unwrap()
}

fn engine(
    net: &Arc<Mutex<Network>>,
    max_hops: u8,
) -> TracerouteEngine<FakeSender, FakeListener> {
    TracerouteEngine::new(
        config(max_hops),
        FakeSender {
            net: Arc::clone(net),
        },
        FakeListener {
            net: Arc::clone(net),
        },
    )
    .unwrap()
}

fn sent_ttls(net: &Arc<Mutex<Network>>) -> Vec<u8> {
    net.lock().unwrap().sent.iter().map(|p| p.ttl).collect()
}

#[test]
fn test_end_to_end_scenario() {
    let net = Network::default()
        .time_exceeded(2, ROUTER)
        .port_unreachable(3, TARGET)
        .into_shared();

    let mut reporter = TextReporter::new(Vec::new());
    let summary = engine(&net, 30).run(&mut reporter).unwrap();

    let text = String::from_utf8(reporter.into_inner()).unwrap();
    assert_eq!(
        text.lines().collect::<Vec<_>>(),
        vec![
            "traceroute to example.com (93.184.216.34), 30 hops max",
            " 1 * * *           (Request timed out)",
            " 2 10.0.0.1        (Time Exceeded)",
            " 3 93.184.216.34   (Destination Unreachable)",
            "Trace complete.",
        ]
    );
    assert_eq!(
        summary.outcome,
        TraceOutcome::Reached {
            ttl: 3,
            responder: TARGET
        }
    );
    assert_eq!(summary.probes_sent, 3);
    assert_eq!(sent_ttls(&net), vec![1, 2, 3]);
}

#[test]
fn test_probes_target_fixed_port() {
    let net = Network::default().port_unreachable(2, TARGET).into_shared();
    engine(&net, 30)
        .run(&mut CollectingReporter::default())
        .unwrap();

    let sent = net.lock().unwrap().sent.clone();
    assert_eq!(sent.len(), 2);
    for probe in sent {
        assert_eq!(probe.destination, TARGET);
        assert_eq!(probe.port, 33434);
    }
}

#[test]
fn test_silent_path_stops_at_ceiling() {
    let net = Network::default().into_shared();
    let mut reporter = CollectingReporter::default();
    let summary = engine(&net, 30).run(&mut reporter).unwrap();

    assert_eq!(sent_ttls(&net), (1..=30).collect::<Vec<u8>>());
    assert_eq!(reporter.hops.len(), 30);
    assert!(reporter
        .hops
        .iter()
        .all(|h| h.outcome == HopOutcome::TimedOut && h.responder.is_none()));
    assert_eq!(summary.outcome, TraceOutcome::Incomplete { max_hops: 30 });
    assert_eq!(summary.probes_sent, 30);
    assert!(!summary.destination_reached());
    assert_eq!(reporter.summary, Some(summary));
}

#[test]
fn test_time_exceeded_continues_to_next_ttl() {
    let net = Network::default()
        .time_exceeded(1, Ipv4Addr::new(192, 168, 1, 1))
        .time_exceeded(2, ROUTER)
        .into_shared();
    let mut reporter = CollectingReporter::default();
    engine(&net, 3).run(&mut reporter).unwrap();

    let ttls: Vec<u8> = reporter.hops.iter().map(|h| h.ttl).collect();
    assert_eq!(ttls, vec![1, 2, 3]);
    assert_eq!(reporter.hops[1].responder, Some(ROUTER));
    assert_eq!(
        reporter.hops[1].outcome,
        HopOutcome::Responded(ReplyKind::TimeExceeded)
    );
    assert!(reporter.hops[1].rtt.is_some());
    assert_eq!(reporter.hops[2].outcome, HopOutcome::TimedOut);
}

#[test]
fn test_port_unreachable_stops_immediately() {
    let net = Network::default()
        .port_unreachable(1, TARGET)
        .time_exceeded(2, ROUTER)
        .into_shared();
    let mut reporter = CollectingReporter::default();
    let summary = engine(&net, 30).run(&mut reporter).unwrap();

    assert_eq!(sent_ttls(&net), vec![1]);
    assert_eq!(reporter.hops.len(), 1);
    assert_eq!(summary.destination_ttl(), Some(1));
}

#[test]
fn test_malformed_reply_is_absorbed() {
    let net = Network::default()
        .reply(2, vec![0x45, 0x00, 0x00], ROUTER)
        .time_exceeded(2, ROUTER)
        .reply(3, vec![0x60; 40], TARGET)
        .port_unreachable(4, TARGET)
        .into_shared();
    let mut reporter = CollectingReporter::default();
    let summary = engine(&net, 30).run(&mut reporter).unwrap();

    assert_eq!(sent_ttls(&net), vec![1, 2, 3, 4]);
    assert_eq!(
        reporter.hops[1].outcome,
        HopOutcome::Responded(ReplyKind::TimeExceeded)
    );
    // Only garbage arrived for TTL 3
    assert_eq!(reporter.hops[2].outcome, HopOutcome::TimedOut);
    assert_eq!(summary.destination_ttl(), Some(4));
}

#[test]
fn test_unrecognised_replies_do_not_stop_the_run() {
    let net = Network::default()
        .reply(1, test_datagram(0, 0), Ipv4Addr::new(192, 168, 1, 1))
        .reply(2, test_datagram(5, 1), ROUTER)
        .port_unreachable(3, TARGET)
        .into_shared();
    let mut reporter = CollectingReporter::default();
    let summary = engine(&net, 30).run(&mut reporter).unwrap();

    assert_eq!(
        reporter.hops[0].outcome,
        HopOutcome::Responded(ReplyKind::Other {
            icmp_type: 0,
            code: 0
        })
    );
    assert_eq!(
        reporter.hops[1].outcome,
        HopOutcome::Responded(ReplyKind::Other {
            icmp_type: 5,
            code: 1
        })
    );
    assert_eq!(reporter.hops[1].tag(), "Unknown ICMP type: 5, code 1");
    assert_eq!(sent_ttls(&net), vec![1, 2, 3]);
    assert!(summary.destination_reached());
}

#[test]
fn test_admin_prohibited_stops_the_run() {
    let net = Network::default()
        .time_exceeded(1, ROUTER)
        .reply(3, test_datagram(3, 13), TARGET)
        .into_shared();
    let mut reporter = CollectingReporter::default();
    let summary = engine(&net, 30).run(&mut reporter).unwrap();

    assert_eq!(sent_ttls(&net), vec![1, 2, 3]);
    assert_eq!(
        summary.outcome,
        TraceOutcome::Reached {
            ttl: 3,
            responder: TARGET
        }
    );
    assert_eq!(
        reporter.hops[2].outcome,
        HopOutcome::Responded(ReplyKind::DestinationUnreachable { code: 13 })
    );
    assert_eq!(reporter.hops[2].tag(), "Destination Unreachable");
}

#[test]
fn test_host_unreachable_from_router_stops_the_run() {
    let net = Network::default()
        .reply(2, test_datagram(3, 1), ROUTER)
        .into_shared();
    let summary = engine(&net, 30)
        .run(&mut CollectingReporter::default())
        .unwrap();

    assert_eq!(sent_ttls(&net), vec![1, 2]);
    assert_eq!(summary.destination_ttl(), Some(2));
}

#[test]
fn test_max_hops_limits_probes() {
    let net = Network::default().into_shared();
    let summary = engine(&net, 5)
        .run(&mut CollectingReporter::default())
        .unwrap();

    assert_eq!(sent_ttls(&net), vec![1, 2, 3, 4, 5]);
    assert_eq!(summary.outcome, TraceOutcome::Incomplete { max_hops: 5 });
}

#[test]
fn test_send_failure_aborts_run() {
    let net = Network::default().fail_send_at(4).into_shared();
    let mut reporter = CollectingReporter::default();
    let err = engine(&net, 30).run(&mut reporter).unwrap_err();

    assert!(matches!(
        err,
        TracerouteError::ProbeSendError {
            ttl: 4,
            source: SendError::Transmit(_)
        }
    ));
    assert_eq!(sent_ttls(&net), vec![1, 2, 3]);
    assert_eq!(reporter.hops.len(), 3);
    assert!(reporter.summary.is_none());
    assert!(net.lock().unwrap().listener_closed);
}

#[test]
fn test_listener_released_after_success() {
    let net = Network::default().port_unreachable(2, TARGET).into_shared();
    let engine = engine(&net, 30);
    assert!(!net.lock().unwrap().listener_closed);

    engine.run(&mut CollectingReporter::default()).unwrap();
    assert!(net.lock().unwrap().listener_closed);
}

#[test]
fn test_listener_released_at_ceiling() {
    let net = Network::default().into_shared();
    engine(&net, 2)
        .run(&mut CollectingReporter::default())
        .unwrap();
    assert!(net.lock().unwrap().listener_closed);
}

#[test]
fn test_new_requires_resolved_target() {
    let net = Network::default().into_shared();
    let config = TracerouteConfig::builder()
        .target("example.com")
        .build()
        .unwrap();

    let result = TracerouteEngine::new(
        config,
        FakeSender {
            net: Arc::clone(&net),
        },
        FakeListener {
            net: Arc::clone(&net),
        },
    );
    assert!(matches!(result, Err(TracerouteError::ConfigError(_))));
}

#[test]
fn test_new_rejects_invalid_config() {
    let net = Network::default().into_shared();
    let mut config = config(30);
    config.max_hops = 31;

    let result = TracerouteEngine::new(
        config,
        FakeSender {
            net: Arc::clone(&net),
        },
        FakeListener {
            net: Arc::clone(&net),
        },
    );
    assert!(matches!(result, Err(TracerouteError::ConfigError(_))));
}
