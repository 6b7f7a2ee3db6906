//! High-level traceroute API

use crate::socket::factory::open_icmp_listener;
use crate::socket::UdpProbeSender;
use crate::traceroute::{
    HopReporter, TraceSummary, TracerouteConfig, TracerouteEngine, TracerouteError,
};
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::TokioResolver;
use std::net::{IpAddr, Ipv4Addr};
use tracing::debug;

/// Resolve a hostname or IPv4 literal to the address to trace
///
/// # Errors
///
/// * `TracerouteError::Ipv6NotSupported` - If `host` is an IPv6 literal
/// * `TracerouteError::ResolutionError` - If no IPv4 address can be found
pub async fn resolve_target(host: &str) -> Result<Ipv4Addr, TracerouteError> {
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => return Ok(ip),
        Ok(IpAddr::V6(_)) => return Err(TracerouteError::Ipv6NotSupported),
        Err(_) => {}
    }
    if host.trim().is_empty() {
        return Err(TracerouteError::ResolutionError {
            host: host.to_string(),
            reason: "empty hostname".to_string(),
        });
    }

    let resolver = TokioResolver::builder_with_config(
        ResolverConfig::cloudflare(),
        TokioConnectionProvider::default(),
    )
    .build();

    let lookup = resolver
        .ipv4_lookup(host)
        .await
        .map_err(|e| TracerouteError::ResolutionError {
            host: host.to_string(),
            reason: e.to_string(),
        })?;

    let ip = lookup
        .iter()
        .next()
        .map(|a| a.0)
        .ok_or_else(|| TracerouteError::ResolutionError {
            host: host.to_string(),
            reason: "no IPv4 address found".to_string(),
        })?;
    debug!(host, %ip, "Resolved target");
    Ok(ip)
}

/// Trace the route to an already-resolved target using real sockets
///
/// Opens the raw ICMP listener, then probes with fresh UDP sockets, one TTL
/// at a time, streaming each hop to `reporter`.
///
/// # Errors
///
/// * `TracerouteError::ConfigError` - If the configuration is invalid
/// * `TracerouteError::InsufficientPermissions` - If the raw socket is refused
/// * `TracerouteError::ListenSetup` - If the raw socket fails otherwise
/// * `TracerouteError::ProbeSendError` - If a probe cannot be sent
pub fn trace(
    config: TracerouteConfig,
    reporter: &mut dyn HopReporter,
) -> Result<TraceSummary, TracerouteError> {
    config.validate().map_err(TracerouteError::ConfigError)?;
    let listener = open_icmp_listener()?;
    TracerouteEngine::new(config, UdpProbeSender::new(), listener)?.run(reporter)
}
