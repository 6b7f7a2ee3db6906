//! Configuration types for traceroute operations

use crate::socket::DEFAULT_PROBE_PORT;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Hard upper bound on the number of probes in one run
pub const MAX_HOP_CEILING: u8 = 30;

/// Default per-hop reply timeout
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Configuration for a traceroute operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracerouteConfig {
    /// Target hostname or IP address as given
    pub target: String,
    /// Resolved target address
    pub target_ip: Option<Ipv4Addr>,
    /// Maximum number of hops (default: 30, never more)
    pub max_hops: u8,
    /// How long to wait for a reply to each probe (default: 2s)
    pub probe_timeout: Duration,
    /// Destination UDP port (default: 33434)
    pub port: u16,
}

impl Default for TracerouteConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            target_ip: None,
            max_hops: MAX_HOP_CEILING,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            port: DEFAULT_PROBE_PORT,
        }
    }
}

impl TracerouteConfig {
    /// Create a new TracerouteConfig builder
    pub fn builder() -> TracerouteConfigBuilder {
        TracerouteConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.target.is_empty() && self.target_ip.is_none() {
            return Err("Target must be specified".to_string());
        }
        if self.max_hops < 1 {
            return Err("max_hops must be at least 1".to_string());
        }
        if self.max_hops > MAX_HOP_CEILING {
            return Err(format!("max_hops cannot exceed {}", MAX_HOP_CEILING));
        }
        if self.probe_timeout.is_zero() {
            return Err("probe_timeout must be greater than 0".to_string());
        }
        if self.port == 0 {
            return Err("port must be non-zero".to_string());
        }
        Ok(())
    }
}

/// Builder for TracerouteConfig
#[derive(Debug, Default)]
pub struct TracerouteConfigBuilder {
    config: TracerouteConfig,
}

impl TracerouteConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target hostname or IP address
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.config.target = target.into();
        self
    }

    /// Set the resolved target address
    pub fn target_ip(mut self, ip: Ipv4Addr) -> Self {
        self.config.target_ip = Some(ip);
        self
    }

    /// Set the maximum number of hops
    pub fn max_hops(mut self, hops: u8) -> Self {
        self.config.max_hops = hops;
        self
    }

    /// Set the per-hop reply timeout
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout = timeout;
        self
    }

    /// Set the destination UDP port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Build the configuration, validating it
    pub fn build(self) -> Result<TracerouteConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}
