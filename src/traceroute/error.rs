//! Error types for traceroute operations

use crate::socket::SendError;
use thiserror::Error;

/// Fatal errors that end a traceroute run.
///
/// Per-hop conditions (timeouts, malformed replies, unrecognised ICMP
/// messages) are not errors; they show up in that hop's result instead.
///
/// # Examples
///
/// ```
/// # use hoptrace::TracerouteError;
/// fn handle_error(err: TracerouteError) {
///     match err {
///         TracerouteError::InsufficientPermissions { required, suggestion } => {
///             eprintln!("Insufficient permissions: {}", required);
///             eprintln!("Try: {}", suggestion);
///         }
///         TracerouteError::ResolutionError { host, .. } => {
///             eprintln!("Could not resolve {}", host);
///         }
///         _ => eprintln!("Traceroute failed: {}", err),
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum TracerouteError {
    /// The target name could not be resolved to an IPv4 address
    #[error("Failed to resolve host {host}: {reason}")]
    ResolutionError {
        /// Name as given by the user
        host: String,
        /// Why the lookup failed
        reason: String,
    },

    /// The target is an IPv6 literal
    #[error("IPv6 targets are not supported")]
    Ipv6NotSupported,

    /// Opening the ICMP listener was refused by the OS
    #[error("Insufficient permissions: {required}")]
    InsufficientPermissions {
        /// Description of required permissions (e.g., "root or CAP_NET_RAW")
        required: String,
        /// Suggested remedy (e.g., "Run with sudo")
        suggestion: String,
    },

    /// The ICMP listener could not be opened for another reason
    #[error("Failed to open ICMP listener: {0}")]
    ListenSetup(#[source] std::io::Error),

    /// A probe could not be sent; the local stack is assumed broken
    #[error("Failed to send probe at TTL {ttl}: {source}")]
    ProbeSendError {
        /// TTL of the probe that failed
        ttl: u8,
        /// Underlying socket failure
        #[source]
        source: SendError,
    },

    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}
