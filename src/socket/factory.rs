//! Factory for the run-scoped ICMP listener

use super::icmp_v4::RawIcmpListener;
use super::utils::is_root;
use crate::traceroute::TracerouteError;
use socket2::{Domain, Protocol, Socket, Type};
use std::io::ErrorKind;
use tracing::debug;

// Common POSIX error codes
const EPERM: i32 = 1; // Operation not permitted
const EACCES: i32 = 13; // Permission denied

/// Open the raw ICMPv4 socket used to receive replies for the whole run
pub fn open_icmp_listener() -> Result<RawIcmpListener, TracerouteError> {
    let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))
        .map_err(classify_listen_error)?;
    let listener = RawIcmpListener::new(socket).map_err(classify_listen_error)?;
    debug!("Opened raw ICMPv4 listener");
    Ok(listener)
}

/// Turn a socket setup failure into the matching fatal error
pub(crate) fn classify_listen_error(err: std::io::Error) -> TracerouteError {
    let denied = err.kind() == ErrorKind::PermissionDenied
        || matches!(err.raw_os_error(), Some(EPERM) | Some(EACCES));
    if !denied {
        return TracerouteError::ListenSetup(err);
    }

    let suggestion = if is_root() {
        "Check that raw sockets are not blocked by a security policy".to_string()
    } else {
        "Run with sudo, or grant the binary CAP_NET_RAW".to_string()
    };
    TracerouteError::InsufficientPermissions {
        required: "root or CAP_NET_RAW to open a raw ICMP socket".to_string(),
        suggestion,
    }
}
