//! UDP probe sender

use super::{Probe, ProbeSender, SendError};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, SocketAddrV4};
use tracing::trace;

/// Sends each probe from a fresh ephemeral UDP socket.
///
/// The hop limit is a socket option, so a new socket per probe keeps one
/// hop's TTL from leaking into the next. The socket is closed as soon as the
/// datagram is handed to the kernel.
#[derive(Debug, Default)]
pub struct UdpProbeSender;

impl UdpProbeSender {
    /// Create a sender
    pub fn new() -> Self {
        Self
    }

    fn open_socket(ttl: u8) -> std::io::Result<Socket> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.bind(&SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0).into())?;
        socket.set_ttl_v4(u32::from(ttl))?;
        Ok(socket)
    }
}

impl ProbeSender for UdpProbeSender {
    fn send(&mut self, probe: &Probe) -> Result<(), SendError> {
        let socket = Self::open_socket(probe.ttl).map_err(SendError::Setup)?;
        let target = SocketAddrV4::new(probe.destination, probe.port);

        let sent = socket
            .send_to(&[], &target.into())
            .map_err(SendError::Transmit)?;
        trace!(ttl = probe.ttl, %target, bytes = sent, "Probe handed to kernel");

        drop(socket);
        Ok(())
    }
}
