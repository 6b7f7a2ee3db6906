//! Raw ICMPv4 listener and reply decoding

use super::{DecodeError, Reply, ReplyKind, ReplyListener, RECV_BUFFER_LEN};
use pnet::packet::icmp::{IcmpPacket, IcmpTypes};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use socket2::Socket;
use std::io::ErrorKind;
use std::mem::MaybeUninit;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Instant;
use tracing::debug;

/// ICMP header length in bytes (type, code, checksum, rest-of-header)
const ICMP_HEADER_LEN_BYTES: usize = 8;
/// IPv4 header minimum length in bytes
const IPV4_HEADER_MIN_LEN_BYTES: usize = 20;

/// Decode a raw datagram from an ICMP socket into a [`Reply`].
///
/// `datagram` must start with the IPv4 header, which is how raw sockets
/// deliver ICMP. The ICMP body is located from the header length field rather
/// than the total length, since some kernels rewrite the latter.
pub fn decode_reply(datagram: &[u8], source: Ipv4Addr) -> Result<Reply, DecodeError> {
    let len = datagram.len();
    let ip = Ipv4Packet::new(datagram).ok_or(DecodeError::Truncated { len })?;

    let version = ip.get_version();
    if version != 4 {
        return Err(DecodeError::NotIpv4 { version });
    }

    let header_len = usize::from(ip.get_header_length()) * 4;
    if header_len < IPV4_HEADER_MIN_LEN_BYTES {
        return Err(DecodeError::BadHeaderLength { header_len });
    }

    let protocol = ip.get_next_level_protocol();
    if protocol != IpNextHeaderProtocols::Icmp {
        return Err(DecodeError::NotIcmp {
            protocol: protocol.0,
        });
    }

    let icmp_bytes = datagram
        .get(header_len..)
        .ok_or(DecodeError::BadHeaderLength { header_len })?;
    if icmp_bytes.len() < ICMP_HEADER_LEN_BYTES {
        return Err(DecodeError::Truncated { len });
    }
    let icmp = IcmpPacket::new(icmp_bytes).ok_or(DecodeError::Truncated { len })?;

    let code = icmp.get_icmp_code();
    let kind = match icmp.get_icmp_type() {
        IcmpTypes::TimeExceeded => ReplyKind::TimeExceeded,
        IcmpTypes::DestinationUnreachable => ReplyKind::DestinationUnreachable { code: code.0 },
        other => ReplyKind::Other {
            icmp_type: other.0,
            code: code.0,
        },
    };

    Ok(Reply { source, kind, len })
}

/// Raw ICMPv4 socket bound to all local interfaces.
///
/// Sees every ICMP message addressed to this host, not only replies to our
/// probes. Closed when dropped.
pub struct RawIcmpListener {
    socket: Socket,
}

impl RawIcmpListener {
    /// Wrap an already-created raw ICMPv4 socket and bind it to `0.0.0.0`
    pub fn new(socket: Socket) -> std::io::Result<Self> {
        let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0);
        socket.bind(&bind_addr.into())?;
        debug!("ICMP listener bound to {}", bind_addr.ip());
        Ok(Self { socket })
    }
}

impl ReplyListener for RawIcmpListener {
    fn recv_datagram(
        &mut self,
        buf: &mut [u8],
        deadline: Instant,
    ) -> std::io::Result<Option<(usize, Ipv4Addr)>> {
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            self.socket.set_read_timeout(Some(remaining))?;

            let mut recv_buf = [MaybeUninit::<u8>::uninit(); RECV_BUFFER_LEN];
            match self.socket.recv_from(&mut recv_buf) {
                Ok((size, addr)) => {
                    let Some(v4) = addr.as_socket_ipv4() else {
                        continue;
                    };
                    // SAFETY: recv_from reported `size` bytes written
                    let len = unsafe { copy_received(&recv_buf, size, buf) };
                    return Ok(Some((len, *v4.ip())));
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                    return Ok(None)
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Copy the first `size` received bytes of `recv_buf` into `buf`, returning
/// how many were copied.
///
/// # Safety
///
/// The first `size` elements of `recv_buf` must be initialized.
unsafe fn copy_received(recv_buf: &[MaybeUninit<u8>], size: usize, buf: &mut [u8]) -> usize {
    let len = size.min(recv_buf.len()).min(buf.len());
    let initialized_part: &[MaybeUninit<u8>] = &recv_buf[..len];
    // SAFETY: the caller guarantees this prefix is initialized, and
    // `MaybeUninit<u8>` has the layout of `u8`.
    let datagram: &[u8] =
        unsafe { &*(initialized_part as *const [MaybeUninit<u8>] as *const [u8]) };
    buf[..len].copy_from_slice(datagram);
    len
}

impl Drop for RawIcmpListener {
    fn drop(&mut self) {
        debug!("Closing ICMP listener");
    }
}

/// Build an IPv4 datagram carrying an ICMP header with the given type and code
#[cfg(test)]
pub(crate) fn test_datagram(icmp_type: u8, code: u8) -> Vec<u8> {
    use pnet::packet::icmp::{IcmpCode, IcmpType, MutableIcmpPacket};
    use pnet::packet::ipv4::MutableIpv4Packet;

    // Outer IPv4 header, ICMP header, then the quoted IPv4 + UDP headers
    let total = IPV4_HEADER_MIN_LEN_BYTES + ICMP_HEADER_LEN_BYTES + 28;
    let mut buf = vec![0u8; total];
    {
        let mut ip = MutableIpv4Packet::new(&mut buf).unwrap();
        ip.set_version(4);
        ip.set_header_length(5);
        ip.set_total_length(total as u16);
        ip.set_ttl(64);
        ip.set_next_level_protocol(IpNextHeaderProtocols::Icmp);
        ip.set_source(Ipv4Addr::new(10, 0, 0, 1));
        ip.set_destination(Ipv4Addr::new(192, 168, 1, 10));
    }
    {
        let mut icmp = MutableIcmpPacket::new(&mut buf[IPV4_HEADER_MIN_LEN_BYTES..]).unwrap();
        icmp.set_icmp_type(IcmpType(icmp_type));
        icmp.set_icmp_code(IcmpCode(code));
    }
    buf
}
