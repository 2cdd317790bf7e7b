use pnet::packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet::packet::icmp::{self, IcmpPacket, IcmpTypes};
use pnet::packet::Packet;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io;
use std::mem::MaybeUninit;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;
use tracing::debug;

/// Single ICMP echo reachability check.
///
/// Prefers an unprivileged ICMP datagram socket (`net.ipv4.ping_group_range`
/// must admit the process group), falling back to a raw socket where the
/// process has CAP_NET_RAW. The blocking socket I/O runs on the tokio
/// blocking pool. Any error is reported as "not reachable"; the caller
/// treats the host as possibly-recovering, never as blacklistable.
pub async fn ping(addr: Ipv4Addr, timeout: Duration) -> bool {
    match tokio::task::spawn_blocking(move || echo_once(addr, timeout)).await {
        Ok(Ok(reachable)) => reachable,
        Ok(Err(e)) => {
            debug!("ping: socket error, addr={}, error={}", addr, e);
            false
        }
        Err(e) => {
            debug!("ping: task join error, addr={}, error={}", addr, e);
            false
        }
    }
}

fn echo_once(addr: Ipv4Addr, timeout: Duration) -> io::Result<bool> {
    let socket = open_icmp_socket()?;
    socket.set_read_timeout(Some(timeout))?;

    let dest = SockAddr::from(SocketAddrV4::new(addr, 0));
    // Connecting makes the kernel filter replies down to this peer.
    socket.connect(&dest)?;

    let mut buf = [0u8; 16];
    let mut packet = MutableEchoRequestPacket::new(&mut buf)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "echo buffer too small"))?;
    packet.set_icmp_type(IcmpTypes::EchoRequest);
    packet.set_identifier((std::process::id() & 0xffff) as u16);
    packet.set_sequence_number(1);
    let sum = IcmpPacket::new(packet.packet())
        .map(|p| icmp::checksum(&p))
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "echo packet truncated"))?;
    packet.set_checksum(sum);

    socket.send(packet.packet())?;

    let mut reply = [MaybeUninit::<u8>::uninit(); 1500];
    match socket.recv(&mut reply) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => {
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

fn open_icmp_socket() -> io::Result<Socket> {
    Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::ICMPV4))
        .or_else(|_| Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4)))
}
