use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use crate::error::NtpError;

/// A connectionless socket able to carry one NTP exchange.
///
/// Dropping the socket closes it.
pub trait DatagramSocket {
    fn send_to(&self, buf: &[u8], addr: SocketAddrV4) -> io::Result<usize>;
    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;
}

/// Factory for per-query sockets.
pub trait UdpTransport: Send + Sync {
    type Socket: DatagramSocket;

    /// Open a fresh socket whose send and receive operations give up after
    /// `timeout`.
    fn open(&self, timeout: Duration) -> Result<Self::Socket, NtpError>;
}

/// [`UdpTransport`] over [`std::net::UdpSocket`].
#[derive(Debug, Clone, Copy)]
pub struct StdUdpTransport {
    bind: SocketAddrV4,
}

impl StdUdpTransport {
    pub fn new() -> Self {
        Self::bound_to(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))
    }

    pub fn bound_to(bind: SocketAddrV4) -> Self {
        StdUdpTransport { bind }
    }
}

impl Default for StdUdpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UdpTransport for StdUdpTransport {
    type Socket = UdpSocket;

    fn open(&self, timeout: Duration) -> Result<UdpSocket, NtpError> {
        let socket = UdpSocket::bind(self.bind).map_err(|e| NtpError::Socket(e.to_string()))?;
        socket
            .set_read_timeout(Some(timeout))
            .and_then(|_| socket.set_write_timeout(Some(timeout)))
            .map_err(|e| NtpError::Socket(e.to_string()))?;
        Ok(socket)
    }
}

impl DatagramSocket for UdpSocket {
    fn send_to(&self, buf: &[u8], addr: SocketAddrV4) -> io::Result<usize> {
        UdpSocket::send_to(self, buf, addr)
    }

    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        UdpSocket::recv_from(self, buf)
    }
}
