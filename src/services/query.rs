use std::io;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::{Duration, Instant};

use tracing::{debug, instrument};

use crate::adapters::network::NetworkContext;
use crate::adapters::resolver::Resolver;
use crate::adapters::transport::{DatagramSocket, UdpTransport};
use crate::domain::ntp::{QueryResult, ServerResponse, Target};
use crate::error::NtpError;
use crate::protocol::{NTP_PORT, NtpPacket, NtpTimestamp, PACKET_SIZE};

/// Per-query timeout used when the caller does not pick one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Parsed view of a server string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTarget<'a> {
    pub host: &'a str,
    pub port: Option<u16>,
}

/// Strict port parsing with range check (1..=65535).
fn parse_port_strict(s: &str) -> Result<u16, NtpError> {
    let raw =
        u32::from_str(s).map_err(|_| NtpError::InvalidTarget(format!("invalid port: '{s}'")))?;
    if raw == 0 || raw > u16::MAX as u32 {
        return Err(NtpError::InvalidTarget(format!(
            "port out of range [1..65535]: {raw}"
        )));
    }
    Ok(raw as u16)
}

/// Parse a server string.
///
/// Supported forms:
/// - "hostname"
/// - "hostname:123"
/// - "1.2.3.4"
/// - "1.2.3.4:123"
///
/// IPv6 literals, bracketed or bare, are rejected: resolution is IPv4 only.
pub fn parse_target(input: &str) -> Result<ParsedTarget<'_>, NtpError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(NtpError::InvalidTarget("empty target".into()));
    }
    if s.starts_with('[') {
        return Err(NtpError::InvalidTarget(format!(
            "IPv6 targets are not supported: '{s}'"
        )));
    }

    // More than one ':' can only be a bare IPv6 literal.
    if s.bytes().filter(|&b| b == b':').count() > 1 {
        return Err(NtpError::InvalidTarget(format!(
            "IPv6 targets are not supported: '{s}'"
        )));
    }

    match s.rsplit_once(':') {
        None => Ok(ParsedTarget {
            host: s,
            port: None,
        }),
        Some((host, port)) => {
            if host.is_empty() {
                return Err(NtpError::InvalidTarget(format!(
                    "missing host before port in '{s}'"
                )));
            }
            Ok(ParsedTarget {
                host,
                port: Some(parse_port_strict(port)?),
            })
        }
    }
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// Query one server and decode its transmit timestamp.
///
/// Exactly one request is sent and one datagram awaited; the socket is
/// dropped on every path out of this function.
#[instrument(skip(resolver, transport))]
pub fn query_server<R, T>(
    resolver: &R,
    transport: &T,
    server: &str,
    timeout: Duration,
) -> QueryResult
where
    R: Resolver + ?Sized,
    T: UdpTransport + ?Sized,
{
    if !NetworkContext::is_initialized() {
        return Err(NtpError::NotInitialized);
    }
    if timeout.is_zero() {
        return Err(NtpError::InvalidTimeout);
    }

    let socket = transport.open(timeout)?;

    let parsed = parse_target(server)?;
    let addr = resolver.resolve(parsed.host, parsed.port.unwrap_or(NTP_PORT))?;

    let sent = NtpTimestamp::now();
    let request = NtpPacket::request(sent).to_bytes();

    let start = Instant::now();
    socket
        .send_to(&request, addr)
        .map_err(|e| NtpError::Send(e.to_string()))?;
    debug!(%addr, "request sent");

    let mut buf = [0u8; PACKET_SIZE];
    let (len, from) = socket.recv_from(&mut buf).map_err(|e| {
        if is_timeout(&e) {
            NtpError::Timeout(timeout)
        } else {
            NtpError::Receive(e.to_string())
        }
    })?;
    let received_at = Instant::now();
    let round_trip = received_at.duration_since(start);
    drop(socket);

    if from != SocketAddr::V4(addr) {
        return Err(NtpError::Receive(format!(
            "response from unexpected address {from}"
        )));
    }
    debug!(len, rtt_us = round_trip.as_micros() as u64, "response received");

    let packet = NtpPacket::from_bytes(&buf[..len])?;
    let transmit = packet.validate_response(sent)?;

    Ok(ServerResponse {
        target: Target {
            name: server.to_string(),
            addr,
        },
        synced_time: transmit.to_datetime(),
        round_trip,
        received_at,
        stratum: packet.stratum,
        ref_id: packet.reference_id(),
    })
}
