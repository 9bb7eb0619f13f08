use std::net::{SocketAddr, SocketAddrV4, ToSocketAddrs};

use tracing::debug;

use crate::error::NtpError;

/// Turns a host name into the IPv4 address to query.
///
/// IPv6 is deliberately not offered; implement this trait to change that.
pub trait Resolver: Send + Sync {
    fn resolve(&self, host: &str, port: u16) -> Result<SocketAddrV4, NtpError>;
}

/// Resolver backed by the operating system (`getaddrinfo`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl Resolver for SystemResolver {
    fn resolve(&self, host: &str, port: u16) -> Result<SocketAddrV4, NtpError> {
        resolve_ipv4(host, port)
    }
}

/// Resolve `host` and return its first IPv4 address.
pub fn resolve_ipv4(host: &str, port: u16) -> Result<SocketAddrV4, NtpError> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| NtpError::Dns(format!("'{}': {}", host, e)))?
        .collect();
    debug!(host, candidates = addrs.len(), "resolved");

    addrs
        .into_iter()
        .find_map(|a| match a {
            SocketAddr::V4(v4) => Some(v4),
            SocketAddr::V6(_) => None,
        })
        .ok_or_else(|| NtpError::Dns(format!("No IPv4 address found for '{}'", host)))
}
