use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{info, instrument, warn};

use super::query::{DEFAULT_TIMEOUT, query_server};
use crate::adapters::network::NetworkContext;
use crate::adapters::resolver::{Resolver, SystemResolver};
use crate::adapters::transport::{StdUdpTransport, UdpTransport};
use crate::config::ClientConfig;
use crate::domain::ntp::{QueryResult, ServerAttempt, SyncReport};
use crate::error::NtpError;

/// Servers tried, in order, when nothing else is configured.
pub const DEFAULT_SERVERS: [&str; 4] = [
    "pool.ntp.org",
    "time.windows.com",
    "time.google.com",
    "time.cloudflare.com",
];

/// Shared flag asking a running sync pass to stop before its next server.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Sequential, first-answer-wins NTP client.
///
/// Servers are tried in the order they were added. A pass stops at the
/// first server that answers; if none does, the previous synced time is
/// kept and the client reports itself disconnected.
pub struct NtpClient<R = SystemResolver, T = StdUdpTransport> {
    resolver: R,
    transport: T,
    servers: Vec<String>,
    timeout: Duration,
    last_sync_time: Option<DateTime<Utc>>,
    synced_at: Option<Instant>,
    connected: bool,
    last_report: Option<SyncReport>,
    _network: NetworkContext,
}

impl NtpClient {
    pub fn new() -> Self {
        Self::with_parts(SystemResolver, StdUdpTransport::new())
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        let mut client = Self::new();
        client.servers = config.servers.clone();
        client.timeout = config.timeout;
        client
    }
}

impl Default for NtpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Resolver, T: UdpTransport> NtpClient<R, T> {
    /// Client over a custom resolver and transport, with the default servers.
    pub fn with_parts(resolver: R, transport: T) -> Self {
        NtpClient {
            resolver,
            transport,
            servers: DEFAULT_SERVERS.iter().map(|s| s.to_string()).collect(),
            timeout: DEFAULT_TIMEOUT,
            last_sync_time: None,
            synced_at: None,
            connected: false,
            last_report: None,
            _network: NetworkContext::acquire(),
        }
    }

    /// Replace the server list with [`DEFAULT_SERVERS`].
    pub fn set_default_servers(&mut self) {
        self.servers = DEFAULT_SERVERS.iter().map(|s| s.to_string()).collect();
    }

    /// Append a server. No validation, no deduplication.
    pub fn add_server(&mut self, server: impl Into<String>) {
        self.servers.push(server.into());
    }

    pub fn clear_servers(&mut self) {
        self.servers.clear();
    }

    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) -> Result<(), NtpError> {
        if timeout.is_zero() {
            return Err(NtpError::InvalidTimeout);
        }
        self.timeout = timeout;
        Ok(())
    }

    pub fn query_server(&self, server: &str, timeout: Duration) -> QueryResult {
        query_server(&self.resolver, &self.transport, server, timeout)
    }

    /// Run one sync pass; `true` if any server answered.
    pub fn synchronize_time(&mut self) -> bool {
        self.synchronize().success()
    }

    /// Run one sync pass and return what every tried server said.
    pub fn synchronize(&mut self) -> SyncReport {
        self.synchronize_with(&CancelToken::new())
    }

    /// Like [`synchronize`](Self::synchronize), checking `cancel` before each
    /// server. An in-flight query is never interrupted.
    #[instrument(skip(self, cancel), fields(servers = self.servers.len()))]
    pub fn synchronize_with(&mut self, cancel: &CancelToken) -> SyncReport {
        let mut report = SyncReport::new(Utc::now());

        for server in &self.servers {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let result = self.query_server(server, self.timeout);
            let answered = result.is_ok();
            match &result {
                Ok(r) => info!(
                    server = %server,
                    time = %r.synced_time,
                    rtt_ms = r.rtt_ms(),
                    "sync succeeded"
                ),
                Err(e) => warn!(server = %server, kind = %e.kind(), "{e}"),
            }
            report.attempts.push(ServerAttempt {
                server: server.clone(),
                result,
            });
            if answered {
                break;
            }
        }

        match report.response() {
            Some(r) => {
                self.last_sync_time = Some(r.synced_time);
                self.synced_at = Some(r.received_at);
                self.connected = true;
            }
            None => {
                warn!(attempts = report.attempts.len(), "no server answered");
                self.connected = false;
            }
        }
        self.last_report = Some(report.clone());
        report
    }

    /// Server time recorded by the last successful pass.
    pub fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        self.last_sync_time
    }

    /// Outcome of the most recent pass, regardless of its age.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn last_report(&self) -> Option<&SyncReport> {
        self.last_report.as_ref()
    }

    /// Monotonic instant the last successful answer was recorded.
    pub fn synced_at(&self) -> Option<Instant> {
        self.synced_at
    }

    /// Current network time: the last synced time advanced by the monotonic
    /// time elapsed since it was received.
    pub fn estimated_now(&self) -> Option<DateTime<Utc>> {
        let (time, at) = self.last_sync_time.zip(self.synced_at)?;
        let elapsed = TimeDelta::from_std(at.elapsed()).ok()?;
        time.checked_add_signed(elapsed)
    }

    /// True before the first success, or once `interval` has elapsed since
    /// the last one.
    pub fn sync_due(&self, interval: Duration) -> bool {
        self.synced_at.is_none_or(|at| at.elapsed() >= interval)
    }
}
