use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the ntpclock library.
///
/// Every variant is scoped to one server attempt unless noted otherwise.
/// Messages are stored as strings so errors can be cloned into reports.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NtpError {
    /// No live [`NetworkContext`](crate::adapters::network::NetworkContext).
    #[error("network subsystem not initialized")]
    NotInitialized,
    /// Socket creation or configuration failure.
    #[error("failed to create socket: {0}")]
    Socket(String),
    /// DNS resolution failure.
    #[error("failed to resolve server address: {0}")]
    Dns(String),
    /// The request datagram could not be sent.
    #[error("failed to send NTP request: {0}")]
    Send(String),
    /// The response datagram could not be received.
    #[error("failed to receive NTP response: {0}")]
    Receive(String),
    /// No response before the socket timeout expired.
    #[error("failed to receive NTP response: timed out after {} ms", .0.as_millis())]
    Timeout(Duration),
    /// The response violates the packet policy.
    #[error("malformed response: {0}")]
    Protocol(String),
    /// The server string could not be parsed.
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    /// Timeouts must be a positive number of milliseconds.
    #[error("invalid timeout: must be at least 1 ms")]
    InvalidTimeout,
    /// A background sync is already running.
    #[error("sync already in progress")]
    SyncInProgress,
    /// Other error cases.
    #[error("other: {0}")]
    Other(String),
}

/// Tag identifying which step of a query failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    NotInitialized,
    Socket,
    Dns,
    Send,
    Receive,
    Timeout,
    Protocol,
    InvalidTarget,
    InvalidTimeout,
    SyncInProgress,
    Other,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::NotInitialized => "not_initialized",
            FailureKind::Socket => "socket",
            FailureKind::Dns => "dns",
            FailureKind::Send => "send",
            FailureKind::Receive => "receive",
            FailureKind::Timeout => "timeout",
            FailureKind::Protocol => "protocol",
            FailureKind::InvalidTarget => "invalid_target",
            FailureKind::InvalidTimeout => "invalid_timeout",
            FailureKind::SyncInProgress => "sync_in_progress",
            FailureKind::Other => "other",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl NtpError {
    pub fn kind(&self) -> FailureKind {
        match self {
            NtpError::NotInitialized => FailureKind::NotInitialized,
            NtpError::Socket(_) => FailureKind::Socket,
            NtpError::Dns(_) => FailureKind::Dns,
            NtpError::Send(_) => FailureKind::Send,
            NtpError::Receive(_) => FailureKind::Receive,
            NtpError::Timeout(_) => FailureKind::Timeout,
            NtpError::Protocol(_) => FailureKind::Protocol,
            NtpError::InvalidTarget(_) => FailureKind::InvalidTarget,
            NtpError::InvalidTimeout => FailureKind::InvalidTimeout,
            NtpError::SyncInProgress => FailureKind::SyncInProgress,
            NtpError::Other(_) => FailureKind::Other,
        }
    }
}
