use chrono::{DateTime, Local, Utc};
use std::net::SocketAddrV4;
use std::time::{Duration, Instant};

use crate::error::NtpError;

/// Server name as configured, plus the address it resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub addr: SocketAddrV4,
}

/// A server that answered with a usable timestamp.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerResponse {
    pub target: Target,
    /// The server's transmit timestamp, trusted as-is.
    pub synced_time: DateTime<Utc>,
    /// Send-to-receive time. Diagnostic only.
    pub round_trip: Duration,
    /// Monotonic instant the reply was read off the socket.
    pub received_at: Instant,
    pub stratum: u8,
    pub ref_id: String,
}

impl ServerResponse {
    pub fn local_time(&self) -> DateTime<Local> {
        DateTime::from(self.synced_time)
    }

    pub fn rtt_ms(&self) -> f64 {
        self.round_trip.as_secs_f64() * 1000.0
    }
}

/// Outcome of querying a single server.
pub type QueryResult = Result<ServerResponse, NtpError>;

#[derive(Clone, Debug)]
pub struct ServerAttempt {
    pub server: String,
    pub result: QueryResult,
}

/// Everything one sync pass learned, in the order servers were tried.
#[derive(Clone, Debug)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub attempts: Vec<ServerAttempt>,
    /// The pass was stopped before every server could be tried.
    pub cancelled: bool,
}

impl SyncReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        SyncReport {
            started_at,
            attempts: Vec::new(),
            cancelled: false,
        }
    }

    pub fn success(&self) -> bool {
        self.response().is_some()
    }

    /// The answer that ended the pass, if any.
    pub fn response(&self) -> Option<&ServerResponse> {
        self.attempts.last().and_then(|a| a.result.as_ref().ok())
    }

    pub fn synced_time(&self) -> Option<DateTime<Utc>> {
        self.response().map(|r| r.synced_time)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &NtpError)> {
        self.attempts
            .iter()
            .filter_map(|a| a.result.as_ref().err().map(|e| (a.server.as_str(), e)))
    }
}
