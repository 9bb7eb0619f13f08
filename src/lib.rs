//! ntpclock: a minimal NTP client.
//!
//! [`NtpClient`] walks an ordered list of servers, sends each one a single
//! 48-byte request and trusts the transmit timestamp of the first reply.
//! [`BackgroundSync`] runs the same pass off the caller's thread.

pub mod adapters;
pub mod config;
pub mod domain;
mod error;
pub mod fmt;
pub mod protocol;
pub mod services;

pub use config::{ClientConfig, ConfigError};
pub use domain::ntp::{QueryResult, ServerAttempt, ServerResponse, SyncReport, Target};
pub use error::{FailureKind, NtpError};
pub use services::background::{BackgroundSync, SyncState, SyncTask};
pub use services::client::{CancelToken, DEFAULT_SERVERS, NtpClient};
pub use services::query::{DEFAULT_TIMEOUT, parse_target};
