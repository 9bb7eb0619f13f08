//! Non-blocking wrapper around [`NtpClient`] for callers that must never
//! wait on network I/O, such as a UI loop.
//!
//! A pass runs on tokio's blocking pool. Progress is an atomic
//! [`SyncState`]:
//!
//! ```text
//! Idle -> Running -> Succeeded | Failed -> Idle (acknowledge)
//! ```
//!
//! `start` is refused while a pass is `Running`. Results are published to a
//! snapshot readers can query at any time without touching the client lock.
//! Servers added during a pass are queued and join the list when the client
//! is next free.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

use super::client::{CancelToken, NtpClient};
use crate::adapters::resolver::{Resolver, SystemResolver};
use crate::adapters::transport::{StdUdpTransport, UdpTransport};
use crate::domain::ntp::SyncReport;
use crate::error::NtpError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SyncState {
    Idle = 0,
    Running = 1,
    Succeeded = 2,
    Failed = 3,
}

impl SyncState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => SyncState::Running,
            2 => SyncState::Succeeded,
            3 => SyncState::Failed,
            _ => SyncState::Idle,
        }
    }

    pub fn is_finished(self) -> bool {
        matches!(self, SyncState::Succeeded | SyncState::Failed)
    }
}

#[derive(Debug, Clone, Default)]
struct Snapshot {
    servers: Vec<String>,
    last_sync_time: Option<DateTime<Utc>>,
    synced_at: Option<Instant>,
    connected: bool,
    last_report: Option<SyncReport>,
}

struct Shared<R, T> {
    client: Mutex<NtpClient<R, T>>,
    pending: Mutex<Vec<String>>,
    state: AtomicU8,
    snapshot: RwLock<Snapshot>,
}

/// Background sync service. Cloning yields another handle to the same
/// client.
pub struct BackgroundSync<R = SystemResolver, T = StdUdpTransport> {
    inner: Arc<Shared<R, T>>,
}

impl<R, T> Clone for BackgroundSync<R, T> {
    fn clone(&self) -> Self {
        BackgroundSync {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Handle to a running pass.
#[derive(Debug)]
pub struct SyncTask {
    handle: JoinHandle<SyncReport>,
    cancel: CancelToken,
}

impl SyncTask {
    /// Stop before the next server. The server currently being queried
    /// still runs to its own timeout.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn wait(self) -> Result<SyncReport, NtpError> {
        self.handle
            .await
            .map_err(|e| NtpError::Other(format!("sync task failed: {e}")))
    }
}

impl<R: Resolver, T: UdpTransport> Shared<R, T> {
    /// Lock order is client, pending, snapshot.
    fn drain_pending(&self, client: &mut NtpClient<R, T>) {
        let mut pending = self.pending.lock();
        if pending.is_empty() {
            return;
        }
        for server in pending.drain(..) {
            client.add_server(server);
        }
        self.snapshot.write().servers = client.servers().to_vec();
    }
}

/// Marks the pass `Failed` if it unwinds before reporting.
struct RunningGuard<'a> {
    state: &'a AtomicU8,
    done: bool,
}

impl RunningGuard<'_> {
    fn finish(mut self, success: bool) {
        let next = if success {
            SyncState::Succeeded
        } else {
            SyncState::Failed
        };
        self.state.store(next as u8, Ordering::Release);
        self.done = true;
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.state.store(SyncState::Failed as u8, Ordering::Release);
        }
    }
}

impl<R, T> BackgroundSync<R, T>
where
    R: Resolver + 'static,
    T: UdpTransport + 'static,
{
    pub fn new(client: NtpClient<R, T>) -> Self {
        let snapshot = Snapshot {
            servers: client.servers().to_vec(),
            last_sync_time: client.last_sync_time(),
            synced_at: client.synced_at(),
            connected: client.is_connected(),
            last_report: client.last_report().cloned(),
        };
        BackgroundSync {
            inner: Arc::new(Shared {
                client: Mutex::new(client),
                pending: Mutex::new(Vec::new()),
                state: AtomicU8::new(SyncState::Idle as u8),
                snapshot: RwLock::new(snapshot),
            }),
        }
    }

    pub fn state(&self) -> SyncState {
        SyncState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.state() == SyncState::Running
    }

    fn begin(&self) -> Result<(), NtpError> {
        let state = &self.inner.state;
        let mut current = state.load(Ordering::Acquire);
        loop {
            if current == SyncState::Running as u8 {
                return Err(NtpError::SyncInProgress);
            }
            match state.compare_exchange_weak(
                current,
                SyncState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }

    /// Launch a pass on the current tokio runtime.
    pub fn start(&self) -> Result<SyncTask, NtpError> {
        let runtime =
            Handle::try_current().map_err(|e| NtpError::Other(format!("no async runtime: {e}")))?;
        self.begin()?;
        debug!("background sync started");

        let cancel = CancelToken::new();
        let token = cancel.clone();
        let shared = Arc::clone(&self.inner);
        let handle = runtime.spawn_blocking(move || {
            let guard = RunningGuard {
                state: &shared.state,
                done: false,
            };
            let mut client = shared.client.lock();
            shared.drain_pending(&mut client);
            let report = client.synchronize_with(&token);
            *shared.snapshot.write() = Snapshot {
                servers: client.servers().to_vec(),
                last_sync_time: client.last_sync_time(),
                synced_at: client.synced_at(),
                connected: client.is_connected(),
                last_report: Some(report.clone()),
            };
            drop(client);
            guard.finish(report.success());
            report
        });

        Ok(SyncTask { handle, cancel })
    }

    /// Move a finished pass back to `Idle`; returns the state it was in.
    pub fn acknowledge(&self) -> SyncState {
        let prev = self
            .inner
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
                SyncState::from_u8(v)
                    .is_finished()
                    .then_some(SyncState::Idle as u8)
            })
            .unwrap_or_else(|v| v);
        SyncState::from_u8(prev)
    }

    /// Append a server without waiting on a running pass. A server added
    /// mid-pass is first tried by the next one.
    pub fn add_server(&self, server: impl Into<String>) {
        self.inner.pending.lock().push(server.into());
        if let Some(mut client) = self.inner.client.try_lock() {
            self.inner.drain_pending(&mut client);
        }
    }

    /// Server list in try order, including servers still queued.
    pub fn servers(&self) -> Vec<String> {
        let pending = self.inner.pending.lock();
        let mut servers = self.inner.snapshot.read().servers.clone();
        servers.extend(pending.iter().cloned());
        servers
    }

    pub fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        self.inner.snapshot.read().last_sync_time
    }

    pub fn is_connected(&self) -> bool {
        self.inner.snapshot.read().connected
    }

    pub fn last_report(&self) -> Option<SyncReport> {
        self.inner.snapshot.read().last_report.clone()
    }

    pub fn estimated_now(&self) -> Option<DateTime<Utc>> {
        let snap = self.inner.snapshot.read();
        let (time, at) = snap.last_sync_time.zip(snap.synced_at)?;
        let elapsed = TimeDelta::from_std(at.elapsed()).ok()?;
        time.checked_add_signed(elapsed)
    }

    pub fn sync_due(&self, interval: Duration) -> bool {
        self.inner
            .snapshot
            .read()
            .synced_at
            .is_none_or(|at| at.elapsed() >= interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_needs_a_runtime() {
        let sync = BackgroundSync::new(NtpClient::new());
        let err = sync.start().unwrap_err();
        assert!(matches!(err, NtpError::Other(_)));
        assert_eq!(sync.state(), SyncState::Idle);
    }

    #[test]
    fn acknowledge_only_resets_finished_states() {
        let sync = BackgroundSync::new(NtpClient::new());
        assert_eq!(sync.acknowledge(), SyncState::Idle);

        sync.inner.state.store(SyncState::Running as u8, Ordering::Release);
        assert_eq!(sync.acknowledge(), SyncState::Running);
        assert_eq!(sync.state(), SyncState::Running);
        assert!(matches!(sync.begin(), Err(NtpError::SyncInProgress)));

        sync.inner.state.store(SyncState::Failed as u8, Ordering::Release);
        assert_eq!(sync.acknowledge(), SyncState::Failed);
        assert_eq!(sync.state(), SyncState::Idle);
    }

    #[test]
    fn guard_marks_unwound_pass_failed() {
        let state = AtomicU8::new(SyncState::Running as u8);
        drop(RunningGuard {
            state: &state,
            done: false,
        });
        assert_eq!(SyncState::from_u8(state.load(Ordering::Acquire)), SyncState::Failed);
    }
}
