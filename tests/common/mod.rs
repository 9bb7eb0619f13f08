//! Loopback NTP servers for integration tests.

#![allow(dead_code)]

use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use ntpclock::protocol::{NtpPacket, NtpTimestamp};

/// Fixed server time handed out by [`Behavior::Reply`] servers.
pub const SERVER_UNIX_SECS: i64 = 1_750_000_000;
pub const SERVER_MICROS: u32 = 250_000;

#[derive(Debug, Clone)]
pub enum Behavior {
    /// Well-formed server reply carrying `SERVER_UNIX_SECS`.
    Reply,
    /// Never answers.
    Silent,
    /// Answers with these raw bytes.
    Raw(Vec<u8>),
    /// Echoes the request back unchanged (mode 3).
    Echo,
    /// Valid reply whose origin timestamp is wrong.
    WrongOrigin,
}

pub struct MockServer {
    pub addr: SocketAddrV4,
    hits: Arc<AtomicUsize>,
}

impl MockServer {
    /// `host:port` string for the client's server list.
    pub fn target(&self) -> String {
        self.addr.to_string()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

pub fn server_time() -> NtpTimestamp {
    NtpTimestamp::from_unix(SERVER_UNIX_SECS, SERVER_MICROS)
}

fn reply_to(request: &NtpPacket) -> NtpPacket {
    NtpPacket {
        li_vn_mode: 0x1C,
        stratum: 2,
        ref_id: u32::from_be_bytes([127, 0, 0, 1]),
        origin_timestamp: request.tx_timestamp,
        recv_timestamp: server_time(),
        tx_timestamp: server_time(),
        ..Default::default()
    }
}

/// Bind a server thread on 127.0.0.1. It exits after 30 s without traffic.
pub fn spawn(behavior: Behavior) -> MockServer {
    let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind mock server");
    socket
        .set_read_timeout(Some(Duration::from_secs(30)))
        .expect("set timeout");
    let addr = match socket.local_addr().expect("local addr") {
        std::net::SocketAddr::V4(v4) => v4,
        other => panic!("unexpected address {other}"),
    };
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    thread::spawn(move || {
        let mut buf = [0u8; 512];
        while let Ok((len, peer)) = socket.recv_from(&mut buf) {
            counter.fetch_add(1, Ordering::SeqCst);
            let Ok(request) = NtpPacket::from_bytes(&buf[..len]) else {
                continue;
            };
            let response = match &behavior {
                Behavior::Silent => continue,
                Behavior::Reply => reply_to(&request).to_bytes().to_vec(),
                Behavior::Raw(bytes) => bytes.clone(),
                Behavior::Echo => buf[..len].to_vec(),
                Behavior::WrongOrigin => {
                    let mut reply = reply_to(&request);
                    reply.origin_timestamp = NtpTimestamp::from_raw(!request.tx_timestamp.raw());
                    reply.to_bytes().to_vec()
                }
            };
            let _ = socket.send_to(&response, peer);
        }
    });

    MockServer { addr, hits }
}
