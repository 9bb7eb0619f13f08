use std::net::Ipv4Addr;

use tracing::debug;

use super::timestamp::NtpTimestamp;
use crate::error::NtpError;

/// Size of an NTP header without extension fields.
pub const PACKET_SIZE: usize = 48;
/// Well-known NTP server port.
pub const NTP_PORT: u16 = 123;

/// LI = 0, VN = 3, Mode = 3 (client).
pub const CLIENT_REQUEST_FLAGS: u8 = 0x1B;

pub const MODE_CLIENT: u8 = 3;
pub const MODE_SERVER: u8 = 4;

const MODE_MASK: u8 = 0b0000_0111;
const VERSION_MASK: u8 = 0b0011_1000;
const VERSION_SHIFT: u8 = 3;
const LI_SHIFT: u8 = 6;

/// Decoded NTP header. Multi-byte fields are big-endian on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NtpPacket {
    pub li_vn_mode: u8,
    pub stratum: u8,
    pub poll: i8,
    pub precision: i8,
    pub root_delay: u32,
    pub root_dispersion: u32,
    pub ref_id: u32,
    pub ref_timestamp: NtpTimestamp,
    pub origin_timestamp: NtpTimestamp,
    pub recv_timestamp: NtpTimestamp,
    pub tx_timestamp: NtpTimestamp,
}

impl NtpPacket {
    /// Client request carrying `transmit` as its transmit timestamp; every
    /// other field is zero.
    pub fn request(transmit: NtpTimestamp) -> Self {
        NtpPacket {
            li_vn_mode: CLIENT_REQUEST_FLAGS,
            tx_timestamp: transmit,
            ..Default::default()
        }
    }

    pub fn leap_indicator(&self) -> u8 {
        self.li_vn_mode >> LI_SHIFT
    }

    pub fn version(&self) -> u8 {
        (self.li_vn_mode & VERSION_MASK) >> VERSION_SHIFT
    }

    pub fn mode(&self) -> u8 {
        self.li_vn_mode & MODE_MASK
    }

    pub fn to_bytes(&self) -> [u8; PACKET_SIZE] {
        let mut buf = [0u8; PACKET_SIZE];
        buf[0] = self.li_vn_mode;
        buf[1] = self.stratum;
        buf[2] = self.poll as u8;
        buf[3] = self.precision as u8;
        buf[4..8].copy_from_slice(&self.root_delay.to_be_bytes());
        buf[8..12].copy_from_slice(&self.root_dispersion.to_be_bytes());
        buf[12..16].copy_from_slice(&self.ref_id.to_be_bytes());
        buf[16..24].copy_from_slice(&self.ref_timestamp.raw().to_be_bytes());
        buf[24..32].copy_from_slice(&self.origin_timestamp.raw().to_be_bytes());
        buf[32..40].copy_from_slice(&self.recv_timestamp.raw().to_be_bytes());
        buf[40..48].copy_from_slice(&self.tx_timestamp.raw().to_be_bytes());
        buf
    }

    /// Parse a received datagram. Anything shorter than a full header is
    /// rejected; trailing bytes (extension fields, MAC) are ignored.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, NtpError> {
        let Some(header) = buf.get(..PACKET_SIZE) else {
            return Err(NtpError::Protocol(format!(
                "expected {PACKET_SIZE} bytes, got {}",
                buf.len()
            )));
        };
        let u32_at = |at: usize| {
            u32::from_be_bytes([header[at], header[at + 1], header[at + 2], header[at + 3]])
        };
        let ts_at = |at: usize| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&header[at..at + 8]);
            NtpTimestamp::from_raw(u64::from_be_bytes(raw))
        };
        Ok(NtpPacket {
            li_vn_mode: header[0],
            stratum: header[1],
            poll: header[2] as i8,
            precision: header[3] as i8,
            root_delay: u32_at(4),
            root_dispersion: u32_at(8),
            ref_id: u32_at(12),
            ref_timestamp: ts_at(16),
            origin_timestamp: ts_at(24),
            recv_timestamp: ts_at(32),
            tx_timestamp: ts_at(40),
        })
    }

    /// Check a server reply against the request that produced it.
    ///
    /// Returns the trusted transmit timestamp.
    pub fn validate_response(&self, sent: NtpTimestamp) -> Result<NtpTimestamp, NtpError> {
        if self.mode() != MODE_SERVER {
            return Err(NtpError::Protocol(format!(
                "unexpected mode {} (want {MODE_SERVER})",
                self.mode()
            )));
        }
        if self.stratum == 0 {
            return Err(NtpError::Protocol(format!(
                "kiss-o'-death from server: {}",
                self.reference_id()
            )));
        }
        if self.tx_timestamp.is_zero() {
            return Err(NtpError::Protocol("transmit timestamp is zero".into()));
        }
        if self.origin_timestamp != sent {
            debug!(
                expected = sent.raw(),
                got = self.origin_timestamp.raw(),
                "origin timestamp mismatch"
            );
            return Err(NtpError::Protocol(
                "origin timestamp does not match request".into(),
            ));
        }
        Ok(self.tx_timestamp)
    }

    /// Reference id rendered the way `ntpq` does: four ASCII characters for
    /// stratum 0/1 (kiss codes, reference clocks), a dotted IPv4 otherwise.
    pub fn reference_id(&self) -> String {
        let bytes = self.ref_id.to_be_bytes();
        if self.stratum <= 1 {
            bytes
                .iter()
                .take_while(|b| **b != 0)
                .map(|&b| if b.is_ascii_graphic() { b as char } else { '?' })
                .collect()
        } else {
            Ipv4Addr::from(bytes).to_string()
        }
    }
}
