//! Wire-level NTP: the 48-byte packet and 64-bit fixed-point timestamps.
//!
//! Nothing in here performs I/O.

pub mod packet;
pub mod timestamp;

pub use packet::{NTP_PORT, NtpPacket, PACKET_SIZE};
pub use timestamp::{NtpTimestamp, UNIX_TO_NTP_OFFSET};
