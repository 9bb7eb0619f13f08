use chrono::{DateTime, Utc};

/// Seconds between the NTP epoch (1900-01-01) and the Unix epoch (1970-01-01).
pub const UNIX_TO_NTP_OFFSET: u64 = 2_208_988_800;

const FRACTION_MASK: u64 = 0xFFFF_FFFF;
const MICROS_PER_SEC: u64 = 1_000_000;

/// 64-bit NTP fixed-point timestamp.
///
/// The upper 32 bits count whole seconds since 1900-01-01 UTC, the lower
/// 32 bits are the fractional second in units of 2^-32 s. Era rollover
/// (February 2036) is not handled: every value is read as era 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NtpTimestamp(u64);

impl NtpTimestamp {
    pub const ZERO: NtpTimestamp = NtpTimestamp(0);

    pub const fn from_raw(raw: u64) -> Self {
        NtpTimestamp(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Whole seconds since the NTP epoch.
    pub const fn seconds(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Fractional second in 2^-32 units.
    pub const fn fraction(self) -> u32 {
        (self.0 & FRACTION_MASK) as u32
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Encode a Unix time given as seconds plus microseconds.
    ///
    /// The fraction is rounded up so that [`to_datetime`](Self::to_datetime)
    /// returns the same microsecond.
    pub fn from_unix(unix_seconds: i64, micros: u32) -> Self {
        let ntp_seconds =
            (unix_seconds.wrapping_add(UNIX_TO_NTP_OFFSET as i64) as u64) & FRACTION_MASK;
        let micros = u64::from(micros.min(999_999));
        let fraction = ((micros << 32) + MICROS_PER_SEC - 1) / MICROS_PER_SEC;
        NtpTimestamp((ntp_seconds << 32) | fraction)
    }

    pub fn from_datetime(dt: &DateTime<Utc>) -> Self {
        Self::from_unix(dt.timestamp(), dt.timestamp_subsec_micros())
    }

    pub fn now() -> Self {
        Self::from_datetime(&Utc::now())
    }

    /// Unix seconds and microseconds encoded by this timestamp.
    pub fn to_unix(self) -> (i64, u32) {
        let unix_seconds = i64::from(self.seconds()) - UNIX_TO_NTP_OFFSET as i64;
        let micros = (u64::from(self.fraction()) * MICROS_PER_SEC) >> 32;
        (unix_seconds, micros as u32)
    }

    pub fn to_datetime(self) -> DateTime<Utc> {
        let (secs, micros) = self.to_unix();
        // 32-bit NTP seconds always land inside chrono's range.
        DateTime::from_timestamp(secs, micros * 1_000).unwrap_or_default()
    }
}

impl From<u64> for NtpTimestamp {
    fn from(raw: u64) -> Self {
        NtpTimestamp(raw)
    }
}

impl From<NtpTimestamp> for u64 {
    fn from(ts: NtpTimestamp) -> Self {
        ts.0
    }
}

impl From<DateTime<Utc>> for NtpTimestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        NtpTimestamp::from_datetime(&dt)
    }
}

impl From<NtpTimestamp> for DateTime<Utc> {
    fn from(ts: NtpTimestamp) -> Self {
        ts.to_datetime()
    }
}
