//! Captured frames and the probe events decoded from them.

use chrono::{DateTime, Utc};

use crate::MacAddress;

/// Vendor name used when the manufacturer table has no matching range.
pub const UNKNOWN_VENDOR: &str = "unknown";

/// One captured link-layer buffer together with its receipt time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Captured bytes, radiotap header first.
    pub bytes: Vec<u8>,
    /// Time the capture layer received the frame.
    pub captured_at: DateTime<Utc>,
}

impl RawFrame {
    /// Pair captured bytes with their receipt time.
    #[must_use]
    pub fn new(bytes: Vec<u8>, captured_at: DateTime<Utc>) -> Self {
        Self { bytes, captured_at }
    }
}

/// A decoded probe request.
///
/// Produced by the decoder with `vendor` unset; the pipeline resolves the
/// vendor exactly once before the event is persisted or echoed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProbeEvent {
    /// Receipt time of the underlying frame.
    pub captured_at: DateTime<Utc>,
    /// Transmitter address.
    pub mac: MacAddress,
    /// SSID element value, at most 32 bytes. Empty for wildcard probes.
    pub ssid: Vec<u8>,
    /// Received signal strength in dBm.
    pub rssi: i8,
    /// Channel centre frequency in MHz.
    pub frequency: u16,
    /// Manufacturer display name once resolved.
    pub vendor: Option<String>,
}

impl ProbeEvent {
    /// Vendor name, falling back to [`UNKNOWN_VENDOR`] when unresolved.
    #[must_use]
    pub fn vendor_or_unknown(&self) -> &str {
        self.vendor.as_deref().unwrap_or(UNKNOWN_VENDOR)
    }

    /// Capture time as fractional seconds since the Unix epoch.
    #[must_use]
    pub fn timestamp_secs(&self) -> f64 {
        timestamp_secs(&self.captured_at)
    }
}

/// Convert a UTC instant to fractional Unix seconds.
#[expect(
    clippy::cast_precision_loss,
    reason = "epoch seconds stay far below 2^52 for any realistic capture time"
)]
#[must_use]
pub fn timestamp_secs(at: &DateTime<Utc>) -> f64 {
    at.timestamp() as f64 + f64::from(at.timestamp_subsec_micros()) / 1_000_000.0
}
