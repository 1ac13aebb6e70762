//! Builders for synthetic captured frames used by unit and behaviour tests.

use chrono::{DateTime, TimeZone, Utc};

use crate::RawFrame;

/// Capture time used when a test does not set one: 2023-11-14 22:13:20 UTC.
pub const DEFAULT_CAPTURED_AT_SECS: i64 = 1_700_000_000;

/// Builds radiotap + 802.11 probe-request buffers.
///
/// The radiotap header carries the flags, channel and dBm antenna signal
/// fields unless they are switched off.
#[derive(Debug, Clone)]
pub struct ProbeFrameBuilder {
    source: [u8; 6],
    ssid: Option<Vec<u8>>,
    extra_elements: Vec<u8>,
    rssi: Option<i8>,
    frequency: Option<u16>,
    fcs: bool,
    captured_at: DateTime<Utc>,
}

impl ProbeFrameBuilder {
    /// Start a frame transmitted by `source` with a wildcard SSID.
    #[must_use]
    pub fn new(source: [u8; 6]) -> Self {
        Self {
            source,
            ssid: None,
            extra_elements: Vec::new(),
            rssi: Some(-60),
            frequency: Some(2412),
            fcs: false,
            captured_at: at_secs(DEFAULT_CAPTURED_AT_SECS),
        }
    }

    /// Add an SSID element carrying `ssid` (any length, up to 255 bytes).
    #[must_use]
    pub fn ssid(mut self, ssid: &[u8]) -> Self {
        self.ssid = Some(ssid.to_vec());
        self
    }

    /// Append raw bytes after the elements, e.g. a truncated element.
    #[must_use]
    pub fn raw_elements(mut self, bytes: &[u8]) -> Self {
        self.extra_elements.extend_from_slice(bytes);
        self
    }

    /// Set the dBm antenna signal.
    #[must_use]
    pub fn rssi(mut self, rssi: i8) -> Self {
        self.rssi = Some(rssi);
        self
    }

    /// Set the channel frequency in MHz.
    #[must_use]
    pub fn frequency(mut self, mhz: u16) -> Self {
        self.frequency = Some(mhz);
        self
    }

    /// Omit the dBm antenna signal field.
    #[must_use]
    pub fn without_signal(mut self) -> Self {
        self.rssi = None;
        self
    }

    /// Omit the channel field.
    #[must_use]
    pub fn without_channel(mut self) -> Self {
        self.frequency = None;
        self
    }

    /// Append a four-byte FCS and flag it in the radiotap header.
    #[must_use]
    pub fn with_fcs(mut self) -> Self {
        self.fcs = true;
        self
    }

    /// Set the capture time.
    #[must_use]
    pub fn captured_at(mut self, at: DateTime<Utc>) -> Self {
        self.captured_at = at;
        self
    }

    /// Set the capture time in whole seconds since the Unix epoch.
    #[must_use]
    pub fn captured_at_secs(self, secs: i64) -> Self {
        self.captured_at(at_secs(secs))
    }

    /// Assemble the captured frame. SSIDs longer than 255 bytes are cut to
    /// fit a single element.
    #[must_use]
    pub fn build(&self) -> RawFrame {
        let mut present = 1_u32 << 1;
        let mut fields = Vec::new();
        fields.push(if self.fcs { 0x10 } else { 0x00 });
        if let Some(mhz) = self.frequency {
            present |= 1 << 3;
            pad_to(&mut fields, 2);
            fields.extend_from_slice(&mhz.to_le_bytes());
            fields.extend_from_slice(&0x00a0_u16.to_le_bytes());
        }
        if let Some(rssi) = self.rssi {
            present |= 1 << 5;
            fields.extend_from_slice(&rssi.to_le_bytes());
        }

        let it_len = u16::try_from(8 + fields.len()).unwrap_or(u16::MAX);
        let mut bytes = vec![0, 0];
        bytes.extend_from_slice(&it_len.to_le_bytes());
        bytes.extend_from_slice(&present.to_le_bytes());
        bytes.extend_from_slice(&fields);

        bytes.extend_from_slice(&[0x40, 0x00, 0x00, 0x00]);
        bytes.extend_from_slice(&[0xff; 6]);
        bytes.extend_from_slice(&self.source);
        bytes.extend_from_slice(&[0xff; 6]);
        bytes.extend_from_slice(&[0x10, 0x00]);
        if let Some(ssid) = &self.ssid {
            let value = ssid.get(..usize::from(u8::MAX)).unwrap_or(ssid);
            bytes.push(0);
            bytes.push(u8::try_from(value.len()).unwrap_or(u8::MAX));
            bytes.extend_from_slice(value);
        }
        bytes.extend_from_slice(&[1, 4, 0x02, 0x04, 0x0b, 0x16]);
        bytes.extend_from_slice(&self.extra_elements);
        if self.fcs {
            bytes.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        }
        RawFrame::new(bytes, self.captured_at)
    }
}

/// Offsets within the field area are relative to byte 8 of the header, which
/// is itself eight-byte aligned, so field-relative padding is sufficient.
fn pad_to(fields: &mut Vec<u8>, align: usize) {
    while fields.len() % align != 0 {
        fields.push(0);
    }
}

/// UTC instant `secs` seconds after the Unix epoch, or the epoch itself when
/// `secs` is out of range.
#[must_use]
pub fn at_secs(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}
