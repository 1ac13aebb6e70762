//! Decoding of captured probe-request frames.
//!
//! A captured buffer is a radiotap header followed by an 802.11 management
//! frame (and, when the radiotap flags say so, a trailing FCS). Every read is
//! bounds checked; a malformed frame yields a [`DecodeError`] and never a
//! panic.

mod error;
pub mod ieee80211;
pub mod radiotap;

pub use error::{DecodeError, RadiotapError};

use crate::{ProbeEvent, RawFrame};

/// Stateless decoder turning [`RawFrame`]s into [`ProbeEvent`]s.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use probemon_core::{FrameDecoder, RawFrame};
///
/// let frame = RawFrame::new(vec![0, 0, 8, 0, 0, 0, 0, 0], Utc::now());
/// assert!(FrameDecoder.decode(&frame).is_err());
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameDecoder;

impl FrameDecoder {
    /// Decode one captured frame.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when the radiotap header is malformed, lacks a
    /// channel frequency or dBm signal, or when the 802.11 body is truncated.
    pub fn decode(&self, frame: &RawFrame) -> Result<ProbeEvent, DecodeError> {
        let bytes = frame.bytes.as_slice();
        let info = radiotap::parse(bytes)?;
        let frequency = info.frequency.ok_or(DecodeError::MissingFrequency)?;
        let rssi = info.signal.ok_or(DecodeError::MissingSignal)?;

        let end = if info.fcs_at_end {
            bytes.len().saturating_sub(radiotap::FCS_LEN)
        } else {
            bytes.len()
        };
        let body = bytes.get(info.header_len..end).unwrap_or_default();
        let parsed = ieee80211::parse(body, info.header_len)?;

        Ok(ProbeEvent {
            captured_at: frame.captured_at,
            mac: parsed.source,
            ssid: parsed.ssid,
            rssi,
            frequency,
            vendor: None,
        })
    }
}
