//! 802.11 management header and information element parsing.

use log::debug;

use super::error::DecodeError;
use crate::{MAX_SSID_LEN, MacAddress};

/// Length of the management frame header preceding the elements.
pub(crate) const MGMT_HEADER_LEN: usize = 24;
/// Offset of the transmitter address within the header.
const SOURCE_ADDR_OFFSET: usize = 10;
const ELEMENT_ID_SSID: u8 = 0;

/// Fields extracted from a probe request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeBody {
    /// Transmitter address.
    pub source: MacAddress,
    /// First SSID element value, truncated to [`MAX_SSID_LEN`] bytes.
    pub ssid: Vec<u8>,
}

/// Parse the management frame occupying `frame`.
///
/// `frame` starts at the frame control field and ends before any FCS. The
/// frame control field is not validated; the capture filter only passes probe
/// requests.
///
/// # Errors
///
/// Returns [`DecodeError::TruncatedHeader`] when fewer than 24 bytes are
/// available, and [`DecodeError::ElementOverrun`] when an element ahead of
/// the first SSID declares a length running past the end of the frame.
/// Elements after the first SSID are never read.
pub fn parse(frame: &[u8], base_offset: usize) -> Result<ProbeBody, DecodeError> {
    let (header, elements) = frame
        .split_at_checked(MGMT_HEADER_LEN)
        .ok_or(DecodeError::TruncatedHeader {
            needed: MGMT_HEADER_LEN,
            available: frame.len(),
        })?;
    let source = match header.get(SOURCE_ADDR_OFFSET..SOURCE_ADDR_OFFSET + 6) {
        Some(&[a, b, c, d, e, f]) => MacAddress::new([a, b, c, d, e, f]),
        _ => {
            return Err(DecodeError::TruncatedHeader {
                needed: MGMT_HEADER_LEN,
                available: frame.len(),
            });
        }
    };

    let mut ssid = Vec::new();
    let mut rest = elements;
    let mut offset = base_offset + MGMT_HEADER_LEN;
    while let Some((&id, tail)) = rest.split_first() {
        let overrun = DecodeError::ElementOverrun { id, offset };
        let (&len, tail) = tail.split_first().ok_or_else(|| overrun.clone())?;
        let (value, tail) = tail.split_at_checked(usize::from(len)).ok_or(overrun)?;
        if id == ELEMENT_ID_SSID {
            ssid = truncate_ssid(value);
            break;
        }
        offset += 2 + usize::from(len);
        rest = tail;
    }

    Ok(ProbeBody { source, ssid })
}

fn truncate_ssid(value: &[u8]) -> Vec<u8> {
    let kept = value.get(..MAX_SSID_LEN).unwrap_or(value);
    if kept.len() < value.len() {
        debug!(
            "truncating {}-byte SSID element to {MAX_SSID_LEN} bytes",
            value.len()
        );
    }
    kept.to_vec()
}
