//! Radiotap header walking.
//!
//! The present-bitmap chain, namespace switching and the per-field alignment
//! and size tables come from the `radiotap` crate. Only the flags, channel and
//! dBm antenna signal fields are decoded.
//!
//! Fields are sliced here rather than through `RadiotapIterator`, which
//! indexes past its buffer when a vendor namespace declares a skip length
//! longer than the header.

use ::radiotap::field::{self, AntennaSignal, Channel, Flags, Header, Kind, VendorNamespace};

use super::error::RadiotapError;

/// Fixed part of the header: version, pad, `it_len` and the first present word.
const FIXED_HEADER_LEN: usize = 8;

/// Length of the trailing frame check sequence.
pub(crate) const FCS_LEN: usize = 4;

const PRESENT_WORD_LEN: usize = 4;
const NAMESPACE_SWITCH_BITS: u32 = (1 << 29) | (1 << 30);
const BIT_EXT: u32 = 1 << 31;
/// `radiotap` numbers fields in a `u8`, which overflows from the ninth
/// present word of one namespace.
const MAX_WORDS_PER_NAMESPACE: usize = 8;

/// Values extracted from a radiotap header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RadiotapInfo {
    /// Declared header length; the 802.11 frame starts here.
    pub header_len: usize,
    /// Channel centre frequency in MHz.
    pub frequency: Option<u16>,
    /// First non-zero dBm antenna signal, or zero if only zeros were seen.
    pub signal: Option<i8>,
    /// Whether the captured frame ends with a four-byte FCS.
    pub fcs_at_end: bool,
}

impl RadiotapInfo {
    fn is_complete(&self) -> bool {
        self.frequency.is_some() && self.signal.is_some_and(|s| s != 0)
    }

    fn record_signal(&mut self, value: i8) {
        match self.signal {
            Some(existing) if existing != 0 => {}
            _ => self.signal = Some(value),
        }
    }
}

/// Bounds-checked reader confined to the first `it_len` bytes.
struct Cursor<'a> {
    header: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn overrun(&self) -> RadiotapError {
        RadiotapError::FieldOverrun {
            offset: self.offset,
            it_len: self.header.len(),
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], RadiotapError> {
        let bytes = self
            .offset
            .checked_add(len)
            .and_then(|end| self.header.get(self.offset..end))
            .ok_or_else(|| self.overrun())?;
        self.offset += len;
        Ok(bytes)
    }

    /// Align to `kind`'s natural boundary and take its fixed-size body.
    fn take_field(&mut self, kind: &Kind) -> Result<&'a [u8], RadiotapError> {
        let align = usize::try_from(kind.align()).unwrap_or(1).max(1);
        self.offset = self.offset.next_multiple_of(align);
        self.take(kind.size())
    }

    fn decode<T: field::Field>(&self, bytes: &[u8]) -> Result<T, RadiotapError> {
        field::from_bytes(bytes).map_err(|_| self.overrun())
    }
}

/// Parse the radiotap prefix of `frame`.
///
/// # Errors
///
/// Returns a [`RadiotapError`] when the fixed header is malformed or a field
/// would be read past the declared header length. Fields the `radiotap` crate
/// cannot size are left out of the walk.
pub fn parse(frame: &[u8]) -> Result<RadiotapInfo, RadiotapError> {
    let (version, it_len) = match frame {
        [version, _pad, a, b, ..] if frame.len() >= FIXED_HEADER_LEN => {
            (*version, usize::from(u16::from_le_bytes([*a, *b])))
        }
        _ => return Err(RadiotapError::TooShort { len: frame.len() }),
    };
    if version != 0 {
        return Err(RadiotapError::UnsupportedVersion { version });
    }
    let header = frame
        .get(..it_len)
        .filter(|_| it_len >= FIXED_HEADER_LEN)
        .ok_or(RadiotapError::HeaderLength {
            it_len,
            buffer_len: frame.len(),
        })?;

    // Version and length are already checked, so only the present chain can fail.
    let parsed: Header = present_chain_is_walkable(header)
        .then(|| field::from_bytes(header).ok())
        .flatten()
        .ok_or(RadiotapError::PresentWords { it_len })?;
    let mut cursor = Cursor {
        header,
        offset: parsed.size,
    };
    let mut info = RadiotapInfo {
        header_len: it_len,
        ..RadiotapInfo::default()
    };

    for kind in &parsed.present {
        let bytes = cursor.take_field(kind)?;
        match kind {
            Kind::Flags => info.fcs_at_end = cursor.decode::<Flags>(bytes)?.fcs,
            Kind::Channel => info.frequency = Some(cursor.decode::<Channel>(bytes)?.freq),
            Kind::AntennaSignal => {
                info.record_signal(cursor.decode::<AntennaSignal>(bytes)?.value);
            }
            Kind::VendorNamespace(_) => {
                let namespace: VendorNamespace = cursor.decode(bytes)?;
                cursor.take(usize::from(namespace.skip_length))?;
            }
            _ => {}
        }
        if info.is_complete() {
            break;
        }
    }
    Ok(info)
}

fn present_chain_is_walkable(header: &[u8]) -> bool {
    let words = header
        .get(FIXED_HEADER_LEN - PRESENT_WORD_LEN..)
        .unwrap_or_default()
        .chunks_exact(PRESENT_WORD_LEN)
        .filter_map(|chunk| <[u8; PRESENT_WORD_LEN]>::try_from(chunk).ok())
        .map(u32::from_le_bytes);
    let mut in_namespace = 0_usize;
    for word in words {
        if in_namespace >= MAX_WORDS_PER_NAMESPACE {
            return false;
        }
        in_namespace = if word & NAMESPACE_SWITCH_BITS == 0 {
            in_namespace + 1
        } else {
            0
        };
        if word & BIT_EXT == 0 {
            break;
        }
    }
    true
}
