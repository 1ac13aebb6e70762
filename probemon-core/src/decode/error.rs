//! Errors raised while decoding captured frames.

use thiserror::Error;

/// Failure to interpret the radiotap prefix of a frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RadiotapError {
    /// The buffer cannot hold the fixed eight-byte radiotap header.
    #[error("buffer of {len} bytes is too short for a radiotap header")]
    TooShort {
        /// Length of the captured buffer.
        len: usize,
    },
    /// Only radiotap version 0 exists.
    #[error("unsupported radiotap version {version}")]
    UnsupportedVersion {
        /// Version byte found in the header.
        version: u8,
    },
    /// `it_len` is shorter than the fixed header or longer than the buffer.
    #[error("radiotap length {it_len} is invalid for a buffer of {buffer_len} bytes")]
    HeaderLength {
        /// Declared radiotap header length.
        it_len: usize,
        /// Length of the captured buffer.
        buffer_len: usize,
    },
    /// The chain of present bitmaps runs past `it_len` or is too long to walk.
    #[error("present bitmap chain is malformed within radiotap length {it_len}")]
    PresentWords {
        /// Declared radiotap header length.
        it_len: usize,
    },
    /// A field (or vendor namespace data) runs past `it_len`.
    #[error("radiotap field at offset {offset} runs past radiotap length {it_len}")]
    FieldOverrun {
        /// Aligned offset at which the field starts.
        offset: usize,
        /// Declared radiotap header length.
        it_len: usize,
    },
}

/// Reasons a captured frame yields no probe event.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The radiotap prefix was malformed.
    #[error(transparent)]
    Radiotap(#[from] RadiotapError),
    /// Radiotap carried no channel field.
    #[error("radiotap header carries no channel frequency")]
    MissingFrequency,
    /// Radiotap carried no dBm antenna signal field.
    #[error("radiotap header carries no dBm antenna signal")]
    MissingSignal,
    /// The 802.11 management header is cut short.
    #[error("802.11 header needs {needed} bytes but only {available} were captured")]
    TruncatedHeader {
        /// Bytes required past the radiotap prefix.
        needed: usize,
        /// Bytes actually available past the radiotap prefix.
        available: usize,
    },
    /// An information element runs past the end of the frame.
    #[error("information element {id} at offset {offset} runs past the end of the frame")]
    ElementOverrun {
        /// Element id, when the id byte itself was captured.
        id: u8,
        /// Offset of the element within the buffer.
        offset: usize,
    },
}
