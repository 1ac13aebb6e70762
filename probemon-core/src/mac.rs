//! IEEE 802 MAC addresses.

use std::{fmt, str::FromStr};

use thiserror::Error;

/// Largest value representable by a 48-bit MAC address.
const MAC_MAX: u64 = (1 << 48) - 1;
/// Locally administered bit of the first octet.
const LAA_BIT: u8 = 0b0000_0010;

/// A 48-bit hardware address.
///
/// Displayed in canonical lower-case, colon-separated form.
///
/// # Examples
///
/// ```
/// use probemon_core::MacAddress;
///
/// # fn main() -> Result<(), probemon_core::MacParseError> {
/// let mac: MacAddress = "AA-BB-CC-DD-EE-FF".parse()?;
/// assert_eq!(mac.to_string(), "aa:bb:cc:dd:ee:ff");
/// assert_eq!(mac.as_u64(), 0xaabb_ccdd_eeff);
/// assert!(mac.is_locally_administered());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(into = "String", try_from = "String"))]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Wrap raw octets in transmission order.
    #[must_use]
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Build an address from the low 48 bits of `value`.
    ///
    /// # Errors
    ///
    /// Returns [`MacParseError::OutOfRange`] when `value` has bits set above
    /// the low 48.
    pub fn from_u64(value: u64) -> Result<Self, MacParseError> {
        if value > MAC_MAX {
            return Err(MacParseError::OutOfRange { value });
        }
        let [_, _, a, b, c, d, e, f] = value.to_be_bytes();
        Ok(Self([a, b, c, d, e, f]))
    }

    /// Raw octets.
    #[must_use]
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// The address as a 48-bit integer, first octet most significant.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
            .iter()
            .fold(0_u64, |acc, octet| (acc << 8) | u64::from(*octet))
    }

    /// Whether the locally administered bit is set, which usually marks a
    /// randomised address rather than a manufacturer-assigned one.
    #[must_use]
    pub const fn is_locally_administered(&self) -> bool {
        self.0[0] & LAA_BIT == LAA_BIT
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for MacAddress {
    type Err = MacParseError;

    /// Accepts `:`-, `-`- or `.`-separated forms as well as bare hex.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let digits = strip_separators(input);
        if digits.len() != 12 {
            return Err(MacParseError::Length {
                input: input.to_owned(),
            });
        }
        let value = u64::from_str_radix(&digits, 16).map_err(|_| MacParseError::NotHex {
            input: input.to_owned(),
        })?;
        Self::from_u64(value)
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.to_string()
    }
}

impl TryFrom<String> for MacAddress {
    type Error = MacParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Remove the separators used by the common MAC notations.
pub(crate) fn strip_separators(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|ch| !matches!(ch, ':' | '-' | '.'))
        .collect()
}

/// Errors raised when parsing a [`MacAddress`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MacParseError {
    /// The input did not contain exactly twelve hex digits.
    #[error("MAC address {input:?} must contain exactly 12 hex digits")]
    Length {
        /// Rejected input.
        input: String,
    },
    /// The input contained non-hexadecimal characters.
    #[error("MAC address {input:?} contains non-hex characters")]
    NotHex {
        /// Rejected input.
        input: String,
    },
    /// The integer does not fit in 48 bits.
    #[error("value {value:#x} exceeds the 48-bit MAC range")]
    OutOfRange {
        /// Rejected value.
        value: u64,
    },
}
