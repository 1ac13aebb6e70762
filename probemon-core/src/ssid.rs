//! Storage-safe rendering of raw SSID bytes.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::STANDARD};

/// Longest SSID value kept from an information element.
pub const MAX_SSID_LEN: usize = 32;

/// Prefix marking a base64-encoded SSID.
pub const B64_PREFIX: &str = "b64_";

/// Textual form of an SSID as stored and displayed.
///
/// Printable UTF-8 is kept verbatim. Anything else (invalid UTF-8 or ASCII
/// control characters other than tab, line feed and carriage return) becomes
/// `b64_` followed by the standard base64 encoding of the raw bytes.
///
/// # Examples
///
/// ```
/// use probemon_core::SsidName;
///
/// assert_eq!(SsidName::from_bytes(b"home").as_str(), "home");
/// assert_eq!(SsidName::from_bytes(&[0xff, 0x00]).as_str(), "b64_/wA=");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SsidName(String);

impl SsidName {
    /// Normalise raw SSID bytes.
    #[must_use]
    pub fn from_bytes(raw: &[u8]) -> Self {
        match std::str::from_utf8(raw) {
            Ok(text) if !text.bytes().any(is_rejected_control) => Self(text.to_owned()),
            _ => Self(format!("{B64_PREFIX}{}", STANDARD.encode(raw))),
        }
    }

    /// Stored string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the raw bytes had to be base64 encoded.
    #[must_use]
    pub fn is_encoded(&self) -> bool {
        self.0.starts_with(B64_PREFIX)
    }

    /// Recover the raw bytes behind the stored value.
    ///
    /// Returns `None` when an encoded value carries invalid base64.
    #[must_use]
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        match self.0.strip_prefix(B64_PREFIX) {
            Some(encoded) => STANDARD.decode(encoded).ok(),
            None => Some(self.0.as_bytes().to_vec()),
        }
    }

    /// Consume the name, returning the stored string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SsidName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SsidName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

const fn is_rejected_control(byte: u8) -> bool {
    byte.is_ascii_control() && !matches!(byte, b'\t' | b'\n' | b'\r')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(b"".as_slice(), "")]
    #[case(b"home".as_slice(), "home")]
    #[case("caf\u{e9}".as_bytes(), "caf\u{e9}")]
    #[case(b"tab\there".as_slice(), "tab\there")]
    fn printable_text_is_verbatim(#[case] raw: &[u8], #[case] expected: &str) {
        let name = SsidName::from_bytes(raw);
        assert_eq!(name.as_str(), expected);
        assert!(!name.is_encoded());
    }

    #[rstest]
    #[case(&[0xff, 0xfe])]
    #[case(b"nul\0inside")]
    #[case(&[0x7f])]
    #[case(b"bell\x07")]
    fn awkward_bytes_are_base64(#[case] raw: &[u8]) {
        let name = SsidName::from_bytes(raw);
        assert!(name.is_encoded(), "{name} should be encoded");
        assert_eq!(name.to_bytes().as_deref(), Some(raw));
    }

    #[rstest]
    fn rejects_corrupt_encoded_value() {
        let name = SsidName(format!("{B64_PREFIX}!!"));
        assert_eq!(name.to_bytes(), None);
    }
}
