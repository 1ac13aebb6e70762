//! Exact-match MAC ignore list.

use thiserror::Error;

use crate::{MacAddress, MacParseError};

/// Error raised when an ignore-list entry is not a MAC address.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid ignored MAC address {entry:?}: {source}")]
pub struct IgnoreListError {
    /// Offending entry as configured.
    pub entry: String,
    /// Parse failure.
    #[source]
    pub source: MacParseError,
}

/// Sorted, deduplicated set of 48-bit MAC values suppressed from persistence.
///
/// # Examples
///
/// ```
/// use probemon_core::{IgnoreFilter, MacAddress};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let filter = IgnoreFilter::from_entries(["aa:bb:cc:dd:ee:ff", "001122334455"])?;
/// assert!(filter.contains("00-11-22-33-44-55".parse::<MacAddress>()?));
/// assert!(!filter.contains("00:11:22:33:44:56".parse::<MacAddress>()?));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreFilter {
    macs: Vec<u64>,
}

impl IgnoreFilter {
    /// Parse configured entries (`:`/`-` separated or bare hex).
    ///
    /// # Errors
    ///
    /// Returns [`IgnoreListError`] for the first entry that is not a MAC
    /// address.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, IgnoreListError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let macs = entries
            .into_iter()
            .map(|entry| {
                let entry = entry.as_ref();
                entry
                    .parse::<MacAddress>()
                    .map(|mac| mac.as_u64())
                    .map_err(|source| IgnoreListError {
                        entry: entry.to_owned(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_values(macs))
    }

    /// Build from already parsed addresses.
    #[must_use]
    pub fn from_macs<I>(macs: I) -> Self
    where
        I: IntoIterator<Item = MacAddress>,
    {
        Self::from_values(macs.into_iter().map(|mac| mac.as_u64()).collect())
    }

    fn from_values(mut macs: Vec<u64>) -> Self {
        macs.sort_unstable();
        macs.dedup();
        Self { macs }
    }

    /// Whether `mac` is on the list.
    #[must_use]
    pub fn contains(&self, mac: MacAddress) -> bool {
        self.macs.binary_search(&mac.as_u64()).is_ok()
    }

    /// Number of distinct ignored addresses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.macs.len()
    }

    /// Whether nothing is ignored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.macs.is_empty()
    }

    /// Ignored addresses in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = MacAddress> + '_ {
        self.macs
            .iter()
            .filter_map(|value| MacAddress::from_u64(*value).ok())
    }
}
