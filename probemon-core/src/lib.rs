//! Core domain types for the probemon probe-request monitor.
//!
//! Responsibilities:
//! - Decode radiotap-prefixed 802.11 probe requests into [`ProbeEvent`]s.
//! - Provide the bounded [`ProbeQueue`] between the capture and storage threads.
//! - Provide the in-memory accelerators used by the storage worker: the
//!   [`LruCache`] dedup cache and the [`IgnoreFilter`].
//!
//! Boundaries:
//! - No storage or capture-device I/O (lives in `probemon-data` and
//!   `probemon-monitor`).
//!
//! Invariants:
//! - Decoding never reads outside the captured buffer.
//! - No global mutable state.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod cache;
pub mod decode;
mod event;
pub mod ignore;
mod mac;
pub mod queue;
mod ssid;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(all(docsrs, not(test)), doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use cache::LruCache;
pub use decode::{DecodeError, FrameDecoder, RadiotapError};
pub use event::{ProbeEvent, RawFrame, UNKNOWN_VENDOR, timestamp_secs};
pub use ignore::{IgnoreFilter, IgnoreListError};
pub use mac::{MacAddress, MacParseError};
pub use queue::{ProbeQueue, QueueClosed, QueueConfig};
pub use ssid::{B64_PREFIX, MAX_SSID_LEN, SsidName};

#[cfg(test)]
mod tests;
