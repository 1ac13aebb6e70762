//! Capture-to-storage runtime for the probemon probe-request monitor.
//!
//! Responsibilities:
//! - Pull frames from a [`FrameSource`], decode them and hand events to the
//!   [`ProbeQueue`](probemon_core::ProbeQueue).
//! - Drain the queue on a worker thread through the [`EventPipeline`]:
//!   vendor resolution, ignore filtering, persistence and echo.
//!
//! Boundaries:
//! - Radio setup (monitor mode, channel) happens outside this crate.
//! - Live capture via libpcap is only built with the `live-capture` feature.
//!
//! Invariants:
//! - The worker exclusively owns the resolver, the filter and the store.
//! - Events are persisted in capture order.
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod capture;
pub mod echo;
#[cfg(feature = "live-capture")]
#[cfg_attr(docsrs, doc(cfg(feature = "live-capture")))]
pub mod pcap_source;
pub mod pipeline;
pub mod runner;

pub use capture::{CaptureError, CaptureReport, FrameSource, NextFrame, ReplaySource, run_capture};
pub use echo::{EchoSink, EchoWriter};
#[cfg(feature = "live-capture")]
pub use pcap_source::PcapSource;
pub use pipeline::{Disposition, EventPipeline, PipelineError, PipelineReport};
pub use runner::{MonitorError, MonitorReport, run_monitor};

#[cfg(test)]
mod tests;
