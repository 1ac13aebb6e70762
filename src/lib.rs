//! Facade crate for the probemon probe-request monitor.
//!
//! This crate re-exports the domain types, the storage layer and the capture
//! runtime. Live capture through libpcap is available behind the
//! `live-capture` feature.

#![forbid(unsafe_code)]

pub use probemon_core::{
    FrameDecoder, IgnoreFilter, LruCache, MacAddress, ProbeEvent, ProbeQueue, QueueConfig,
    RawFrame, SsidName,
};
pub use probemon_data::{
    BatcherConfig, LogFilter, PersistenceBatcher, ProbeLog, Sighting, StoreError, VendorResolver,
};
pub use probemon_monitor::{
    EchoSink, EchoWriter, EventPipeline, FrameSource, MonitorError, MonitorReport, ReplaySource,
    run_monitor,
};

#[cfg(feature = "live-capture")]
pub use probemon_monitor::PcapSource;

#[cfg(feature = "test-support")]
pub use probemon_core::test_support;
