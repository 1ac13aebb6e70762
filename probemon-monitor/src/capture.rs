//! Frame sources and the capture loop feeding the queue.

use std::{
    collections::VecDeque,
    sync::atomic::{AtomicBool, Ordering},
};

use log::{debug, info};
use probemon_core::{FrameDecoder, ProbeQueue, RawFrame};
use thiserror::Error;

/// Outcome of polling a [`FrameSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextFrame {
    /// A captured buffer with its receipt time.
    Frame(RawFrame),
    /// Nothing arrived within the source's read timeout.
    Timeout,
    /// The source is exhausted.
    Closed,
}

/// Supplier of raw radiotap-prefixed frames.
pub trait FrameSource {
    /// Block until the next frame, a read timeout or the end of input.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError`] when the underlying device fails.
    fn next_frame(&mut self) -> Result<NextFrame, CaptureError>;
}

/// Errors raised by capture sources.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The capture device could not be opened or configured.
    #[cfg(feature = "live-capture")]
    #[error("failed to {step} on interface {interface}")]
    Setup {
        /// Interface name.
        interface: String,
        /// What was being attempted.
        step: &'static str,
        /// Error reported by libpcap.
        #[source]
        source: pcap::Error,
    },
    /// The interface cannot deliver radiotap headers.
    #[cfg(feature = "live-capture")]
    #[error("interface {interface} does not provide radiotap headers; is it in monitor mode?")]
    NoRadiotap {
        /// Interface name.
        interface: String,
    },
    /// Reading a packet failed.
    #[cfg(feature = "live-capture")]
    #[error("failed to read packet")]
    Read(#[source] pcap::Error),
    /// A source reported a failure of its own.
    #[error("capture source failed: {message}")]
    Source {
        /// Description of the failure.
        message: String,
    },
}

/// Frames replayed from memory, oldest first.
///
/// # Examples
///
/// ```
/// use probemon_core::RawFrame;
/// use probemon_monitor::{FrameSource, NextFrame, ReplaySource};
///
/// let frame = RawFrame::new(vec![0; 4], chrono::Utc::now());
/// let mut source = ReplaySource::new([frame.clone()]);
/// assert_eq!(source.next_frame().expect("replay"), NextFrame::Frame(frame));
/// assert_eq!(source.next_frame().expect("replay"), NextFrame::Closed);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    frames: VecDeque<RawFrame>,
}

impl ReplaySource {
    /// Replay `frames` in order.
    #[must_use]
    pub fn new(frames: impl IntoIterator<Item = RawFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    /// Frames not yet delivered.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for ReplaySource {
    fn next_frame(&mut self) -> Result<NextFrame, CaptureError> {
        Ok(self
            .frames
            .pop_front()
            .map_or(NextFrame::Closed, NextFrame::Frame))
    }
}

/// Counters for one capture run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureReport {
    /// Frames delivered by the source.
    pub frames: u64,
    /// Frames decoded and queued.
    pub queued: u64,
    /// Frames that did not decode.
    pub dropped: u64,
}

/// Decode frames from `source` onto `queue` until the source closes,
/// `shutdown` is raised or the queue is closed by the consumer. The queue is
/// checked on every read timeout, so a consumer that stops during quiet air
/// is noticed.
///
/// Undecodable frames are logged at debug level and skipped. The queue is
/// left open; closing it is the caller's decision.
///
/// # Errors
///
/// Returns [`CaptureError`] when the source fails.
pub fn run_capture<S: FrameSource + ?Sized>(
    source: &mut S,
    queue: &ProbeQueue,
    shutdown: &AtomicBool,
) -> Result<CaptureReport, CaptureError> {
    let decoder = FrameDecoder;
    let mut report = CaptureReport::default();
    while !shutdown.load(Ordering::Relaxed) {
        let frame = match source.next_frame()? {
            NextFrame::Frame(frame) => frame,
            NextFrame::Timeout if queue.is_closed() => {
                info!("probe queue closed while idle; stopping capture");
                break;
            }
            NextFrame::Timeout => continue,
            NextFrame::Closed => {
                info!("capture source closed");
                break;
            }
        };
        report.frames += 1;
        match decoder.decode(&frame) {
            Ok(event) => {
                if queue.enqueue(event).is_err() {
                    info!("probe queue closed; stopping capture");
                    break;
                }
                report.queued += 1;
            }
            Err(err) => {
                debug!("dropping frame of {} bytes: {err}", frame.bytes.len());
                report.dropped += 1;
            }
        }
    }
    Ok(report)
}
