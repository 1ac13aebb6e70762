//! Live capture through libpcap.

use chrono::{DateTime, TimeZone, Utc};
use log::info;
use pcap::{Active, Capture, Direction, Linktype};
use probemon_core::RawFrame;

use crate::capture::{CaptureError, FrameSource, NextFrame};

/// Bytes kept per packet. Long probe requests lose trailing IEs but keep
/// the SSID, which precedes them.
pub const SNAPLEN: i32 = 512;
/// Read timeout so the capture loop can notice shutdown.
pub const READ_TIMEOUT_MS: i32 = 1_000;

const PROBE_REQUEST_FILTER: &str = "type mgt subtype probe-req";

/// Probe requests read from a monitor-mode interface.
pub struct PcapSource {
    capture: Capture<Active>,
}

impl PcapSource {
    /// Open `interface`, require radiotap link-layer headers and install the
    /// probe-request filter. The radio must already be in monitor mode on
    /// the wanted channel.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Setup`] when libpcap rejects a step and
    /// [`CaptureError::NoRadiotap`] when the interface cannot deliver
    /// radiotap headers.
    pub fn open(interface: &str) -> Result<Self, CaptureError> {
        let setup = |step: &'static str| {
            move |source| CaptureError::Setup {
                interface: interface.to_owned(),
                step,
                source,
            }
        };

        let mut capture = Capture::from_device(interface)
            .map_err(setup("create capture handle"))?
            .snaplen(SNAPLEN)
            .promisc(true)
            .timeout(READ_TIMEOUT_MS)
            .open()
            .map_err(setup("activate capture"))?;
        capture
            .direction(Direction::In)
            .map_err(setup("restrict capture direction"))?;

        let radiotap = capture
            .list_datalinks()
            .map_err(setup("list link types"))?
            .contains(&Linktype::IEEE802_11_RADIOTAP);
        if !radiotap {
            return Err(CaptureError::NoRadiotap {
                interface: interface.to_owned(),
            });
        }
        capture
            .set_datalink(Linktype::IEEE802_11_RADIOTAP)
            .map_err(setup("select radiotap link type"))?;
        capture
            .filter(PROBE_REQUEST_FILTER, true)
            .map_err(setup("install probe-request filter"))?;

        info!("capturing probe requests on {interface}");
        Ok(Self { capture })
    }
}

impl FrameSource for PcapSource {
    fn next_frame(&mut self) -> Result<NextFrame, CaptureError> {
        match self.capture.next_packet() {
            Ok(packet) => {
                let ts = packet.header.ts;
                let captured_at = receipt_time(ts.tv_sec.into(), ts.tv_usec.into());
                Ok(NextFrame::Frame(RawFrame::new(
                    packet.data.to_vec(),
                    captured_at,
                )))
            }
            Err(pcap::Error::TimeoutExpired) => Ok(NextFrame::Timeout),
            Err(pcap::Error::NoMorePackets) => Ok(NextFrame::Closed),
            Err(err) => Err(CaptureError::Read(err)),
        }
    }
}

/// Convert a packet header timestamp, falling back to now when it is out of
/// range.
fn receipt_time(secs: i64, micros: i64) -> DateTime<Utc> {
    let nanos = u32::try_from(micros)
        .ok()
        .and_then(|micros| micros.checked_mul(1_000))
        .unwrap_or(0);
    Utc.timestamp_opt(secs, nanos)
        .single()
        .unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use probemon_core::{FrameDecoder, test_support::ProbeFrameBuilder};
    use rstest::rstest;

    #[rstest]
    fn snaplen_cut_keeps_the_ssid_of_a_long_probe() {
        let mut vendor = vec![221_u8, 250];
        vendor.extend_from_slice(&[0x5a; 250]);
        let mut frame = ProbeFrameBuilder::new([0x00, 0x1b, 0xc5, 0x12, 0x34, 0x56])
            .ssid(b"home")
            .raw_elements(&vendor)
            .raw_elements(&vendor)
            .build();
        let snaplen = usize::try_from(SNAPLEN).expect("positive snaplen");
        assert!(frame.bytes.len() > snaplen);
        frame.bytes.truncate(snaplen);
        let event = FrameDecoder.decode(&frame).expect("ssid survives the cut");
        assert_eq!(event.ssid, b"home");
    }

    #[rstest]
    fn converts_header_timestamps() {
        let at = receipt_time(1_700_000_000, 250_000);
        assert_eq!(at.timestamp(), 1_700_000_000);
        assert_eq!(at.timestamp_subsec_micros(), 250_000);
    }

    #[rstest]
    fn negative_microseconds_are_ignored() {
        assert_eq!(receipt_time(10, -1).timestamp_subsec_micros(), 0);
    }
}
