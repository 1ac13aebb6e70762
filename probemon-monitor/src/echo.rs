//! Human-readable probe lines for the terminal.
//!
//! Each line is tab separated:
//! `timestamp  mac[ (LAA)]  vendor  ssid  rssi`, with the vendor and SSID
//! columns cut or padded to fixed widths so the output lines up.

use std::{
    fmt::Display,
    io::{self, Write},
};

use chrono::{DateTime, Local, TimeZone, Utc};
use probemon_core::{MacAddress, ProbeEvent, SsidName};
use probemon_data::Sighting;

/// Width of the vendor column.
pub const VENDOR_WIDTH: usize = 25;
/// Width of the SSID column.
pub const SSID_WIDTH: usize = 15;

const ELLIPSIS: &str = "...";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Pad `text` to `width` characters, or cut it to `width - 3` characters
/// followed by `...` when it does not fit.
///
/// ```
/// use probemon_monitor::echo::fit;
///
/// assert_eq!(fit("home", 6), "home  ");
/// assert_eq!(fit("office", 6), "off...");
/// ```
#[must_use]
pub fn fit(text: &str, width: usize) -> String {
    if text.chars().count() >= width {
        let kept: String = text
            .chars()
            .take(width.saturating_sub(ELLIPSIS.len()))
            .collect();
        format!("{kept}{ELLIPSIS}")
    } else {
        format!("{text:<width$}")
    }
}

/// Render one line from its parts.
#[must_use]
pub fn format_line<Tz>(
    captured_at: &DateTime<Utc>,
    mac: MacAddress,
    vendor: &str,
    ssid: &str,
    rssi: i8,
    tz: &Tz,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let timestamp = captured_at.with_timezone(tz).format(TIMESTAMP_FORMAT);
    let laa = if mac.is_locally_administered() {
        " (LAA)"
    } else {
        ""
    };
    format!(
        "{timestamp}\t{mac}{laa}\t{}\t{}\t{rssi:<3}",
        fit(vendor, VENDOR_WIDTH),
        fit(ssid, SSID_WIDTH),
    )
}

/// Render a decoded event, showing its SSID the way it is stored.
#[must_use]
pub fn format_event<Tz>(event: &ProbeEvent, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let ssid = SsidName::from_bytes(&event.ssid);
    format_line(
        &event.captured_at,
        event.mac,
        event.vendor_or_unknown(),
        ssid.as_str(),
        event.rssi,
        tz,
    )
}

/// Render a sighting read back from the database.
#[must_use]
pub fn format_sighting<Tz>(sighting: &Sighting, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format_line(
        &sighting.timestamp,
        sighting.mac,
        &sighting.vendor,
        &sighting.ssid,
        sighting.rssi,
        tz,
    )
}

/// Destination for echoed events.
pub trait EchoSink {
    /// Write one event.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the underlying writer.
    fn echo(&mut self, event: &ProbeEvent) -> io::Result<()>;

    /// Flush buffered output, called once per drained batch.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the underlying writer.
    fn flush(&mut self) -> io::Result<()>;
}

/// [`EchoSink`] writing formatted lines to any [`Write`].
#[derive(Debug)]
pub struct EchoWriter<W, Tz> {
    out: W,
    tz: Tz,
}

impl<W, Tz> EchoWriter<W, Tz> {
    /// Write to `out`, rendering timestamps in `tz`.
    #[must_use]
    pub const fn new(out: W, tz: Tz) -> Self {
        Self { out, tz }
    }

    /// Recover the writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl EchoWriter<io::Stdout, Local> {
    /// Standard output in the local time zone.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout(), Local)
    }
}

impl<W, Tz> EchoSink for EchoWriter<W, Tz>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    fn echo(&mut self, event: &ProbeEvent) -> io::Result<()> {
        writeln!(self.out, "{}", format_event(event, &self.tz))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
