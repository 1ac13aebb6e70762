//! `log` command: read sightings back from a capture database.

use std::io::Write;

use camino::Utf8PathBuf;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use probemon_core::IgnoreFilter;
use probemon_data::{LogFilter, ProbeLog, Sighting};
use probemon_monitor::echo::format_sighting;
use serde::{Deserialize, Serialize};

use crate::{
    ARG_AFTER, ARG_BEFORE, ARG_DB, ARG_IGNORE, ARG_JSON, ARG_MAC, ARG_PRIVACY, ARG_RSSI,
    ARG_SKIP_ZERO, ARG_SSID, CliError, DEFAULT_DB, capture::require_existing,
};

/// CLI arguments for the `log` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Print stored sightings oldest first, optionally narrowed by \
                 MAC prefix, signal strength and time window. With --ssid, \
                 list the devices that asked for that network instead.",
    about = "Print sightings from a capture database"
)]
#[ortho_config(prefix = "PROBEMON")]
pub(crate) struct LogArgs {
    /// SQLite database written by `capture` (default `probemon.db`).
    #[arg(long = ARG_DB, value_name = "path")]
    #[serde(default)]
    pub(crate) db: Option<Utf8PathBuf>,
    /// Keep MACs starting with this prefix; may be repeated.
    #[arg(short = 'm', long = ARG_MAC, value_name = "prefix")]
    #[serde(default)]
    pub(crate) mac: Option<Vec<String>>,
    /// Keep sightings stronger than this many dBm.
    #[arg(short = 'r', long = ARG_RSSI, value_name = "dbm", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) rssi: Option<i8>,
    /// Keep sightings after this time (RFC 3339 or local `YYYY-MM-DD[ HH:MM:SS]`).
    #[arg(short = 'a', long = ARG_AFTER, value_name = "time")]
    #[serde(default)]
    pub(crate) after: Option<String>,
    /// Keep sightings before this time.
    #[arg(short = 'b', long = ARG_BEFORE, value_name = "time")]
    #[serde(default)]
    pub(crate) before: Option<String>,
    /// Hide sightings without a signal reading.
    #[arg(short = 'z', long = ARG_SKIP_ZERO)]
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub(crate) skip_zero: bool,
    /// Print JSON lines instead of aligned columns.
    #[arg(long = ARG_JSON)]
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub(crate) json: bool,
    /// List the MACs that probed for this SSID.
    #[arg(short = 's', long = ARG_SSID, value_name = "name")]
    #[serde(default)]
    pub(crate) ssid: Option<String>,
    /// With --ssid, hide locally administered (randomised) MACs.
    #[arg(short = 'p', long = ARG_PRIVACY)]
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub(crate) privacy: bool,
    /// MAC address to leave out; shares the `ignored` key with `capture`.
    #[arg(long = ARG_IGNORE, value_name = "mac")]
    #[serde(default)]
    pub(crate) ignored: Option<Vec<String>>,
}

impl LogArgs {
    pub(crate) fn into_config(self) -> Result<LogConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        LogConfig::try_from(merged)
    }
}

/// What the `log` command prints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LogQuery {
    /// Filtered sightings.
    Sightings,
    /// MACs seen probing for one SSID.
    Ssid { name: String, hide_laa: bool },
}

/// Resolved `log` command configuration.
#[derive(Debug, Clone)]
pub(crate) struct LogConfig {
    pub(crate) db: Utf8PathBuf,
    pub(crate) filter: LogFilter,
    pub(crate) query: LogQuery,
    pub(crate) json: bool,
}

impl TryFrom<LogArgs> for LogConfig {
    type Error = CliError;

    fn try_from(args: LogArgs) -> Result<Self, Self::Error> {
        let ignored = IgnoreFilter::from_entries(args.ignored.unwrap_or_default())?;
        let after = args
            .after
            .as_deref()
            .map(|value| parse_time_bound(ARG_AFTER, value))
            .transpose()?;
        let before = args
            .before
            .as_deref()
            .map(|value| parse_time_bound(ARG_BEFORE, value))
            .transpose()?;
        let filter = LogFilter {
            mac_prefixes: args
                .mac
                .unwrap_or_default()
                .into_iter()
                .map(|prefix| prefix.to_ascii_lowercase())
                .collect(),
            rssi_above: args.rssi,
            after,
            before,
            skip_zero_rssi: args.skip_zero,
            ignored,
        };
        let query = args.ssid.map_or(LogQuery::Sightings, |name| LogQuery::Ssid {
            name,
            hide_laa: args.privacy,
        });
        Ok(Self {
            db: args.db.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DB)),
            filter,
            query,
            json: args.json,
        })
    }
}

/// Accept RFC 3339, or a date with optional time read in the local zone.
pub(crate) fn parse_time_bound(
    field: &'static str,
    value: &str,
) -> Result<DateTime<Utc>, CliError> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d").map(|date| date.and_time(NaiveTime::MIN))
        })
        .ok()
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|at| at.with_timezone(&Utc))
        .ok_or_else(|| CliError::InvalidTimestamp {
            field,
            value: value.to_owned(),
        })
}

pub(crate) fn resolve_log_config(args: LogArgs) -> Result<LogConfig, CliError> {
    let config = args.into_config()?;
    require_existing(&config.db, ARG_DB)?;
    Ok(config)
}

pub(crate) fn run_log(args: LogArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = resolve_log_config(args)?;
    execute_log(&config, writer)
}

/// Print what `config` selects, one line per row.
pub(crate) fn execute_log(config: &LogConfig, writer: &mut dyn Write) -> Result<(), CliError> {
    let log = ProbeLog::open(&config.db)?;
    let lines = match &config.query {
        LogQuery::Sightings => log
            .sightings(&config.filter)?
            .iter()
            .map(|sighting| render_sighting(sighting, config.json))
            .collect::<Result<Vec<_>, _>>()?,
        LogQuery::Ssid { name, hide_laa } => log
            .macs_for_ssid(name, *hide_laa)?
            .into_iter()
            .map(|mac| {
                if config.json {
                    serde_json::to_string(&mac).map_err(CliError::SerialiseSighting)
                } else {
                    Ok(mac.to_string())
                }
            })
            .collect::<Result<Vec<_>, _>>()?,
    };
    for line in lines {
        writeln!(writer, "{line}").map_err(CliError::WriteOutput)?;
    }
    writer.flush().map_err(CliError::WriteOutput)
}

fn render_sighting(sighting: &Sighting, json: bool) -> Result<String, CliError> {
    if json {
        serde_json::to_string(sighting).map_err(CliError::SerialiseSighting)
    } else {
        Ok(format_sighting(sighting, &Local))
    }
}
