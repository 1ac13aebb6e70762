//! The storage worker: vendor resolution, ignore filtering, persistence and
//! echo for every dequeued event.

use log::{debug, info, warn};
use probemon_core::{IgnoreFilter, MacAddress, ProbeEvent, ProbeQueue};
use probemon_data::{
    PersistenceBatcher, StoreError, SystemClock, VendorResolver, store::Clock,
};
use thiserror::Error;

use crate::echo::EchoSink;

/// What happened to one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Written to the open transaction.
    Persisted,
    /// Dropped because its address is ignored.
    Ignored,
}

/// Counters for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Events dequeued.
    pub received: u64,
    /// Events dropped by the ignore filter.
    pub ignored: u64,
    /// Events written to the database.
    pub persisted: u64,
    /// Transactions committed, the final one included.
    pub commits: u64,
}

/// Fatal storage failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An event could not be written; earlier events were committed.
    #[error("failed to persist probe from {mac}")]
    Persist {
        /// Transmitter of the rejected event.
        mac: MacAddress,
        /// Underlying store error.
        #[source]
        source: StoreError,
    },
    /// The open transaction could not be committed.
    #[error("failed to commit probe transaction")]
    Commit(#[source] StoreError),
}

/// Context owned by the storage worker.
///
/// # Examples
///
/// ```
/// use probemon_core::{IgnoreFilter, ProbeEvent};
/// use probemon_data::{BatcherConfig, PersistenceBatcher, SystemClock, VendorResolver};
/// use probemon_monitor::{Disposition, EventPipeline};
/// use rusqlite::Connection;
///
/// let vendors = VendorResolver::from_table_text("00:1B:C5\tIeee\tIEEE Registration Authority\n", "inline".into())
///     .expect("vendor table");
/// let batcher = PersistenceBatcher::new(
///     Connection::open_in_memory().expect("in-memory database"),
///     BatcherConfig::default(),
///     SystemClock,
/// )
/// .expect("prepare database");
/// let mut pipeline = EventPipeline::new(vendors, IgnoreFilter::default(), batcher);
/// let event = ProbeEvent {
///     captured_at: chrono::Utc::now(),
///     mac: "00:1b:c5:12:34:56".parse().expect("valid MAC"),
///     ssid: b"home".to_vec(),
///     rssi: -47,
///     frequency: 2437,
///     vendor: None,
/// };
/// assert_eq!(pipeline.process(event).expect("persist"), Disposition::Persisted);
/// assert_eq!(pipeline.finish().expect("commit").persisted, 1);
/// ```
pub struct EventPipeline<C = SystemClock> {
    vendors: VendorResolver,
    ignored: IgnoreFilter,
    batcher: PersistenceBatcher<C>,
    echo: Option<Box<dyn EchoSink + Send>>,
    report: PipelineReport,
}

impl<C: Clock> EventPipeline<C> {
    /// Assemble a pipeline without echo.
    #[must_use]
    pub fn new(
        vendors: VendorResolver,
        ignored: IgnoreFilter,
        batcher: PersistenceBatcher<C>,
    ) -> Self {
        Self {
            vendors,
            ignored,
            batcher,
            echo: None,
            report: PipelineReport::default(),
        }
    }

    /// Echo every persisted event to `sink`.
    #[must_use]
    pub fn with_echo(mut self, sink: impl EchoSink + Send + 'static) -> Self {
        self.echo = Some(Box::new(sink));
        self
    }

    /// Handle one event.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Persist`] when the store rejects the event.
    /// The event has then been rolled back and the caller should stop.
    pub fn process(&mut self, mut event: ProbeEvent) -> Result<Disposition, PipelineError> {
        self.report.received += 1;
        event.vendor = Some(self.vendors.name(event.mac).to_owned());

        if self.ignored.contains(event.mac) {
            debug!("ignoring probe from {}", event.mac);
            self.report.ignored += 1;
            return Ok(Disposition::Ignored);
        }

        self.batcher
            .record(&event)
            .map_err(|source| PipelineError::Persist {
                mac: event.mac,
                source,
            })?;
        self.report.persisted += 1;

        if let Some(Err(err)) = self.echo.as_mut().map(|sink| sink.echo(&event)) {
            warn!("failed to echo probe: {err}");
        }
        Ok(Disposition::Persisted)
    }

    /// Handle a drained batch in order, then commit if the interval elapsed.
    ///
    /// # Errors
    ///
    /// Stops at the first failing event; see [`EventPipeline::process`].
    pub fn process_batch(&mut self, batch: Vec<ProbeEvent>) -> Result<(), PipelineError> {
        for event in batch {
            self.process(event)?;
        }
        if let Some(Err(err)) = self.echo.as_mut().map(|sink| sink.flush()) {
            warn!("failed to flush echo output: {err}");
        }
        self.batcher
            .maybe_commit()
            .map(|_| ())
            .map_err(PipelineError::Commit)
    }

    /// Drain `queue` until it is closed and empty, then commit.
    ///
    /// On a storage failure the queue is closed so the producer stops, the
    /// events persisted so far are committed and the error is returned.
    ///
    /// # Errors
    ///
    /// Returns the first [`PipelineError`] encountered.
    pub fn run(mut self, queue: &ProbeQueue) -> Result<PipelineReport, PipelineError> {
        while let Some(batch) = queue.next_batch() {
            if let Err(err) = self.process_batch(batch) {
                queue.close();
                match self.finish() {
                    Ok(report) => warn!(
                        "stopping after {} persisted probes: {err}",
                        report.persisted
                    ),
                    Err(commit) => warn!("final commit after failure also failed: {commit}"),
                }
                return Err(err);
            }
        }
        self.finish()
    }

    /// Commit outstanding writes and release the store.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Commit`] when the final commit fails.
    pub fn finish(self) -> Result<PipelineReport, PipelineError> {
        let mut report = self.report;
        report.commits = self.batcher.finish().map_err(PipelineError::Commit)?;
        info!(
            "pipeline done: {} received, {} ignored, {} persisted, {} commits",
            report.received, report.ignored, report.persisted, report.commits
        );
        Ok(report)
    }

    /// Counters so far; `commits` is filled in by [`EventPipeline::finish`].
    #[must_use]
    pub const fn report(&self) -> PipelineReport {
        self.report
    }

    /// The batcher, for inspecting the open transaction.
    #[must_use]
    pub const fn batcher(&self) -> &PersistenceBatcher<C> {
        &self.batcher
    }
}
