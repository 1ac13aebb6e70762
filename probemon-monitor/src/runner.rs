//! Two-thread wiring: capture on the calling thread, storage on a worker.

use std::{io, sync::atomic::AtomicBool, thread};

use log::info;
use probemon_core::{ProbeQueue, QueueConfig};
use probemon_data::store::Clock;
use thiserror::Error;

use crate::{
    capture::{CaptureError, CaptureReport, FrameSource, run_capture},
    pipeline::{EventPipeline, PipelineError, PipelineReport},
};

const WORKER_NAME: &str = "probemon-worker";

/// Counters from both threads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorReport {
    /// Capture side.
    pub capture: CaptureReport,
    /// Storage side.
    pub pipeline: PipelineReport,
    /// Deepest the queue got.
    pub queue_high_water: usize,
}

/// Failures that end a monitoring run.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The storage worker thread could not be started.
    #[error("failed to spawn {WORKER_NAME} thread")]
    Spawn(#[source] io::Error),
    /// The storage worker panicked.
    #[error("{WORKER_NAME} thread panicked")]
    WorkerPanicked,
    /// Storage failed; pending events were committed first.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// The capture source failed; queued events were still persisted.
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// Closes the queue when the worker exits, unwinding included.
struct CloseOnDrop<'a>(&'a ProbeQueue);

impl Drop for CloseOnDrop<'_> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Run capture and storage until `source` closes or `shutdown` is raised.
///
/// The queue is closed once capture stops, so the worker drains what is
/// left, commits and releases the database before this returns. A storage
/// failure or a worker panic closes the queue from the other side and stops
/// capture.
///
/// # Errors
///
/// Returns [`MonitorError`] when either side fails. A storage failure takes
/// precedence over the capture error it may have caused.
pub fn run_monitor<S, C>(
    source: &mut S,
    pipeline: EventPipeline<C>,
    queue_config: QueueConfig,
    shutdown: &AtomicBool,
) -> Result<MonitorReport, MonitorError>
where
    S: FrameSource + ?Sized,
    C: Clock + Send,
{
    let queue = ProbeQueue::new(queue_config);
    thread::scope(|scope| {
        let worker = thread::Builder::new()
            .name(WORKER_NAME.to_owned())
            .spawn_scoped(scope, || {
                let _closer = CloseOnDrop(&queue);
                pipeline.run(&queue)
            })
            .map_err(MonitorError::Spawn)?;

        let captured = run_capture(source, &queue, shutdown);
        queue.close();
        info!("capture stopped; draining {} queued probes", queue.len());

        let stored = worker.join().map_err(|_| MonitorError::WorkerPanicked)?;
        let pipeline = stored?;
        let capture = captured?;
        Ok(MonitorReport {
            capture,
            pipeline,
            queue_high_water: queue.high_water_mark(),
        })
    })
}
