//! Bounded hand-off queue between the capture thread and the storage worker.
//!
//! The producer blocks while the queue is full. The consumer takes events in
//! batches: it wakes once the queue is half full, once anything has waited
//! for `max_wait` since the previous batch, or when the queue is closed.

use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use log::debug;
use parking_lot::{Condvar, Mutex};
use thiserror::Error;

use crate::ProbeEvent;

/// Default number of queued events.
pub const DEFAULT_CAPACITY: usize = 128;
/// Default longest time a queued event waits for a batch.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(1);

/// Sizing and wake-up policy for a [`ProbeQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// Maximum number of queued events.
    pub capacity: usize,
    /// Longest time a queued event waits before the consumer wakes.
    pub max_wait: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }
}

/// Returned by [`ProbeQueue::enqueue`] once the queue is closed; carries the
/// rejected event back to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("probe queue is closed")]
pub struct QueueClosed(pub ProbeEvent);

#[derive(Debug)]
struct State {
    items: VecDeque<ProbeEvent>,
    closed: bool,
    last_wake: Instant,
    high_water: usize,
}

/// Single-producer, single-consumer bounded FIFO of [`ProbeEvent`]s.
#[derive(Debug)]
pub struct ProbeQueue {
    config: QueueConfig,
    state: Mutex<State>,
    not_full: Condvar,
    ready: Condvar,
}

impl Default for ProbeQueue {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}

impl ProbeQueue {
    /// Create an open, empty queue. A zero capacity is raised to one.
    #[must_use]
    pub fn new(config: QueueConfig) -> Self {
        let config = QueueConfig {
            capacity: config.capacity.max(1),
            ..config
        };
        Self {
            config,
            state: Mutex::new(State {
                items: VecDeque::with_capacity(config.capacity),
                closed: false,
                last_wake: Instant::now(),
                high_water: 0,
            }),
            not_full: Condvar::new(),
            ready: Condvar::new(),
        }
    }

    /// Queue sizing in effect.
    #[must_use]
    pub const fn config(&self) -> QueueConfig {
        self.config
    }

    fn batch_threshold(&self) -> usize {
        (self.config.capacity / 2).max(1)
    }

    /// Append `event`, blocking while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`QueueClosed`] carrying the event once [`ProbeQueue::close`]
    /// has been called.
    pub fn enqueue(&self, event: ProbeEvent) -> Result<(), QueueClosed> {
        let mut state = self.state.lock();
        while !state.closed && state.items.len() >= self.config.capacity {
            self.not_full.wait(&mut state);
        }
        if state.closed {
            return Err(QueueClosed(event));
        }
        state.items.push_back(event);
        state.high_water = state.high_water.max(state.items.len());
        if state.items.len() >= self.batch_threshold() {
            self.ready.notify_one();
        }
        Ok(())
    }

    /// Wait for the next batch of events, oldest first.
    ///
    /// Returns `None` once the queue is closed and fully drained.
    pub fn next_batch(&self) -> Option<Vec<ProbeEvent>> {
        let mut state = self.state.lock();
        loop {
            if state.closed || state.items.len() >= self.batch_threshold() {
                break;
            }
            let deadline = state.last_wake + self.config.max_wait;
            let now = Instant::now();
            if !state.items.is_empty() && now >= deadline {
                break;
            }
            let timeout = if state.items.is_empty() {
                self.config.max_wait
            } else {
                deadline.saturating_duration_since(now)
            };
            self.ready.wait_for(&mut state, timeout);
        }

        if state.items.is_empty() {
            return None;
        }
        let batch: Vec<ProbeEvent> = state.items.drain(..).collect();
        state.last_wake = Instant::now();
        debug!("dequeued batch of {} probe events", batch.len());
        self.not_full.notify_all();
        Some(batch)
    }

    /// Close the queue: producers fail, the consumer drains what remains.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.not_full.notify_all();
        self.ready.notify_all();
    }

    /// Whether [`ProbeQueue::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of queued events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Whether no events are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Largest depth observed since creation.
    #[must_use]
    pub fn high_water_mark(&self) -> usize {
        self.state.lock().high_water
    }
}
