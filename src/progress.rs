//! Extraction progress monitoring.
//!
//! Extraction runs on the caller's thread and advances a shared
//! [`ProgressMonitor`]. A second thread, started before the first byte is
//! decoded, polls the monitor at a fixed interval and publishes
//! [`ProgressEvent`]s to a [`ProgressSink`]:
//!
//! ```text
//! Start -> Handling { percent }* -> Completed
//!                                -> Error { message }
//! ```
//!
//! - `Start` is emitted once, before any bytes are processed.
//! - `Handling` is emitted every poll interval; percentages never decrease.
//! - `Completed` is emitted once, right after `Handling { percent: 100 }`.
//! - `Error` is emitted if reporting is interrupted or the extraction fails.
//!
//! Nothing follows a `Completed` or `Error` event. The extraction call joins
//! the reporting thread before returning, so every event has been delivered
//! by the time it returns.
//!
//! # Example
//!
//! ```rust,no_run
//! use zipvault::progress::{self, ProgressEvent};
//! use zipvault::ExtractOptions;
//!
//! let (tx, rx) = progress::channel();
//! let options = ExtractOptions::new().progress(tx);
//! let result = zipvault::extract("backup.zip", "restored", &options);
//!
//! for event in rx.try_iter() {
//!     match event {
//!         ProgressEvent::Handling { percent } => println!("{percent}%"),
//!         ProgressEvent::Error { message } => eprintln!("failed: {message}"),
//!         _ => {}
//!     }
//! }
//! # result.map(|_| ())?;
//! # Ok::<(), zipvault::Error>(())
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::{Error, Result};

/// Default interval between `Handling` events.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Message carried by the `Error` event when reporting is interrupted.
pub const INTERRUPTED_MESSAGE: &str = "progress reporting interrupted";

/// A notification emitted by the reporting thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Extraction is starting.
    Start,
    /// Periodic update with the overall completion percentage (0-100).
    Handling {
        /// Percent of all uncompressed bytes written so far.
        percent: u8,
    },
    /// Extraction finished successfully.
    Completed,
    /// Extraction or reporting failed.
    Error {
        /// Human-readable description.
        message: String,
    },
}

impl ProgressEvent {
    /// Returns true for `Completed` and `Error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error { .. })
    }
}

/// Immutable view of a monitor at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Percent complete (0-100).
    pub percent: u8,
    /// Failure message, once the extraction has failed.
    pub error: Option<String>,
}

/// Receiver of progress events.
///
/// Implemented for closures and for `std::sync::mpsc::Sender`.
pub trait ProgressSink: Send + Sync {
    /// Handles one event. Called from the reporting thread.
    fn on_event(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn on_event(&self, event: ProgressEvent) {
        self(event)
    }
}

impl ProgressSink for Sender<ProgressEvent> {
    fn on_event(&self, event: ProgressEvent) {
        // A dropped receiver just means nobody is listening any more
        let _ = self.send(event);
    }
}

/// A sink that discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_event(&self, _event: ProgressEvent) {}
}

/// Creates a channel whose sender can be used as a [`ProgressSink`].
pub fn channel() -> (Sender<ProgressEvent>, Receiver<ProgressEvent>) {
    mpsc::channel()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Signal {
    Running,
    Finished,
    Failed(String),
    Interrupted,
}

#[derive(Debug)]
struct MonitorState {
    consumed: AtomicU64,
    total: AtomicU64,
    signal: Mutex<Signal>,
    wake: Condvar,
}

/// Shared counter of extracted bytes.
///
/// The extraction thread is the only writer of the counter; the reporting
/// thread only reads it. Cloning the handle shares the same state, so a
/// caller can keep a clone to read [`percent`](Self::percent) or to
/// [`interrupt_reporting`](Self::interrupt_reporting) from another thread.
///
/// The percentage is capped at 99 until the extraction marks the monitor
/// finished, so 100 is only ever observed once every entry is on disk.
#[derive(Debug, Clone)]
pub struct ProgressMonitor {
    inner: Arc<MonitorState>,
}

impl Default for ProgressMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_or_recover(mutex: &Mutex<Signal>) -> MutexGuard<'_, Signal> {
    mutex.lock().unwrap_or_else(|poisoned| {
        log::warn!("Progress monitor mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

impl ProgressMonitor {
    /// Creates an idle monitor.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MonitorState {
                consumed: AtomicU64::new(0),
                total: AtomicU64::new(0),
                signal: Mutex::new(Signal::Running),
                wake: Condvar::new(),
            }),
        }
    }

    /// Resets the monitor for a new extraction of `total` bytes.
    ///
    /// A pending interrupt is kept.
    pub(crate) fn begin(&self, total: u64) {
        self.inner.consumed.store(0, Ordering::Relaxed);
        self.inner.total.store(total, Ordering::Relaxed);
        let mut signal = lock_or_recover(&self.inner.signal);
        if *signal != Signal::Interrupted {
            *signal = Signal::Running;
        }
    }

    /// Records `n` more bytes written.
    pub(crate) fn add_consumed(&self, n: u64) {
        self.inner.consumed.fetch_add(n, Ordering::Relaxed);
    }

    fn settle(&self, signal: Signal) {
        let mut guard = lock_or_recover(&self.inner.signal);
        if *guard == Signal::Running {
            *guard = signal;
            self.inner.wake.notify_all();
        }
    }

    /// Marks the extraction as complete.
    pub(crate) fn finish(&self) {
        self.settle(Signal::Finished);
    }

    /// Marks the extraction as failed.
    pub(crate) fn fail(&self, message: impl Into<String>) {
        self.settle(Signal::Failed(message.into()));
    }

    /// Stops the reporting thread with an `Error` event.
    ///
    /// The extraction itself keeps running to completion or failure. Calling
    /// this before the extraction starts also counts: its reporter then
    /// publishes `Start` followed directly by the `Error` event.
    pub fn interrupt_reporting(&self) {
        self.settle(Signal::Interrupted);
    }

    /// Bytes written so far.
    pub fn consumed(&self) -> u64 {
        self.inner.consumed.load(Ordering::Relaxed)
    }

    /// Total uncompressed bytes of the extraction.
    pub fn total(&self) -> u64 {
        self.inner.total.load(Ordering::Relaxed)
    }

    /// Returns true once the extraction has completed successfully.
    pub fn is_finished(&self) -> bool {
        *lock_or_recover(&self.inner.signal) == Signal::Finished
    }

    /// Percent complete across all entries.
    pub fn percent(&self) -> u8 {
        if self.is_finished() {
            return 100;
        }
        let total = self.total();
        if total == 0 {
            return 0;
        }
        let percent = (u128::from(self.consumed()) * 100 / u128::from(total)).min(99);
        percent as u8
    }

    /// Captures the current state.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let error = match &*lock_or_recover(&self.inner.signal) {
            Signal::Failed(message) => Some(message.clone()),
            Signal::Interrupted => Some(INTERRUPTED_MESSAGE.to_string()),
            _ => None,
        };
        ProgressSnapshot {
            percent: self.percent(),
            error,
        }
    }

    /// Blocks until the state changes or `timeout` elapses.
    fn wait(&self, timeout: Duration) -> Signal {
        let guard = lock_or_recover(&self.inner.signal);
        let (guard, _) = self
            .inner
            .wake
            .wait_timeout_while(guard, timeout, |s| *s == Signal::Running)
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.clone()
    }
}

/// Background thread publishing monitor snapshots to a sink.
#[derive(Debug)]
pub(crate) struct ReportingTask {
    handle: JoinHandle<()>,
}

impl ReportingTask {
    /// Publishes `Start` on the calling thread, then starts the reporting
    /// thread.
    pub(crate) fn spawn(
        monitor: ProgressMonitor,
        sink: Arc<dyn ProgressSink>,
        poll_interval: Duration,
    ) -> Result<Self> {
        sink.on_event(ProgressEvent::Start);
        let handle = std::thread::Builder::new()
            .name("zipvault-progress".into())
            .spawn(move || report(&monitor, sink.as_ref(), poll_interval))
            .map_err(Error::Io)?;
        Ok(Self { handle })
    }

    /// Waits for the reporting thread to publish its terminal event.
    pub(crate) fn join(self) {
        if self.handle.join().is_err() {
            log::warn!("Progress reporting thread panicked");
        }
    }
}

fn report(monitor: &ProgressMonitor, sink: &dyn ProgressSink, poll_interval: Duration) {
    let mut last = 0u8;

    loop {
        match monitor.wait(poll_interval) {
            Signal::Interrupted => {
                log::warn!("Progress reporting interrupted before completion");
                sink.on_event(ProgressEvent::Error {
                    message: INTERRUPTED_MESSAGE.to_string(),
                });
                return;
            }
            Signal::Failed(message) => {
                sink.on_event(ProgressEvent::Error { message });
                return;
            }
            Signal::Running | Signal::Finished => {
                let percent = monitor.percent().max(last);
                last = percent;
                sink.on_event(ProgressEvent::Handling { percent });
                if percent >= 100 {
                    sink.on_event(ProgressEvent::Completed);
                    return;
                }
            }
        }
    }
}
