//! Background worker pool draining one shared queue.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, error, info, warn};

use crate::command::SharedCommand;
use crate::counters::WorkerCounters;
use crate::error::SinkError;
use crate::output::CommandWriter;

use super::Sink;

/// Queued sink configuration.
#[derive(Debug, Clone)]
pub struct QueuedSinkConfig {
    /// Sink name; also the worker name prefix.
    pub name: String,
    /// Number of workers. Zero is treated as one.
    pub workers: usize,
    /// Delay applied before each write, simulating slow output.
    pub latency: Duration,
}

impl Default for QueuedSinkConfig {
    fn default() -> Self {
        Self {
            name: "queued".to_string(),
            workers: 1,
            latency: Duration::ZERO,
        }
    }
}

/// Lifecycle of a [`QueuedSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    /// Accepting commands.
    Running,
    /// Queue closed; workers are draining what is left.
    Stopping,
    /// Every worker has exited.
    Drained,
}

/// A sink whose workers write commands in the background.
///
/// Stopping closes the queue; workers keep taking commands until it is empty
/// and only then exit, so nothing accepted by `submit` is lost.
pub struct QueuedSink {
    name: String,
    tx: Mutex<Option<Sender<SharedCommand>>>,
    workers: Mutex<Vec<JoinHandle<WorkerCounters>>>,
    state: Mutex<SinkState>,
    reports: Mutex<Vec<WorkerCounters>>,
}

impl QueuedSink {
    /// Spawns the workers and returns the running sink.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Spawn`] if a worker thread cannot be created. Any
    /// workers already started are shut down first.
    pub fn start(config: QueuedSinkConfig, writer: Arc<dyn CommandWriter>) -> Result<Self, SinkError> {
        let workers = config.workers.max(1);
        let (tx, rx) = unbounded::<SharedCommand>();

        let mut handles = Vec::with_capacity(workers);
        for idx in 0..workers {
            let worker = if workers == 1 {
                config.name.clone()
            } else {
                format!("{}{}", config.name, idx + 1)
            };
            let rx = rx.clone();
            let writer = Arc::clone(&writer);
            let latency = config.latency;

            let spawned = thread::Builder::new()
                .name(format!("bulkmt-{worker}"))
                .spawn({
                    let worker = worker.clone();
                    move || worker_loop(&worker, &rx, writer.as_ref(), latency)
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    drop(tx);
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(SinkError::Spawn { worker, source });
                }
            }
        }

        let latency_ms = u64::try_from(config.latency.as_millis()).unwrap_or(u64::MAX);
        info!(sink = %config.name, workers, latency_ms, "sink started");

        Ok(Self {
            name: config.name,
            tx: Mutex::new(Some(tx)),
            workers: Mutex::new(handles),
            state: Mutex::new(SinkState::Running),
            reports: Mutex::new(Vec::new()),
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SinkState {
        *lock(&self.state)
    }

    /// Commands accepted but not yet taken by a worker.
    #[must_use]
    pub fn pending(&self) -> usize {
        lock(&self.tx).as_ref().map_or(0, Sender::len)
    }

    /// Sum of every worker's counters, named after the sink.
    #[must_use]
    pub fn totals(&self) -> WorkerCounters {
        let mut total = WorkerCounters::new(self.name.clone());
        for report in lock(&self.reports).iter() {
            total.absorb(report);
        }
        total
    }
}

fn worker_loop(worker: &str, rx: &Receiver<SharedCommand>, writer: &dyn CommandWriter, latency: Duration) -> WorkerCounters {
    let mut counters = WorkerCounters::new(worker);

    // `recv` keeps yielding queued commands after the sender is dropped and
    // fails only once the queue is empty.
    while let Ok(command) = rx.recv() {
        if !latency.is_zero() {
            thread::sleep(latency);
        }

        match writer.write(worker, &command) {
            Ok(()) => {
                counters.count(&command);
                debug!(worker, tokens = command.len(), "command written");
            }
            Err(err) => {
                counters.record_failure();
                warn!(worker, error = %err, "dropping command output");
            }
        }
    }

    debug!(worker, blocks = counters.blocks(), "worker drained");
    counters
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Sink for QueuedSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn submit(&self, command: SharedCommand) -> Result<(), SinkError> {
        let tx = lock(&self.tx);
        let stopped = || SinkError::Stopped {
            sink: self.name.clone(),
        };
        // Unbounded: `send` only fails when every receiver is gone.
        tx.as_ref().ok_or_else(stopped)?.send(command).map_err(|_| stopped())
    }

    fn stop(&self) {
        // Dropping the only sender closes the queue for the workers. Stopping
        // is only ever set while the sender lock is held.
        {
            let mut tx = lock(&self.tx);
            if tx.take().is_some() {
                *lock(&self.state) = SinkState::Stopping;
            }
        }

        // Held across the joins so concurrent callers return only after the drain.
        let mut workers = lock(&self.workers);
        if workers.is_empty() {
            return;
        }

        let mut reports = Vec::with_capacity(workers.len());
        for handle in workers.drain(..) {
            match handle.join() {
                Ok(counters) => reports.push(counters),
                Err(_) => error!(sink = %self.name, "worker panicked"),
            }
        }

        lock(&self.reports).extend(reports);
        *lock(&self.state) = SinkState::Drained;
        info!(sink = %self.name, "sink drained");
    }

    fn reports(&self) -> Vec<WorkerCounters> {
        lock(&self.reports).clone()
    }
}

impl Drop for QueuedSink {
    fn drop(&mut self) {
        // Deterministic shutdown: never leave detached workers behind.
        self.stop();
    }
}

impl std::fmt::Debug for QueuedSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedSink")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
