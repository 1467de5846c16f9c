//! Synchronous sink.
//!
//! No queue and no thread: [`ImmediateSink::submit`] returns once the writer
//! has run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use crate::command::SharedCommand;
use crate::counters::WorkerCounters;
use crate::error::SinkError;
use crate::output::CommandWriter;

use super::Sink;

/// Writes each command synchronously in the submitting thread.
pub struct ImmediateSink {
    name: String,
    writer: Arc<dyn CommandWriter>,
    counters: Mutex<WorkerCounters>,
    stopped: AtomicBool,
}

impl ImmediateSink {
    /// Creates a sink named `name` that writes through `writer`.
    pub fn new(name: impl Into<String>, writer: Arc<dyn CommandWriter>) -> Self {
        let name = name.into();
        Self {
            counters: Mutex::new(WorkerCounters::new(name.clone())),
            name,
            writer,
            stopped: AtomicBool::new(false),
        }
    }
}

impl Sink for ImmediateSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn submit(&self, command: SharedCommand) -> Result<(), SinkError> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(SinkError::Stopped {
                sink: self.name.clone(),
            });
        }

        let result = self.writer.write(&self.name, &command);
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        match &result {
            Ok(()) => counters.count(&command),
            Err(err) => {
                warn!(sink = %self.name, error = %err, "dropping command output");
                counters.record_failure();
            }
        }
        result
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    fn reports(&self) -> Vec<WorkerCounters> {
        vec![self.counters.lock().unwrap_or_else(PoisonError::into_inner).clone()]
    }
}

impl std::fmt::Debug for ImmediateSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImmediateSink").field("name", &self.name).finish_non_exhaustive()
    }
}
