//! Fan-out of completed commands to sinks.
//!
//! The [`Dispatcher`] is the line observer that owns the
//! [`CommandAssembler`]. Every completed command is wrapped in an `Arc` once
//! and the same allocation is handed to every registered sink.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::assembler::CommandAssembler;
use crate::command::{Command, SharedCommand};
use crate::config::BulkSize;
use crate::counters::MainCounters;
use crate::error::SinkError;
use crate::registry::LineObserver;
use crate::sink::Sink;

/// Assembles commands from lines and publishes them to sinks.
pub struct Dispatcher {
    assembler: Mutex<CommandAssembler>,
    sinks: RwLock<Vec<Arc<dyn Sink>>>,
    counters: Mutex<MainCounters>,
}

impl Dispatcher {
    /// Creates a dispatcher with no sinks; counters are reported as `main`.
    #[must_use]
    pub fn new(bulk_size: BulkSize) -> Self {
        Self {
            assembler: Mutex::new(CommandAssembler::new(bulk_size)),
            sinks: RwLock::new(Vec::new()),
            counters: Mutex::new(MainCounters::new("main")),
        }
    }

    /// Adds a sink; it receives every command completed from now on.
    pub fn add_sink(&self, sink: Arc<dyn Sink>) {
        self.sinks.write().unwrap_or_else(PoisonError::into_inner).push(sink);
    }

    /// Registered sinks, in registration order.
    #[must_use]
    pub fn sinks(&self) -> Vec<Arc<dyn Sink>> {
        self.sinks.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Snapshot of the ingestion counters.
    #[must_use]
    pub fn counters(&self) -> MainCounters {
        lock(&self.counters).clone()
    }

    /// Publishes `command` to every sink. Returns the shared handle.
    ///
    /// A sink that rejects the command is skipped; the others still receive
    /// it. Write failures are logged by the sink that hit them.
    pub fn publish(&self, command: Command) -> SharedCommand {
        let command = Arc::new(command);
        lock(&self.counters).count(&command);
        debug!(kind = ?command.kind(), tokens = command.len(), "publishing command");

        for sink in self.sinks.read().unwrap_or_else(PoisonError::into_inner).iter() {
            match sink.submit(Arc::clone(&command)) {
                Ok(()) | Err(SinkError::Write { .. } | SinkError::Console(_)) => {}
                Err(err) => warn!(sink = sink.name(), error = %err, "sink rejected command"),
            }
        }
        command
    }

    /// Seals and publishes the command still open in the assembler, if any.
    pub fn flush(&self) -> Option<SharedCommand> {
        // Release the assembler before publishing.
        let completed = lock(&self.assembler).finish();
        completed.map(|command| self.publish(command))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl LineObserver for Dispatcher {
    fn notify(&self, line: &str) {
        lock(&self.counters).count_line();
        // Release the assembler before publishing.
        let completed = lock(&self.assembler).push(line);
        if let Some(command) = completed {
            self.publish(command);
        }
    }

    fn end_of_stream(&self) {
        self.flush();
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("sinks", &self.sinks().len())
            .field("counters", &self.counters())
            .finish_non_exhaustive()
    }
}
