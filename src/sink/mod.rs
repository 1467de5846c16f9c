//! Command sinks.
//!
//! ```text
//!   Dispatcher::publish(Arc<Command>)
//!        │
//!        ├──► ImmediateSink ─► writer (caller's thread)
//!        │
//!        └──► QueuedSink ─► [unbounded queue] ─┬─► worker 1 ─► writer
//!                                               └─► worker N ─► writer
//! ```
//!
//! `submit` never waits on a writer. A queued sink keeps FIFO order in its
//! queue; with more than one worker the order in which writes complete is
//! unspecified.

mod immediate;
mod queued;

pub use immediate::ImmediateSink;
pub use queued::{QueuedSink, QueuedSinkConfig, SinkState};

use crate::command::SharedCommand;
use crate::counters::WorkerCounters;
use crate::error::SinkError;

/// A consumer of completed commands.
pub trait Sink: Send + Sync {
    /// Name used in logs and reports.
    fn name(&self) -> &str;

    /// Hands a command to the sink.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Stopped`] once the sink has been stopped, or the
    /// writer's error for sinks that write synchronously.
    fn submit(&self, command: SharedCommand) -> Result<(), SinkError>;

    /// Requests shutdown and waits until all accepted commands are written.
    fn stop(&self);

    /// Per-worker counters. Complete only after [`stop`](Self::stop).
    fn reports(&self) -> Vec<WorkerCounters>;
}
