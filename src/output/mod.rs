//! Output side effects performed by sinks.
//!
//! A [`CommandWriter`] turns one command into bytes somewhere. Sinks decide
//! which thread runs it; writers only need to be safe to call from several
//! workers at once.

mod console;
mod file;

pub use console::ConsoleWriter;
pub use file::FileWriter;

use crate::command::Command;
use crate::error::SinkError;

/// Performs the output for one command.
pub trait CommandWriter: Send + Sync {
    /// Writes `command` on behalf of the worker named `worker`.
    ///
    /// # Errors
    ///
    /// Returns a [`SinkError`] if the destination cannot be written. The
    /// calling sink logs it and moves on to the next command.
    fn write(&self, worker: &str, command: &Command) -> Result<(), SinkError>;
}

/// Renders a command as one output line: tokens joined by a space, then `\n`.
#[must_use]
pub fn render(command: &Command) -> String {
    format!("{command}\n")
}
