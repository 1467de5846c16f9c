//! Console output.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use crate::command::Command;
use crate::error::SinkError;

use super::{render, CommandWriter};

/// Writes commands to a console-like stream, one line per command.
///
/// Each line is written and flushed under one lock, so lines from different
/// workers never interleave.
pub struct ConsoleWriter {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleWriter {
    /// Writes to the process's standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Writes to an arbitrary stream.
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
        }
    }
}

impl CommandWriter for ConsoleWriter {
    fn write(&self, _worker: &str, command: &Command) -> Result<(), SinkError> {
        let line = render(command);
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        out.write_all(line.as_bytes())
            .and_then(|()| out.flush())
            .map_err(SinkError::Console)
    }
}

impl std::fmt::Debug for ConsoleWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleWriter").finish_non_exhaustive()
    }
}
