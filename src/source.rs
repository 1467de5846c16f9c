//! Line-oriented input.

use std::borrow::Cow;
use std::io::BufRead;

use tracing::{debug, warn};

use crate::registry::SubscriptionRegistry;

/// How a read pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPass {
    /// Lines dispatched during the pass (the sentinel is not counted).
    pub lines: usize,
    /// True if the pass ended at end of input rather than at an empty line.
    pub eof: bool,
}

/// Reads lines and pushes them through a [`SubscriptionRegistry`].
///
/// An empty line ends the current pass without being dispatched; the next
/// call to [`read_pass`](Self::read_pass) continues after it.
#[derive(Debug)]
pub struct LineSource<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> LineSource<R> {
    /// Wraps `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }

    /// Dispatches lines until an empty line or end of input, then signals
    /// end of stream to every observer.
    ///
    /// Bytes that are not UTF-8 are replaced with U+FFFD and the line is
    /// dispatched anyway.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error. Observers are not notified of end of
    /// stream in that case; lines read before the error have been dispatched.
    pub fn read_pass(&mut self, registry: &SubscriptionRegistry) -> std::io::Result<ReadPass> {
        let mut lines = 0;
        let eof = loop {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
                break true;
            }

            let raw = self.buf.strip_suffix(b"\n").unwrap_or(&self.buf);
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            if raw.is_empty() {
                break false;
            }

            let line = String::from_utf8_lossy(raw);
            if matches!(line, Cow::Owned(_)) {
                warn!(line = lines + 1, "replaced invalid UTF-8 in input line");
            }
            registry.dispatch(&line);
            lines += 1;
        };

        registry.end_of_stream();
        debug!(lines, eof, "read pass finished");
        Ok(ReadPass { lines, eof })
    }

    /// Unwraps the reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}
