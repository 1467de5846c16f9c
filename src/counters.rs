//! Per-worker and process-level statistics.
//!
//! Each worker owns its counters outright and hands them back when it exits,
//! so nothing here is synchronized.

use std::fmt;

use serde::Serialize;

use crate::command::Command;

/// Counters kept by one worker (or by the ingestion thread).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerCounters {
    name: String,
    blocks: u64,
    commands: u64,
    #[serde(skip_serializing_if = "is_zero")]
    failures: u64,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(n: &u64) -> bool {
    *n == 0
}

impl WorkerCounters {
    /// Zeroed counters for `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocks: 0,
            commands: 0,
            failures: 0,
        }
    }

    /// Records one flushed block and its tokens.
    pub fn count(&mut self, command: &Command) {
        self.blocks += 1;
        self.commands += command.len() as u64;
    }

    /// Records a command whose output failed.
    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    /// Adds `other` into `self`, keeping this name.
    pub fn absorb(&mut self, other: &Self) {
        self.blocks += other.blocks;
        self.commands += other.commands;
        self.failures += other.failures;
    }

    /// Worker name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of commands flushed.
    #[must_use]
    pub const fn blocks(&self) -> u64 {
        self.blocks
    }

    /// Number of tokens flushed, summed over all commands.
    #[must_use]
    pub const fn commands(&self) -> u64 {
        self.commands
    }

    /// Number of commands whose output failed.
    #[must_use]
    pub const fn failures(&self) -> u64 {
        self.failures
    }
}

impl fmt::Display for WorkerCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, blocks: {}, commands: {}", self.name, self.blocks, self.commands)?;
        if self.failures > 0 {
            write!(f, ", failures: {}", self.failures)?;
        }
        Ok(())
    }
}

/// Counters of the ingestion thread: worker counters plus lines read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MainCounters {
    lines: u64,
    #[serde(flatten)]
    counters: WorkerCounters,
}

impl MainCounters {
    /// Zeroed counters for `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            lines: 0,
            counters: WorkerCounters::new(name),
        }
    }

    /// Records one ingested line.
    pub fn count_line(&mut self) {
        self.lines += 1;
    }

    /// Records one flushed command.
    pub fn count(&mut self, command: &Command) {
        self.counters.count(command);
    }

    /// Number of lines ingested.
    #[must_use]
    pub const fn lines(&self) -> u64 {
        self.lines
    }

    /// Command/block counters.
    #[must_use]
    pub const fn counters(&self) -> &WorkerCounters {
        &self.counters
    }
}

impl fmt::Display for MainCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, lines: {}, commands: {}, blocks: {}",
            self.counters.name, self.lines, self.counters.commands, self.counters.blocks
        )
    }
}
