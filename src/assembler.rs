//! Command assembly state machine.
//!
//! ```text
//!          push(t)                     push(t), command full
//!   Idle ──────────► Accumulating ───────────────────────────► Idle
//!     │                                                         ▲
//!     └── push(t), bulk size 1 ─────────────────────────────────┘
//! ```
//!
//! `{` while idle opens a block command; any other token opens a fixed command
//! of the configured bulk size. While accumulating, every token goes to the
//! open command, delimiters included.

use crate::command::{Command, PendingCommand, BLOCK_OPEN};
use crate::config::BulkSize;

/// Observable state of the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    /// No command is open.
    Idle,
    /// A command is open and accepting tokens.
    Accumulating,
}

/// Groups tokens into commands.
#[derive(Debug)]
pub struct CommandAssembler {
    bulk_size: BulkSize,
    pending: Option<PendingCommand>,
}

impl CommandAssembler {
    /// Creates an idle assembler.
    #[must_use]
    pub const fn new(bulk_size: BulkSize) -> Self {
        Self {
            bulk_size,
            pending: None,
        }
    }

    /// Configured fixed batch length.
    #[must_use]
    pub const fn bulk_size(&self) -> BulkSize {
        self.bulk_size
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> AssemblerState {
        if self.pending.is_some() {
            AssemblerState::Accumulating
        } else {
            AssemblerState::Idle
        }
    }

    /// Tokens of the open command, if any.
    #[must_use]
    pub fn pending_tokens(&self) -> Option<&[String]> {
        self.pending.as_ref().map(PendingCommand::tokens)
    }

    /// Feeds one token and returns the command it completed, if any.
    pub fn push(&mut self, token: &str) -> Option<Command> {
        match self.pending.as_mut() {
            Some(pending) => pending.add_token(token),
            None if token == BLOCK_OPEN => self.pending = Some(PendingCommand::block()),
            None => {
                let mut pending = PendingCommand::fixed(self.bulk_size);
                pending.add_token(token);
                self.pending = Some(pending);
            }
        }

        if self.pending.as_ref().is_some_and(PendingCommand::is_full) {
            self.pending.take().map(PendingCommand::into_command)
        } else {
            None
        }
    }

    /// Seals whatever is open at end of stream, full or not.
    pub fn finish(&mut self) -> Option<Command> {
        self.pending.take().map(PendingCommand::into_command)
    }
}
