//! Command types.
//!
//! A command is assembled on a [`PendingCommand`] and sealed into an immutable
//! [`Command`] once its assembly rule reports it full (or the stream ends).
//! Sealed commands are shared between sinks as [`SharedCommand`].

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::BulkSize;

/// Token that opens a block command.
pub const BLOCK_OPEN: &str = "{";

/// Token that closes a block command.
pub const BLOCK_CLOSE: &str = "}";

/// A sealed command shared read-only between every sink that receives it.
pub type SharedCommand = Arc<Command>;

/// Which assembly rule produced a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Fixed number of tokens.
    Fixed,
    /// Delimited by `{` ... `}`.
    Block,
}

/// Assembly rule of an open command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assembly {
    /// Full once `capacity` tokens have been added.
    Fixed {
        /// Target token count.
        capacity: usize,
    },
    /// Full once every opened block has been closed.
    Block {
        /// Number of currently open blocks.
        depth: usize,
    },
}

/// A command that is still accepting tokens.
#[derive(Debug, Clone)]
pub struct PendingCommand {
    tokens: Vec<String>,
    created_at: DateTime<Utc>,
    assembly: Assembly,
}

impl PendingCommand {
    /// Opens a fixed-size command.
    #[must_use]
    pub fn fixed(size: BulkSize) -> Self {
        Self {
            tokens: Vec::with_capacity(size.get()),
            created_at: Utc::now(),
            assembly: Assembly::Fixed { capacity: size.get() },
        }
    }

    /// Opens a block command. The opening delimiter has already been seen.
    #[must_use]
    pub fn block() -> Self {
        Self {
            tokens: Vec::new(),
            created_at: Utc::now(),
            assembly: Assembly::Block { depth: 1 },
        }
    }

    /// Current assembly state.
    #[must_use]
    pub const fn assembly(&self) -> Assembly {
        self.assembly
    }

    /// Tokens collected so far.
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Whether the assembly rule is satisfied.
    #[must_use]
    pub fn is_full(&self) -> bool {
        match self.assembly {
            Assembly::Fixed { capacity } => self.tokens.len() == capacity,
            Assembly::Block { depth } => depth == 0,
        }
    }

    /// Feeds one token. Tokens offered after the command is full are ignored.
    pub fn add_token(&mut self, token: &str) {
        if self.is_full() {
            return;
        }

        match &mut self.assembly {
            Assembly::Fixed { .. } => self.tokens.push(token.to_owned()),
            Assembly::Block { depth } => match token {
                BLOCK_OPEN => *depth += 1,
                BLOCK_CLOSE => *depth -= 1,
                _ => self.tokens.push(token.to_owned()),
            },
        }
    }

    /// Seals the command. No further tokens can be added.
    #[must_use]
    pub fn into_command(self) -> Command {
        let kind = match self.assembly {
            Assembly::Fixed { .. } => CommandKind::Fixed,
            Assembly::Block { .. } => CommandKind::Block,
        };
        Command {
            tokens: self.tokens,
            created_at: self.created_at,
            kind,
        }
    }
}

/// An immutable, completed batch of tokens.
///
/// `Display` renders the tokens joined by a single space, without a trailing
/// newline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    tokens: Vec<String>,
    created_at: DateTime<Utc>,
    kind: CommandKind,
}

impl Command {
    /// Payload tokens in input order.
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// When the first token (or opening delimiter) of this command was seen.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Assembly rule that produced this command.
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Number of payload tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True for an empty block (`{` immediately followed by `}`).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens.join(" "))
    }
}
