//! # bulkmt - batched command fan-out
//!
//! bulkmt reads a stream of tokens, one per line, groups them into commands
//! and hands every completed command to a set of output sinks without making
//! the reader wait for them.
//!
//! ## Core Concepts
//!
//! - **Command**: an immutable batch of tokens with a creation timestamp
//! - **Bulk size**: number of tokens in a fixed-size command
//! - **Block**: a `{` ... `}` delimited command of any length, nestable
//! - **Sink**: a consumer of commands, either immediate or backed by workers
//!
//! ## Usage
//!
//! ```rust
//! use std::io::Cursor;
//! use std::sync::Arc;
//!
//! use bulkmt::{BulkSize, ImmediateSink, Pipeline, Sink};
//! use bulkmt::output::ConsoleWriter;
//!
//! let console: Arc<dyn Sink> = Arc::new(ImmediateSink::new("log", Arc::new(ConsoleWriter::stdout())));
//! let pipeline = Pipeline::with_sinks(BulkSize::new(3).unwrap(), vec![console]);
//!
//! pipeline.run(Cursor::new("cmd1\ncmd2\ncmd3\n{\ncmd4\n}\n")).unwrap();
//! let report = pipeline.shutdown();
//! assert_eq!(report.main.counters().blocks(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Data and state machine
pub mod assembler;
pub mod command;
pub mod config;
pub mod counters;
pub mod error;

// Ingestion and fan-out
pub mod dispatch;
pub mod registry;
pub mod source;

// Output
pub mod output;
pub mod sink;

pub mod pipeline;

pub use assembler::{AssemblerState, CommandAssembler};
pub use command::{Command, CommandKind, PendingCommand, SharedCommand, BLOCK_CLOSE, BLOCK_OPEN};
pub use config::{BulkSize, ConsoleMode, PipelineConfig};
pub use counters::{MainCounters, WorkerCounters};
pub use dispatch::Dispatcher;
pub use error::{BulkError, BulkResult, ConfigError, SinkError};
pub use pipeline::{Pipeline, ShutdownReport};
pub use registry::{LineObserver, SubscriptionRegistry};
pub use sink::{ImmediateSink, QueuedSink, QueuedSinkConfig, Sink, SinkState};
pub use source::{LineSource, ReadPass};
