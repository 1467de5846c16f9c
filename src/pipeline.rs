//! End-to-end wiring: source, registry, dispatcher and sinks.
//!
//! The default topology mirrors the classic bulk tool: one console sink named
//! `log` and one file sink named `file` drained by several workers.

use std::fmt;
use std::io::BufRead;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::config::{BulkSize, ConsoleMode, PipelineConfig};
use crate::counters::{MainCounters, WorkerCounters};
use crate::dispatch::Dispatcher;
use crate::error::BulkResult;
use crate::output::{ConsoleWriter, FileWriter};
use crate::registry::SubscriptionRegistry;
use crate::sink::{ImmediateSink, QueuedSink, QueuedSinkConfig, Sink};
use crate::source::{LineSource, ReadPass};

/// Counters collected at shutdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShutdownReport {
    /// Ingestion thread counters.
    pub main: MainCounters,
    /// One entry per sink worker, in sink registration order.
    pub workers: Vec<WorkerCounters>,
}

impl ShutdownReport {
    /// Blocks written across all workers.
    #[must_use]
    pub fn worker_blocks(&self) -> u64 {
        self.workers.iter().map(WorkerCounters::blocks).sum()
    }
}

impl fmt::Display for ShutdownReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.main)?;
        for worker in &self.workers {
            writeln!(f, "{worker}")?;
        }
        Ok(())
    }
}

/// A running pipeline.
pub struct Pipeline {
    registry: SubscriptionRegistry,
    dispatcher: Arc<Dispatcher>,
}

impl Pipeline {
    /// Starts the default console + file topology.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unusable output directory, or a
    /// sink error if a worker thread cannot be spawned.
    pub fn start(config: &PipelineConfig) -> BulkResult<Self> {
        config.validate()?;

        let console: Arc<dyn Sink> = match config.console {
            ConsoleMode::Immediate => Arc::new(ImmediateSink::new("log", Arc::new(ConsoleWriter::stdout()))),
            ConsoleMode::Queued => Arc::new(QueuedSink::start(
                QueuedSinkConfig {
                    name: "log".to_string(),
                    workers: 1,
                    latency: config.console_latency,
                },
                Arc::new(ConsoleWriter::stdout()),
            )?),
        };

        let file = QueuedSink::start(
            QueuedSinkConfig {
                name: "file".to_string(),
                workers: config.file_workers,
                latency: config.file_latency,
            },
            Arc::new(FileWriter::new(&config.output_dir)),
        )?;

        info!(bulk_size = %config.bulk_size, console = ?config.console, "pipeline started");
        Ok(Self::with_sinks(config.bulk_size, vec![console, Arc::new(file)]))
    }

    /// Builds a pipeline around caller-supplied sinks.
    #[must_use]
    pub fn with_sinks(bulk_size: BulkSize, sinks: Vec<Arc<dyn Sink>>) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(bulk_size));
        for sink in sinks {
            dispatcher.add_sink(sink);
        }

        let registry = SubscriptionRegistry::new();
        registry.subscribe(&dispatcher);
        Self { registry, dispatcher }
    }

    /// The registry lines are dispatched through. Extra observers may be
    /// subscribed here.
    #[must_use]
    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// The dispatcher owning the assembler.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Reads one pass from `input` (up to an empty line or EOF) and flushes
    /// whatever command is left open.
    ///
    /// # Errors
    ///
    /// Returns the input I/O error, if any.
    pub fn run<R: BufRead>(&self, input: R) -> BulkResult<ReadPass> {
        let mut source = LineSource::new(input);
        Ok(source.read_pass(&self.registry)?)
    }

    /// Publishes any command left open (a `run` that ended on an I/O error
    /// leaves one), stops every sink, waiting for queued output, and returns
    /// the counters.
    #[must_use]
    pub fn shutdown(self) -> ShutdownReport {
        self.dispatcher.flush();
        let sinks = self.dispatcher.sinks();
        for sink in &sinks {
            sink.stop();
        }

        let report = ShutdownReport {
            main: self.dispatcher.counters(),
            workers: sinks.iter().flat_map(|sink| sink.reports()).collect(),
        };
        info!(lines = report.main.lines(), blocks = report.main.counters().blocks(), "pipeline stopped");
        report
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("registry", &self.registry)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn default_topology_writes_files_per_worker() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PipelineConfig::new(BulkSize::new(2).unwrap());
        config.output_dir = dir.path().to_path_buf();
        config.file_workers = 2;

        let pipeline = Pipeline::start(&config).unwrap();
        pipeline.run(Cursor::new("a\nb\nc\nd\ne\n")).unwrap();
        let report = pipeline.shutdown();

        assert_eq!(report.main.to_string(), "main, lines: 5, commands: 5, blocks: 3");
        // log + file1 + file2
        assert_eq!(report.workers.len(), 3);
        assert_eq!(report.worker_blocks(), 6);

        let mut lines = Vec::new();
        for entry in std::fs::read_dir(dir.path()).unwrap() {
            let path = entry.unwrap().path();
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.starts_with("bulk") && name.ends_with(".log"), "unexpected file {name}");
            let text = std::fs::read_to_string(&path).unwrap();
            lines.extend(text.lines().map(str::to_string));
        }
        lines.sort();
        assert_eq!(lines, ["a b", "c d", "e"]);
    }

    #[test]
    fn start_rejects_bad_output_dir() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut config = PipelineConfig::new(BulkSize::new(1).unwrap());
        config.output_dir = file.path().to_path_buf();
        let err = Pipeline::start(&config).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn report_display_lists_every_counter() {
        let pipeline = Pipeline::with_sinks(BulkSize::new(1).unwrap(), Vec::new());
        pipeline.run(Cursor::new("x\n")).unwrap();
        let report = pipeline.shutdown();
        assert_eq!(report.to_string(), "main, lines: 1, commands: 1, blocks: 1\n");
    }
}
