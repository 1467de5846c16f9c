//! bulkmt - batch stdin tokens into commands
//!
//! # Usage
//!
//! ```bash
//! # Groups of three; console plus two file workers
//! seq 1 10 | bulkmt 3
//!
//! # Slow console, JSON counters
//! bulkmt 3 --latency-ms 1000 --stats json
//! ```

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bulkmt::{BulkSize, ConsoleMode, Pipeline, PipelineConfig};

/// Batch stdin tokens into commands and print them to the console and to files
#[derive(Parser, Debug)]
#[command(name = "bulkmt")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Number of tokens per fixed-size command
    bulk_size: BulkSize,

    /// Workers draining the file sink
    #[arg(long, default_value_t = 2)]
    file_workers: usize,

    /// Directory for bulk<ts>-<worker>.log files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Artificial delay before each console write, in milliseconds
    #[arg(long, default_value_t = 0)]
    latency_ms: u64,

    /// Artificial delay before each file write, in milliseconds
    #[arg(long, default_value_t = 0)]
    file_latency_ms: u64,

    /// Console sink flavour
    #[arg(long, value_enum, default_value_t = ConsoleArg::Queued)]
    console: ConsoleArg,

    /// Shutdown statistics format
    #[arg(long, value_enum, default_value_t = StatsFormat::Text)]
    stats: StatsFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ConsoleArg {
    Immediate,
    Queued,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StatsFormat {
    Text,
    Json,
}

impl Cli {
    fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new(self.bulk_size);
        config.console = match self.console {
            ConsoleArg::Immediate => ConsoleMode::Immediate,
            ConsoleArg::Queued => ConsoleMode::Queued,
        };
        config.console_latency = Duration::from_millis(self.latency_ms);
        config.file_workers = self.file_workers;
        config.file_latency = Duration::from_millis(self.file_latency_ms);
        config.output_dir.clone_from(&self.output_dir);
        config
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let pipeline = Pipeline::start(&cli.pipeline_config()).context("failed to start pipeline")?;
    let outcome = pipeline.run(io::stdin().lock());
    if let Ok(pass) = &outcome {
        tracing::debug!(lines = pass.lines, eof = pass.eof, "input finished");
    }

    // Every sink has drained by now, so the report cannot interleave with output.
    let report = pipeline.shutdown();
    match cli.stats {
        StatsFormat::Text => print!("{report}"),
        StatsFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    outcome.context("failed to read input")?;
    Ok(())
}

/// Initialize the tracing subscriber on stderr; stdout carries command output.
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("warn"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(true))
        .with(filter)
        .init();

    Ok(())
}
