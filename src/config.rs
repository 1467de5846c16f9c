//! Configuration types.
//!
//! Everything here is validated up front so the core never sees an invalid
//! bulk size.

use std::fmt;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Fixed batch length for non-block commands. Always at least 1.
///
/// # Examples
///
/// ```
/// use bulkmt::BulkSize;
///
/// let size: BulkSize = "3".parse().unwrap();
/// assert_eq!(size.get(), 3);
/// assert!("0".parse::<BulkSize>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BulkSize(NonZeroUsize);

impl BulkSize {
    /// Creates a bulk size, returning `None` for zero.
    #[must_use]
    pub const fn new(size: usize) -> Option<Self> {
        match NonZeroUsize::new(size) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// Returns the size as a plain integer.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0.get()
    }
}

impl From<NonZeroUsize> for BulkSize {
    fn from(n: NonZeroUsize) -> Self {
        Self(n)
    }
}

impl TryFrom<i64> for BulkSize {
    type Error = ConfigError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or(ConfigError::BulkSizeOutOfRange { value })
    }
}

impl FromStr for BulkSize {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s.trim().parse().map_err(|_| ConfigError::MalformedBulkSize {
            value: s.to_string(),
        })?;
        Self::try_from(value)
    }
}

impl fmt::Display for BulkSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the console sink performs its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleMode {
    /// Print in the ingestion thread.
    Immediate,
    /// Print from a single background worker.
    #[default]
    Queued,
}

/// Configuration for the default console + file topology.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Fixed batch length.
    pub bulk_size: BulkSize,
    /// Console sink flavour.
    pub console: ConsoleMode,
    /// Artificial delay before each console write (queued mode only).
    pub console_latency: Duration,
    /// Number of workers draining the file sink queue.
    pub file_workers: usize,
    /// Artificial delay before each file write.
    pub file_latency: Duration,
    /// Directory that receives `bulk<ts>-<worker>.log` files.
    pub output_dir: PathBuf,
}

impl PipelineConfig {
    /// Default topology for the given bulk size.
    #[must_use]
    pub fn new(bulk_size: BulkSize) -> Self {
        Self {
            bulk_size,
            console: ConsoleMode::default(),
            console_latency: Duration::ZERO,
            file_workers: 2,
            file_latency: Duration::ZERO,
            output_dir: PathBuf::from("."),
        }
    }

    /// Checks the parts of the config that depend on the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotADirectory` if `output_dir` exists but is not a
    /// directory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output_dir.exists() && !self.output_dir.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: self.output_dir.clone(),
            });
        }
        Ok(())
    }
}
