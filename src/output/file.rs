//! Per-worker log files.
//!
//! One file per worker and creation second, opened in append mode and closed
//! after every write.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::command::Command;
use crate::error::SinkError;

use super::{render, CommandWriter};

/// Appends each command to `bulk<unix seconds>-<worker>.log`.
///
/// The worker name keeps concurrent workers out of each other's files.
/// Commands created in the same second by the same worker share a file, hence
/// append mode.
#[derive(Debug, Clone)]
pub struct FileWriter {
    dir: PathBuf,
}

impl FileWriter {
    /// Writes into `dir`, which must exist by the time the first command is
    /// written.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path that `command` is written to by `worker`.
    #[must_use]
    pub fn path_for(&self, worker: &str, command: &Command) -> PathBuf {
        self.dir
            .join(format!("bulk{}-{worker}.log", command.created_at().timestamp()))
    }
}

impl CommandWriter for FileWriter {
    fn write(&self, worker: &str, command: &Command) -> Result<(), SinkError> {
        let path = self.path_for(worker, command);
        let line = render(command);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| file.write_all(line.as_bytes()))
            .map_err(|source| SinkError::Write { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::PendingCommand;
    use crate::config::BulkSize;

    fn fixed(tokens: &[&str]) -> Command {
        let mut pending = PendingCommand::fixed(BulkSize::new(tokens.len()).unwrap());
        for t in tokens {
            pending.add_token(t);
        }
        pending.into_command()
    }

    #[test]
    fn file_name_uses_timestamp_and_worker() {
        let writer = FileWriter::new("/out");
        let cmd = fixed(&["a"]);
        let expected = format!("/out/bulk{}-file2.log", cmd.created_at().timestamp());
        assert_eq!(writer.path_for("file2", &cmd), PathBuf::from(expected));
    }

    #[test]
    fn appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FileWriter::new(dir.path());
        let cmd = fixed(&["a", "b"]);

        writer.write("file1", &cmd).unwrap();
        writer.write("file1", &cmd).unwrap();

        let text = std::fs::read_to_string(writer.path_for("file1", &cmd)).unwrap();
        assert_eq!(text, "a b\na b\n");
    }

    #[test]
    fn missing_directory_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FileWriter::new(dir.path().join("missing"));
        let err = writer.write("file1", &fixed(&["a"])).unwrap_err();
        let SinkError::Write { path, .. } = err else {
            panic!("expected Write error, got {err:?}");
        };
        assert!(path.starts_with(dir.path().join("missing")));
    }
}
