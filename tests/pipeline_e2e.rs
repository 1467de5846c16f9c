use std::io::{self, BufReader, Cursor, Read, Write};
use std::sync::{Arc, Mutex};

use bulkmt::output::{ConsoleWriter, FileWriter};
use bulkmt::{
    BulkSize, Command, ImmediateSink, LineObserver, Pipeline, QueuedSink, QueuedSinkConfig, Sink,
};

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn console_pipeline(bulk_size: usize) -> (Pipeline, SharedBuf) {
    let buf = SharedBuf::default();
    let sink: Arc<dyn Sink> = Arc::new(
        QueuedSink::start(
            QueuedSinkConfig {
                name: "log".to_string(),
                ..QueuedSinkConfig::default()
            },
            Arc::new(ConsoleWriter::new(buf.clone())),
        )
        .unwrap(),
    );
    (Pipeline::with_sinks(BulkSize::new(bulk_size).unwrap(), vec![sink]), buf)
}

#[test]
fn fixed_batches_with_short_tail() {
    let (pipeline, out) = console_pipeline(3);
    pipeline.run(Cursor::new("a\nb\nc\nd\ne\n")).unwrap();
    let report = pipeline.shutdown();

    assert_eq!(out.text(), "a b c\nd e\n");
    assert_eq!(report.to_string(), "main, lines: 5, commands: 5, blocks: 2\nlog, blocks: 2, commands: 5\n");
}

#[test]
fn invalid_utf8_line_does_not_lose_input() {
    let (pipeline, out) = console_pipeline(3);
    let pass = pipeline.run(Cursor::new(b"a\nb\n\xff\nc\nd\ne\nf\n".to_vec())).unwrap();
    let report = pipeline.shutdown();

    assert_eq!(pass.lines, 7);
    assert_eq!(out.text(), "a b \u{fffd}\nc d e\nf\n");
    assert_eq!(report.main.to_string(), "main, lines: 7, commands: 7, blocks: 3");
}

/// Yields its bytes, then fails instead of reporting end of input.
struct FailingInput(Cursor<Vec<u8>>);

impl Read for FailingInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.0.read(buf)? {
            0 => Err(io::Error::new(io::ErrorKind::ConnectionReset, "stdin went away")),
            n => Ok(n),
        }
    }
}

#[test]
fn shutdown_after_failed_run_flushes_open_batch() {
    let (pipeline, out) = console_pipeline(3);
    let input = BufReader::new(FailingInput(Cursor::new(b"a\nb\nc\nd\n".to_vec())));
    let err = pipeline.run(input).unwrap_err();
    assert!(err.is_io());

    let report = pipeline.shutdown();
    assert_eq!(out.text(), "a b c\nd\n");
    assert_eq!(report.to_string(), "main, lines: 4, commands: 4, blocks: 2\nlog, blocks: 2, commands: 4\n");
}

#[test]
fn blocks_mixed_with_fixed_batches() {
    let (pipeline, out) = console_pipeline(3);
    let input = "cmd1\ncmd2\ncmd3\n{\ncmd4\ncmd5\n{\ncmd6\n}\ncmd7\n}\ncmd8\n";
    pipeline.run(Cursor::new(input)).unwrap();
    let report = pipeline.shutdown();

    assert_eq!(out.text(), "cmd1 cmd2 cmd3\ncmd4 cmd5 cmd6 cmd7\ncmd8\n");
    assert_eq!(report.main.lines(), 12);
    assert_eq!(report.main.counters().blocks(), 3);
    assert_eq!(report.main.counters().commands(), 8);
}

#[test]
fn empty_block_prints_empty_line() {
    let (pipeline, out) = console_pipeline(2);
    pipeline.run(Cursor::new("{\n}\n")).unwrap();
    let _ = pipeline.shutdown();
    assert_eq!(out.text(), "\n");
}

#[test]
fn sentinel_line_ends_the_pass() {
    let (pipeline, out) = console_pipeline(2);
    let pass = pipeline.run(Cursor::new("a\nb\nc\n\nnever\n")).unwrap();
    let report = pipeline.shutdown();

    assert_eq!(pass.lines, 3);
    assert!(!pass.eof);
    assert_eq!(out.text(), "a b\nc\n");
    assert_eq!(report.main.lines(), 3);
}

#[test]
fn console_and_file_sinks_see_the_same_commands() {
    let dir = tempfile::tempdir().unwrap();
    let buf = SharedBuf::default();
    let console: Arc<dyn Sink> = Arc::new(ImmediateSink::new("log", Arc::new(ConsoleWriter::new(buf.clone()))));
    let files: Arc<dyn Sink> = Arc::new(
        QueuedSink::start(
            QueuedSinkConfig {
                name: "file".to_string(),
                workers: 2,
                ..QueuedSinkConfig::default()
            },
            Arc::new(FileWriter::new(dir.path())),
        )
        .unwrap(),
    );

    let pipeline = Pipeline::with_sinks(BulkSize::new(1).unwrap(), vec![console, files]);
    let input: String = (0..20).map(|i| format!("t{i}\n")).collect();
    pipeline.run(Cursor::new(input)).unwrap();
    let report = pipeline.shutdown();

    let mut from_files: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .flat_map(|e| {
            let text = std::fs::read_to_string(e.unwrap().path()).unwrap();
            text.lines().map(str::to_string).collect::<Vec<_>>()
        })
        .collect();
    let mut from_console: Vec<String> = buf.text().lines().map(str::to_string).collect();
    from_files.sort();
    from_console.sort();
    assert_eq!(from_files, from_console);
    assert_eq!(from_files.len(), 20);

    // log + file1 + file2
    assert_eq!(report.workers.len(), 3);
    let file_blocks: u64 = report
        .workers
        .iter()
        .filter(|w| w.name().starts_with("file"))
        .map(|w| w.blocks())
        .sum();
    assert_eq!(file_blocks, 20);
}

#[test]
fn released_observer_stops_receiving_lines() {
    #[derive(Default)]
    struct Tap(Mutex<Vec<String>>);

    impl LineObserver for Tap {
        fn notify(&self, line: &str) {
            self.0.lock().unwrap().push(line.to_string());
        }
    }

    let (pipeline, out) = console_pipeline(1);
    let tap = Arc::new(Tap::default());
    pipeline.registry().subscribe(&tap);

    pipeline.run(Cursor::new("a\n\n")).unwrap();
    assert_eq!(*tap.0.lock().unwrap(), ["a"]);

    let weak = Arc::downgrade(&tap);
    drop(tap);
    pipeline.run(Cursor::new("b\n")).unwrap();
    assert!(!pipeline.registry().unsubscribe_weak(&weak));
    assert_eq!(pipeline.registry().len(), 1);

    let _ = pipeline.shutdown();
    assert_eq!(out.text(), "a\nb\n");
}

#[test]
fn report_serializes_to_json() {
    let (pipeline, _out) = console_pipeline(2);
    pipeline.run(Cursor::new("a\nb\nc\n")).unwrap();
    let report = pipeline.shutdown();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["main"]["lines"], 3);
    assert_eq!(json["main"]["blocks"], 2);
    assert_eq!(json["workers"][0]["name"], "log");
    assert_eq!(json["workers"][0]["commands"], 3);
}

#[test]
fn commands_are_shared_not_copied() {
    #[derive(Default)]
    struct Keep(Mutex<Vec<Arc<Command>>>);

    impl Sink for Keep {
        fn name(&self) -> &str {
            "keep"
        }

        fn submit(&self, command: Arc<Command>) -> Result<(), bulkmt::SinkError> {
            self.0.lock().unwrap().push(command);
            Ok(())
        }

        fn stop(&self) {}

        fn reports(&self) -> Vec<bulkmt::WorkerCounters> {
            Vec::new()
        }
    }

    let first = Arc::new(Keep::default());
    let second = Arc::new(Keep::default());
    let pipeline = Pipeline::with_sinks(
        BulkSize::new(2).unwrap(),
        vec![first.clone() as Arc<dyn Sink>, second.clone() as Arc<dyn Sink>],
    );
    pipeline.run(Cursor::new("x\ny\n")).unwrap();
    let _ = pipeline.shutdown();

    let a = first.0.lock().unwrap();
    let b = second.0.lock().unwrap();
    assert!(Arc::ptr_eq(&a[0], &b[0]));
}
