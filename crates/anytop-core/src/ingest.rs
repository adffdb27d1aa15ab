//! Ingest path: read lines, sanitize them, feed the coordinator.
//!
//! Reads are blocking and strictly sequential. A read that is interrupted
//! without producing data is retried a bounded number of times before the
//! stream is treated as finished.

use std::io::{self, BufRead, ErrorKind};
use std::sync::{Arc, LazyLock};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use regex::Regex;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::accumulate::Record;
use crate::coordinator::Coordinator;

/// Consecutive interrupted reads tolerated before giving up on the source.
pub const MAX_IO_RETRIES: u32 = 2;

/// ESC '[' digits (';' digits)? 'm'
static COLOR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9]*(;[0-9]*)?m").expect("color pattern is valid"));

/// Trims trailing whitespace and strips shell color codes.
pub fn sanitize(line: &str) -> String {
    COLOR_PATTERN.replace_all(line.trim_end(), "").into_owned()
}

/// Line iterator that survives interrupted reads.
///
/// Yields sanitized lines. Invalid UTF-8 is replaced rather than rejected.
pub struct RobustLines<R> {
    reader: R,
    buf: Vec<u8>,
    interruptions: u32,
}

impl<R: BufRead> RobustLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            interruptions: 0,
        }
    }

    /// Appends bytes up to and including the next newline to `buf`.
    ///
    /// Uses `fill_buf` directly so that interruptions reach the caller
    /// instead of being retried forever inside `read_until`.
    fn read_line(&mut self) -> io::Result<()> {
        loop {
            let available = self.reader.fill_buf()?;
            if available.is_empty() {
                return Ok(());
            }
            if let Some(i) = available.iter().position(|&b| b == b'\n') {
                self.buf.extend_from_slice(&available[..=i]);
                self.reader.consume(i + 1);
                return Ok(());
            }
            let len = available.len();
            self.buf.extend_from_slice(available);
            self.reader.consume(len);
        }
    }
}

impl<R: BufRead> Iterator for RobustLines<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.read_line() {
                Ok(()) => {
                    self.interruptions = 0;
                    if self.buf.is_empty() {
                        return None;
                    }
                    let line = sanitize(&String::from_utf8_lossy(&self.buf));
                    self.buf.clear();
                    return Some(Ok(line));
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => {
                    self.interruptions += 1;
                    if self.interruptions > MAX_IO_RETRIES {
                        warn!(
                            interruptions = self.interruptions,
                            "read keeps getting interrupted, treating input as finished"
                        );
                        return None;
                    }
                    debug!(interruptions = self.interruptions, "read interrupted, retrying");
                }
                Err(err) => return Some(Err(err).context("read input")),
            }
        }
    }
}

/// How an ingest loop ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestEnd {
    /// The source has no more lines.
    Exhausted,
    /// A stop was requested before the source ran out.
    Stopped,
}

/// Feeds every line of `source` to the coordinator until the source runs
/// out or a stop is requested.
///
/// # Errors
/// Returns an error on an unreadable source or, in histogram mode, a line
/// that is not a number.
pub fn ingest<R: BufRead>(coordinator: &Coordinator, source: R) -> Result<IngestEnd> {
    let mode = coordinator.mode();
    for line in RobustLines::new(source) {
        if coordinator.is_stopped() {
            return Ok(IngestEnd::Stopped);
        }
        let record = Record::parse(mode, line?)?;
        coordinator.consume(record);
    }
    debug!("INPUT: finished");
    Ok(IngestEnd::Exhausted)
}

/// Runs [`ingest`] on a dedicated thread.
///
/// Once the source is exhausted the thread parks until the run is stopped,
/// so the final distribution stays on screen. Errors are handed to the
/// coordinator, which stops the run.
///
/// # Errors
/// Returns an error if the thread cannot be spawned.
pub fn spawn_ingest<R>(
    coordinator: Arc<Coordinator>,
    source: R,
    runtime: Handle,
) -> Result<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name("anytop-ingest".to_string())
        .spawn(move || match ingest(&coordinator, source) {
            Ok(IngestEnd::Exhausted) => {
                info!("INPUT: exhausted");
                let cancel = coordinator.cancellation();
                runtime.block_on(cancel.cancelled());
            }
            Ok(IngestEnd::Stopped) => debug!("INPUT: stopped"),
            Err(err) => coordinator.fail(err),
        })
        .context("spawn ingest thread")
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::{Cursor, Read};
    use std::time::Duration;

    use super::*;
    use crate::accumulate::{Accumulator, Mode, Snapshot};
    use crate::error::MonitorError;

    /// Reader that replays a script of chunks and interruptions.
    struct Scripted {
        steps: VecDeque<Option<&'static [u8]>>,
        current: &'static [u8],
    }

    impl Scripted {
        fn new(steps: Vec<Option<&'static [u8]>>) -> Self {
            Self {
                steps: steps.into(),
                current: &[],
            }
        }
    }

    impl Read for Scripted {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            let available = self.fill_buf()?;
            let n = available.len().min(out.len());
            out[..n].copy_from_slice(&available[..n]);
            self.consume(n);
            Ok(n)
        }
    }

    impl BufRead for Scripted {
        fn fill_buf(&mut self) -> io::Result<&[u8]> {
            if self.current.is_empty() {
                match self.steps.pop_front() {
                    Some(Some(chunk)) => self.current = chunk,
                    Some(None) => return Err(io::Error::from(ErrorKind::Interrupted)),
                    None => {}
                }
            }
            Ok(self.current)
        }

        fn consume(&mut self, amt: usize) {
            self.current = &self.current[amt..];
        }
    }

    fn chunk(bytes: &'static [u8]) -> Option<&'static [u8]> {
        Some(bytes)
    }

    fn collect(reader: impl BufRead) -> Vec<String> {
        RobustLines::new(reader).map(Result::unwrap).collect()
    }

    #[test]
    fn test_sanitize_strips_colors_and_trailing_space() {
        assert_eq!(sanitize("\x1b[31mred\x1b[0m  \n"), "red");
        assert_eq!(sanitize("\x1b[1;32mbold green\x1b[m"), "bold green");
        assert_eq!(sanitize("  leading kept"), "  leading kept");
        assert_eq!(sanitize("plain"), "plain");
    }

    #[test]
    fn test_sanitize_leaves_other_escapes() {
        // only SGR color codes are removed
        assert_eq!(sanitize("\x1b[2Jclear"), "\x1b[2Jclear");
    }

    #[test]
    fn test_lines_without_trailing_newline() {
        let lines = collect(Cursor::new("a\nb\r\n\nc"));
        assert_eq!(lines, vec!["a", "b", "", "c"]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let lines = collect(Cursor::new(b"ok\n\xff\xfe\n".to_vec()));
        assert_eq!(lines[0], "ok");
        assert_eq!(lines[1], "\u{fffd}\u{fffd}");
    }

    #[test]
    fn test_interruptions_are_retried() {
        let reader = Scripted::new(vec![
            chunk(b"one\ntw"),
            None,
            chunk(b"o\n"),
            None,
            None,
            chunk(b"three\n"),
        ]);
        assert_eq!(collect(reader), vec!["one", "two", "three"]);
    }

    #[test]
    fn test_too_many_interruptions_end_the_stream() {
        let reader = Scripted::new(vec![chunk(b"one\n"), None, None, None, chunk(b"lost\n")]);
        assert_eq!(collect(reader), vec!["one"]);
    }

    #[test]
    fn test_ingest_frequency() {
        let coordinator = Coordinator::new(Accumulator::for_mode(Mode::Frequency, None));
        let end = ingest(&coordinator, Cursor::new("x\n\x1b[32mx\x1b[0m\ny \n")).unwrap();
        assert_eq!(end, IngestEnd::Exhausted);
        let Snapshot::Frequencies(table) = coordinator.snapshot() else {
            panic!("expected frequencies");
        };
        assert_eq!(table.get("x"), 2);
        assert_eq!(table.get("y"), 1);
    }

    #[test]
    fn test_ingest_parse_error_is_fatal() {
        let coordinator = Coordinator::new(Accumulator::for_mode(Mode::Histogram, None));
        let err = ingest(&coordinator, Cursor::new("1.5\nnope\n2\n")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MonitorError>(),
            Some(MonitorError::InputParse { record, .. }) if record == "nope"
        ));
        let Snapshot::Sample(sample) = coordinator.snapshot() else {
            panic!("expected a sample");
        };
        assert_eq!(sample.as_slice(), &[1.5]);
    }

    #[test]
    fn test_ingest_stops_when_requested() {
        let coordinator = Coordinator::new(Accumulator::for_mode(Mode::Frequency, None));
        coordinator.request_stop();
        let end = ingest(&coordinator, Cursor::new("a\nb\n")).unwrap();
        assert_eq!(end, IngestEnd::Stopped);
        let Snapshot::Frequencies(table) = coordinator.snapshot() else {
            panic!("expected frequencies");
        };
        assert!(table.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_spawned_ingest_parks_until_stopped() {
        let coordinator = Arc::new(Coordinator::new(Accumulator::for_mode(
            Mode::Frequency,
            None,
        )));
        let handle = spawn_ingest(
            Arc::clone(&coordinator),
            Cursor::new("a\n"),
            Handle::current(),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished(), "ingest should park after exhaustion");

        coordinator.request_stop();
        tokio::task::spawn_blocking(move || handle.join().unwrap())
            .await
            .unwrap();
        assert!(coordinator.take_fault().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_spawned_ingest_reports_fault() {
        let coordinator = Arc::new(Coordinator::new(Accumulator::for_mode(
            Mode::Histogram,
            None,
        )));
        spawn_ingest(
            Arc::clone(&coordinator),
            Cursor::new("1\nx\n"),
            Handle::current(),
        )
        .unwrap();

        tokio::time::timeout(Duration::from_secs(5), coordinator.stopped())
            .await
            .expect("a parse error should stop the run");
        let err = coordinator.take_fault().unwrap();
        assert!(err.to_string().contains("\"x\""));
    }
}
