//! Runs one external tool and turns its output into a [`RunResult`].
//!
//! stdout and stderr are drained by two reader threads that forward lines
//! over a single channel. The calling thread is the only consumer, so the
//! log, the success flag and the diagnostics all see lines in arrival order
//! without any further locking.

use super::classify::classify;
use super::log_sink::LogSink;
use super::sentinel::{SuccessDetector, ToolKind};
use crate::error::RunError;
use crate::model::{QuickFix, RunResult};
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// How long to keep draining output after a timed-out tool was killed.
const KILL_GRACE: Duration = Duration::from_secs(2);

/// A fully resolved command line for one tool launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl Invocation {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Arguments joined with spaces, as they would be typed.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

enum StreamEvent {
    Line(Stream, String),
    Closed(Stream),
}

/// Success flag and diagnostics collected while a tool runs.
#[derive(Debug)]
pub struct RunAccumulator {
    detector: SuccessDetector,
    diagnostics: Vec<QuickFix>,
}

impl RunAccumulator {
    pub fn new(kind: ToolKind) -> Self {
        Self {
            detector: SuccessDetector::new(kind),
            diagnostics: Vec::new(),
        }
    }

    /// Sentinel detection and classification are independent; both see every line.
    pub fn observe(&mut self, line: &str) {
        self.detector.observe(line);
        if let Some(fix) = classify(line) {
            self.diagnostics.push(fix);
        }
    }

    pub fn finish(self) -> RunResult {
        RunResult {
            success: self.detector.success(),
            diagnostics: self.diagnostics,
        }
    }
}

/// Launches tools and blocks until they exit.
#[derive(Debug, Clone, Default)]
pub struct Supervisor {
    timeout: Option<Duration>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill the tool if it runs longer than `timeout`. `None` waits forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn run(
        &self,
        invocation: &Invocation,
        kind: ToolKind,
        sink: &mut LogSink,
    ) -> Result<RunResult, RunError> {
        debug!(
            command = %invocation.command_line(),
            dir = %invocation.working_dir.display(),
            "launching"
        );

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RunError::Launch {
                program: invocation.program.clone(),
                source,
            })?;

        // Nothing is ever sent; closing it means tools that prompt see EOF instead of hanging.
        drop(child.stdin.take());

        let (tx, rx) = mpsc::channel();
        let readers: Vec<JoinHandle<()>> = [
            child.stdout.take().map(|pipe| spawn_reader(pipe, Stream::Stdout, tx.clone())),
            child.stderr.take().map(|pipe| spawn_reader(pipe, Stream::Stderr, tx.clone())),
        ]
        .into_iter()
        .flatten()
        .collect();
        drop(tx);

        let mut acc = RunAccumulator::new(kind);
        let timed_out = self.pump(&rx, &mut acc, sink, || {
            warn!(
                program = %invocation.program,
                timeout = ?self.timeout,
                "tool timed out, killing it"
            );
            if let Err(e) = child.kill() {
                warn!(error = %e, "failed to kill timed-out tool");
            }
        });

        if timed_out {
            // Readers may still be blocked on pipes held open by grandchildren.
            drop(readers);
        } else {
            for reader in readers {
                let _ = reader.join();
            }
        }

        let status = child.wait().map_err(|source| RunError::Wait {
            program: invocation.program.clone(),
            source,
        })?;
        debug!(program = %invocation.program, %status, "tool exited");

        let mut result = acc.finish();
        if timed_out {
            result.success = false;
        }
        Ok(result)
    }

    /// Consume stream events until both streams close. Returns whether the
    /// timeout fired, in which case `on_timeout` has been called once.
    fn pump(
        &self,
        rx: &Receiver<StreamEvent>,
        acc: &mut RunAccumulator,
        sink: &mut LogSink,
        mut on_timeout: impl FnMut(),
    ) -> bool {
        let mut deadline = self.timeout.map(|t| Instant::now() + t);
        let mut timed_out = false;

        loop {
            let event = match deadline {
                None => match rx.recv() {
                    Ok(event) => event,
                    Err(_) => break,
                },
                Some(at) => match rx.recv_timeout(at.saturating_duration_since(Instant::now())) {
                    Ok(event) => event,
                    Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) if timed_out => break,
                    Err(RecvTimeoutError::Timeout) => {
                        on_timeout();
                        timed_out = true;
                        deadline = Some(Instant::now() + KILL_GRACE);
                        continue;
                    }
                },
            };

            match event {
                StreamEvent::Line(stream, line) => {
                    trace!(?stream, %line);
                    sink.write_line(&line);
                    acc.observe(&line);
                }
                StreamEvent::Closed(stream) => {
                    trace!(?stream, "stream closed");
                    sink.end_of_stream();
                }
            }
        }

        timed_out
    }
}

fn spawn_reader<R: Read + Send + 'static>(
    pipe: R,
    stream: Stream,
    tx: Sender<StreamEvent>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(trim_line_ending(&buf)).into_owned();
                    if tx.send(StreamEvent::Line(stream, line)).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!(?stream, error = %e, "failed reading tool output");
                    break;
                }
            }
        }
        let _ = tx.send(StreamEvent::Closed(stream));
    })
}

fn trim_line_ending(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}
