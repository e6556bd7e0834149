//! Running the compiler under test.
//!
//! Every test is a single blocking child process:
//! `<compiler> <test> -o <test><object_suffix>`. Standard output is captured,
//! standard error passes through to the harness's own stderr, and standard
//! input is closed.

use std::{
    fmt,
    io::{self, Read},
    path::{Path, PathBuf},
    process::{Child, ChildStdout, Command, ExitStatus, Stdio},
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender},
    thread,
    time::{Duration, Instant},
};

use crate::diagnostics::{HarnessError, Result};
use crate::discovery::TestCase;

const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// How long output already in flight is still collected after a kill.
const KILL_GRACE: Duration = Duration::from_millis(100);

/// What a single compiler run produced.
#[derive(Debug, Clone)]
pub struct Capture {
    /// Standard output decoded as UTF-8; invalid sequences become U+FFFD.
    pub stdout: String,
    /// `None` only if the exit status could not be observed after a kill.
    pub status: Option<ExitStatus>,
    pub timed_out: bool,
    pub elapsed: Duration,
}

/// A fully-formed compiler command line for one test.
#[derive(Debug, Clone)]
pub struct CompilerInvocation {
    compiler: PathBuf,
    input: PathBuf,
    object: PathBuf,
}

impl CompilerInvocation {
    pub fn new(compiler: &Path, case: &TestCase) -> Self {
        Self {
            compiler: compiler.to_path_buf(),
            input: case.path.clone(),
            object: case.object.clone(),
        }
    }

    pub fn compiler(&self) -> &Path {
        &self.compiler
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.compiler);
        command
            .arg(&self.input)
            .arg("-o")
            .arg(&self.object)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        command
    }

    /// Runs the compiler to completion, or until `timeout` elapses.
    ///
    /// The limit covers the whole capture: the compiler must exit and its
    /// stdout pipe must close before the deadline. A compiler that cannot be
    /// started yields [`HarnessError::Launch`]; a timed-out compiler is killed
    /// and reported through [`Capture::timed_out`] together with whatever it
    /// printed before the kill.
    pub fn run(&self, timeout: Option<Duration>) -> Result<Capture> {
        tracing::debug!(command = %self, ?timeout, "spawning compiler");
        let started_at = Instant::now();
        let mut child = self.command().spawn().map_err(|source| HarnessError::Launch {
            compiler: self.compiler.clone(),
            source,
        })?;

        // Stdout is pumped through a channel rather than joined, so a helper
        // process that inherited the pipe cannot hold the run past its deadline.
        let stdout = child.stdout.take().ok_or_else(|| {
            self.wait_error(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "compiler stdout was not captured",
            ))
        })?;
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || pump_stdout(stdout, &tx));

        let deadline = timeout.map(|limit| started_at + limit);
        let mut bytes = Vec::new();
        let closed = self.collect_until(&rx, deadline, &mut bytes)?;

        let (status, timed_out) = match deadline {
            None => (Some(child.wait().map_err(|e| self.wait_error(e))?), false),
            Some(deadline) if closed => self.wait_until(&mut child, deadline)?,
            Some(_) => (self.kill(&mut child), true),
        };
        if timed_out {
            // Keep whatever was already in flight, then abandon the reader.
            self.collect_until(&rx, Some(Instant::now() + KILL_GRACE), &mut bytes)?;
        }

        let elapsed = started_at.elapsed();
        tracing::trace!(
            test = %self.input.display(),
            elapsed_ms = elapsed.as_millis(),
            bytes = bytes.len(),
            timed_out,
            "compiler finished"
        );

        Ok(Capture {
            stdout: String::from_utf8_lossy(&bytes).into_owned(),
            status,
            timed_out,
            elapsed,
        })
    }

    /// Appends stdout chunks to `bytes` until the pipe closes (`true`) or the
    /// deadline passes (`false`).
    fn collect_until(
        &self,
        rx: &Receiver<io::Result<Vec<u8>>>,
        deadline: Option<Instant>,
        bytes: &mut Vec<u8>,
    ) -> Result<bool> {
        loop {
            let chunk = match deadline {
                None => match rx.recv() {
                    Ok(chunk) => chunk,
                    Err(_) => return Ok(true),
                },
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    match rx.recv_timeout(remaining) {
                        Ok(chunk) => chunk,
                        Err(RecvTimeoutError::Timeout) => return Ok(false),
                        Err(RecvTimeoutError::Disconnected) => return Ok(true),
                    }
                }
            };
            bytes.extend_from_slice(&chunk.map_err(|e| self.wait_error(e))?);
        }
    }

    fn wait_until(
        &self,
        child: &mut Child,
        deadline: Instant,
    ) -> Result<(Option<ExitStatus>, bool)> {
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok((Some(status), false)),
                Ok(None) if Instant::now() >= deadline => return Ok((self.kill(child), true)),
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(self.wait_error(e)),
            }
        }
    }

    fn kill(&self, child: &mut Child) -> Option<ExitStatus> {
        tracing::warn!(test = %self.input.display(), "compiler timed out; killing it");
        let _ = child.kill();
        child.wait().ok()
    }

    fn wait_error(&self, source: io::Error) -> HarnessError {
        HarnessError::Wait {
            test: self.input.clone(),
            source,
        }
    }
}

/// Forwards stdout in chunks until EOF, a read error, or a dropped receiver.
fn pump_stdout(mut stdout: ChildStdout, tx: &Sender<io::Result<Vec<u8>>>) {
    let mut buffer = [0u8; 8192];
    loop {
        match stdout.read(&mut buffer) {
            Ok(0) => return,
            Ok(n) => {
                if tx.send(Ok(buffer[..n].to_vec())).is_err() {
                    return;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                let _ = tx.send(Err(e));
                return;
            }
        }
    }
}

impl fmt::Display for CompilerInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -o {}",
            self.compiler.display(),
            self.input.display(),
            self.object.display()
        )
    }
}
