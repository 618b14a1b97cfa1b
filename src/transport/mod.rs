//! Line-oriented transport over a child process's standard streams.
//!
//! Outgoing messages are framed as UTF-8 lines on stdin. A dedicated thread
//! reads stdout line by line and hands each line to [`TransportCallbacks`];
//! a second thread drains stderr. Process exit is reported exactly once
//! through [`TransportCallbacks::on_transport_close`].

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::{SpawnError, TransportError};

/// Poll interval while waiting for a process whose stdout already closed.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long a process may outlive the end of its stdout before it is killed.
const EXIT_GRACE_PERIOD: Duration = Duration::from_secs(1);

/// Receiver of transport events. Invoked on the reader threads.
pub trait TransportCallbacks: Send + Sync {
    /// One non-empty stdout line, trailing whitespace removed.
    fn on_payload(&self, payload: &str);

    /// One line written by the process to stderr.
    fn on_stderr_message(&self, message: &str);

    /// The process exited or its stdout broke.
    fn on_transport_close(&self, exit_code: Option<i32>, failure: Option<TransportError>);
}

/// Program and arguments of the native watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherBinary {
    /// Resolved path of the executable.
    pub program: PathBuf,
    /// Extra arguments, normally empty.
    pub args: Vec<String>,
}

impl WatcherBinary {
    /// A binary invoked without arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// A running child process wrapped in a line transport.
pub struct LineTransport {
    name: String,
    stdin: Mutex<Option<BufWriter<ChildStdin>>>,
    child: Arc<Mutex<Child>>,
}

impl LineTransport {
    /// Spawn `binary` with piped stdio and start the reader threads.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be created, any of its
    /// standard streams is missing, or a reader thread cannot be started.
    pub fn spawn(
        name: &str,
        binary: &WatcherBinary,
        callbacks: Arc<dyn TransportCallbacks>,
    ) -> Result<Self, SpawnError> {
        let mut child = Command::new(&binary.program)
            .args(&binary.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SpawnError::launch(binary.program.display().to_string(), e))?;

        let (stdin, stdout, stderr) =
            match (child.stdin.take(), child.stdout.take(), child.stderr.take()) {
                (Some(stdin), Some(stdout), Some(stderr)) => (stdin, stdout, stderr),
                (stdin, stdout, _) => {
                    let missing = if stdin.is_none() {
                        "stdin"
                    } else if stdout.is_none() {
                        "stdout"
                    } else {
                        "stderr"
                    };
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(SpawnError::MissingPipe(missing));
                }
            };

        let pid = child.id();
        let child = Arc::new(Mutex::new(child));

        let stdout_child = Arc::clone(&child);
        let stdout_callbacks = Arc::clone(&callbacks);
        let stdout_thread = thread::Builder::new()
            .name(format!("{name}-stdout"))
            .spawn(move || read_stdout(stdout, &stdout_child, stdout_callbacks.as_ref()));

        let stderr_thread = stdout_thread.and_then(|_| {
            thread::Builder::new()
                .name(format!("{name}-stderr"))
                .spawn(move || read_stderr(stderr, callbacks.as_ref()))
        });

        if let Err(e) = stderr_thread {
            let _ = child.lock().kill();
            return Err(SpawnError::Thread(e.to_string()));
        }

        tracing::debug!(name, pid, program = %binary.program.display(), "Watcher process started");

        Ok(Self {
            name: name.to_string(),
            stdin: Mutex::new(Some(BufWriter::new(stdin))),
            child,
        })
    }

    /// Write `line` followed by a newline to the process stdin.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport was closed or the pipe is broken.
    pub fn send(&self, line: &str) -> Result<(), TransportError> {
        let mut guard = self.stdin.lock();
        let writer = guard.as_mut().ok_or(TransportError::Closed)?;

        writer
            .write_all(line.as_bytes())
            .and_then(|()| writer.write_all(b"\n"))
            .and_then(|()| writer.flush())
            .map_err(|e| TransportError::Write(e.to_string()))
    }

    /// Close stdin and terminate the process. Idempotent.
    ///
    /// The stdout reader observes the exit and reports it through
    /// [`TransportCallbacks::on_transport_close`].
    pub fn close(&self) {
        if self.stdin.lock().take().is_none() {
            return;
        }

        let mut child = self.child.lock();
        if let Ok(None) = child.try_wait() {
            if let Err(e) = child.kill() {
                tracing::warn!(name = %self.name, "Failed to kill watcher process: {e}");
            }
        }
        tracing::debug!(name = %self.name, "Watcher transport closed");
    }

    /// Whether [`close`](Self::close) has been called.
    #[cfg(test)]
    fn is_closed(&self) -> bool {
        self.stdin.lock().is_none()
    }
}

impl Drop for LineTransport {
    fn drop(&mut self) {
        self.close();
    }
}

/// Read stdout until end of stream, then report the exit.
///
/// End of stream is EOF, a read error, or a blank line. A line that is not
/// valid UTF-8 is logged and skipped without ending the stream. Once the
/// stream ends the process gets [`EXIT_GRACE_PERIOD`] to exit on its own
/// and is killed otherwise.
fn read_stdout(stdout: ChildStdout, child: &Mutex<Child>, callbacks: &dyn TransportCallbacks) {
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();

    let failure = loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break None,
            Ok(_) => {}
            Err(e) => break Some(TransportError::Read(e.to_string())),
        }

        let text = match std::str::from_utf8(&buf) {
            Ok(text) => text.trim_end(),
            Err(e) => {
                tracing::warn!("Decode error on watcher output: {e}");
                continue;
            }
        };

        // The watcher never emits blank lines; one means the stream is done.
        if text.is_empty() {
            break None;
        }

        callbacks.on_payload(text);
    };

    let exit_code = wait_for_exit(child, EXIT_GRACE_PERIOD);
    callbacks.on_transport_close(exit_code, failure);
}

fn read_stderr(stderr: ChildStderr, callbacks: &dyn TransportCallbacks) {
    for line in BufReader::new(stderr).lines() {
        match line {
            Ok(line) => {
                let line = line.trim_end();
                if !line.is_empty() {
                    callbacks.on_stderr_message(line);
                }
            }
            Err(e) => {
                tracing::debug!("Watcher stderr closed: {e}");
                break;
            }
        }
    }
}

/// Wait up to `grace` for the child to exit, then kill and reap it.
///
/// The lock is not held across sleeps so `close` can still reach the child.
fn wait_for_exit(child: &Mutex<Child>, grace: Duration) -> Option<i32> {
    let deadline = Instant::now() + grace;
    loop {
        match child.lock().try_wait() {
            Ok(Some(status)) => return status.code(),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Failed to wait for watcher process: {e}");
                return None;
            }
        }
        if Instant::now() >= deadline {
            break;
        }
        thread::sleep(EXIT_POLL_INTERVAL);
    }

    let mut child = child.lock();
    tracing::warn!(pid = child.id(), "Watcher process outlived its output, killing it");
    if let Err(e) = child.kill() {
        tracing::warn!("Failed to kill watcher process: {e}");
    }
    match child.wait() {
        Ok(status) => status.code(),
        Err(e) => {
            tracing::warn!("Failed to wait for watcher process: {e}");
            None
        }
    }
}
