//! Operator console input.
//!
//! Any line typed on the console asks the supervisor to abort. Reading a line
//! blocks without a timeout, so the read happens on a detached thread that
//! forwards lines over a bounded channel; the worker thread itself only polls
//! that channel and its shutdown signal.

use crate::error::{SupervisorError, SupervisorResult};
use crate::worker::Worker;
use crossbeam::channel::{self, RecvTimeoutError};
use std::fmt;
use std::io::{BufRead, BufReader};
use std::thread::JoinHandle;
use std::time::Duration;
use thermoguard_ipc::Signal;

/// Key the operator is expected to press to quit.
pub const QUIT_KEY: &str = "q";

type LineSource = Box<dyn BufRead + Send>;

/// Worker turning console input into the abort signal.
pub struct ConsoleInput {
    abort: Signal,
    shutdown: Signal,
    poll_interval: Duration,
    source: Option<LineSource>,
    thread: Option<JoinHandle<()>>,
}

impl fmt::Debug for ConsoleInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleInput")
            .field("abort", &self.abort)
            .field("poll_interval", &self.poll_interval)
            .field("started", &self.source.is_none())
            .finish_non_exhaustive()
    }
}

impl ConsoleInput {
    /// Read operator input from standard input.
    #[must_use]
    pub fn stdin(abort: Signal, poll_interval: Duration) -> Self {
        Self::from_reader(BufReader::new(std::io::stdin()), abort, poll_interval)
    }

    /// Read operator input from any line source.
    #[must_use]
    pub fn from_reader(
        reader: impl BufRead + Send + 'static,
        abort: Signal,
        poll_interval: Duration,
    ) -> Self {
        Self {
            abort,
            shutdown: Signal::new("input shutdown"),
            poll_interval,
            source: Some(Box::new(reader)),
            thread: None,
        }
    }
}

impl Worker for ConsoleInput {
    fn name(&self) -> &str {
        "input"
    }

    fn start(&mut self) -> SupervisorResult<()> {
        let source = self
            .source
            .take()
            .ok_or_else(|| SupervisorError::worker_start("input", "already started"))?;
        let (tx, rx) = channel::bounded::<String>(16);

        // Detached: a blocking read cannot be interrupted, so nobody joins it.
        std::thread::Builder::new()
            .name("input-reader".to_owned())
            .spawn(move || {
                for line in source.lines() {
                    let Ok(line) = line else { break };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            })
            .map_err(|e| SupervisorError::worker_start("input", e))?;

        let abort = self.abort.clone();
        let shutdown = self.shutdown.clone();
        let poll = self.poll_interval;
        let handle = std::thread::Builder::new()
            .name("input".to_owned())
            .spawn(move || {
                let mut eof = false;
                loop {
                    if eof {
                        shutdown.wait(None);
                        break;
                    }
                    match rx.recv_timeout(poll) {
                        Ok(line) => {
                            if line.trim() != QUIT_KEY {
                                tracing::info!("press '{QUIT_KEY}' to quit");
                            }
                            tracing::info!("operator requested abort");
                            abort.set();
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => {
                            tracing::debug!("operator input closed");
                            eof = true;
                            continue;
                        }
                    }
                    if shutdown.wait(Some(Duration::ZERO)) {
                        break;
                    }
                }
            })
            .map_err(|e| SupervisorError::worker_start("input", e))?;
        self.thread = Some(handle);
        Ok(())
    }

    fn shutdown(&self) {
        self.shutdown.set();
    }

    fn join(&mut self) -> SupervisorResult<()> {
        match self.thread.take() {
            Some(handle) => handle
                .join()
                .map_err(|payload| SupervisorError::worker_panicked("input", &*payload)),
            None => Ok(()),
        }
    }
}
