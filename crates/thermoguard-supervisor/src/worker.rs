//! Worker boundary and the thread-backed channel worker.
//!
//! A worker owns one inbound channel and three signals shared with the
//! supervisor: `shutdown` (supervisor → worker), `heartbeat` and `error`
//! (worker → supervisor). Each loop iteration the worker drains its inbox,
//! answers its self-test probe on the MAIN channel, re-asserts its heartbeat
//! and then waits up to one poll interval for shutdown.

use crate::error::{SupervisorError, SupervisorResult};
use crate::handler::{BoxedHandler, MessageHandler, Outbox};
use std::fmt;
use std::thread::JoinHandle;
use std::time::Duration;
use thermoguard_ipc::{
    ChannelError, ChannelReader, Member, Message, SelfTestEvent, SystemChannels, WorkerSignals,
};

/// Lifecycle of a supervised component.
pub trait Worker: Send + fmt::Debug {
    /// Diagnostic name.
    fn name(&self) -> &str;

    /// Start the worker.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker cannot run.
    fn start(&mut self) -> SupervisorResult<()>;

    /// Ask the worker to stop. Idempotent and non-blocking.
    fn shutdown(&self);

    /// Wait for the worker to stop. Returns at once if it never started.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread panicked.
    fn join(&mut self) -> SupervisorResult<()>;
}

/// Worker serving the SERVER or IR channel on its own thread.
#[derive(Debug)]
pub struct ChannelWorker {
    role: Member,
    signals: WorkerSignals,
    poll_interval: Duration,
    pending: Option<WorkerLoop>,
    thread: Option<JoinHandle<()>>,
}

impl ChannelWorker {
    /// Create a worker for `role`.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::InvalidConfiguration`] unless `role` is
    /// [`Member::Server`] or [`Member::Ir`].
    pub fn new(
        role: Member,
        channels: &SystemChannels,
        signals: WorkerSignals,
        poll_interval: Duration,
        handler: Box<dyn MessageHandler>,
    ) -> SupervisorResult<Self> {
        let Some(probe) = SelfTestEvent::probe_for(role).filter(|_| Message::ack(role).is_some())
        else {
            return Err(SupervisorError::invalid_configuration(format!(
                "member '{role}' cannot run a channel worker"
            )));
        };

        let work = WorkerLoop {
            role,
            probe,
            inbox: channels.channel_for(role).reader(),
            outbox: Outbox::new(role, channels.clone()),
            signals: signals.clone(),
            poll_interval,
            handler: BoxedHandler(handler),
        };

        Ok(Self {
            role,
            signals,
            poll_interval,
            pending: Some(work),
            thread: None,
        })
    }

    /// Member served by this worker.
    #[must_use]
    pub fn role(&self) -> Member {
        self.role
    }

    /// Signals shared with the supervisor.
    #[must_use]
    pub fn signals(&self) -> &WorkerSignals {
        &self.signals
    }

    /// Inbox poll period.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Worker for ChannelWorker {
    fn name(&self) -> &str {
        self.role.as_str()
    }

    fn start(&mut self) -> SupervisorResult<()> {
        let work = self
            .pending
            .take()
            .ok_or_else(|| SupervisorError::worker_start(self.role.as_str(), "already started"))?;
        let handle = std::thread::Builder::new()
            .name(format!("worker-{}", self.role))
            .spawn(move || work.run())
            .map_err(|e| SupervisorError::worker_start(self.role.as_str(), e))?;
        self.thread = Some(handle);
        tracing::info!(worker = %self.role, "worker started");
        Ok(())
    }

    fn shutdown(&self) {
        self.signals.shutdown.set();
    }

    fn join(&mut self) -> SupervisorResult<()> {
        match self.thread.take() {
            Some(handle) => {
                handle
                    .join()
                    .map_err(|payload| SupervisorError::worker_panicked(self.role.as_str(), &*payload))?;
                tracing::info!(worker = %self.role, "worker stopped");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

struct WorkerLoop {
    role: Member,
    probe: SelfTestEvent,
    inbox: ChannelReader,
    outbox: Outbox,
    signals: WorkerSignals,
    poll_interval: Duration,
    handler: BoxedHandler,
}

impl fmt::Debug for WorkerLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerLoop")
            .field("role", &self.role)
            .field("inbox", &self.inbox.name())
            .finish_non_exhaustive()
    }
}

impl WorkerLoop {
    fn run(mut self) {
        loop {
            if let Err(e) = self.drain_inbox() {
                tracing::info!(worker = %self.role, error = %e, "inbox closed, worker exiting");
                break;
            }
            self.signals.heartbeat.set();
            if self.signals.shutdown.wait(Some(self.poll_interval)) {
                break;
            }
        }
    }

    fn drain_inbox(&mut self) -> Result<(), ChannelError> {
        while let Some(msg) = self.inbox.get()? {
            match msg.event().as_self_test() {
                Some(tag) if tag == self.probe => self.answer_probe(&msg),
                Some(tag) => {
                    tracing::warn!(worker = %self.role, event = %tag, "unexpected self-test message");
                }
                None => self.handler.dispatch(&msg, &self.outbox),
            }
        }
        Ok(())
    }

    fn answer_probe(&self, request: &Message) {
        let Some(ack) = request.acknowledge() else {
            return;
        };
        match self.outbox.send(ack) {
            Ok(()) => self.signals.error.clear(),
            Err(e) => {
                self.signals.error.set();
                tracing::error!(worker = %self.role, error = %e, "self-test acknowledgment failed");
            }
        }
    }
}
