//! Supervisor lifecycle and the periodic evaluation loop.
//!
//! The supervisor owns every signal, channel, worker and timer. Each tick it
//! drains its inbound channel, advances the channel self-test, checks worker
//! heartbeats when the heartbeat timer is due, folds every fault source into
//! [`SupervisorErrors`] and drives the safety output: on while healthy, off
//! as soon as any fault is active.
//!
//! ## Lifecycle
//!
//! ```text
//! Built ──start()──► Running ──shutdown_all()──► Stopped
//!   │                                               ▲
//!   └──────────────────shutdown_all()───────────────┘
//! ```
//!
//! A failed `start()` tears down whatever already started and leaves the
//! supervisor `Stopped`. A stopped supervisor never drives the safety output
//! on again.
//!
//! ## Teardown
//!
//! [`Supervisor::shutdown_all`] walks [`TEARDOWN_ORDER`]: the safety output
//! goes off first, then timers stop, workers are joined, channels are closed
//! and drained, and operator input goes last.

use crate::config::SupervisorConfig;
use crate::error::{SupervisorError, SupervisorResult};
use crate::faults::SupervisorErrors;
use crate::handler::{BoxedHandler, LoggingHandler, MessageHandler, Outbox};
use crate::input::ConsoleInput;
use crate::worker::{ChannelWorker, Worker};
use std::fmt;
use std::io::BufRead;
use std::time::Duration;
use thermoguard_ipc::{Member, Signal, SystemChannels, WorkerSignals};
use thermoguard_relay::{RecordingOutput, SafetyOutput};
use thermoguard_timer::{PeriodicTimer, TimerHandle, TimerPolicy};
use thermoguard_watchdog::{ChannelSelfTest, HeartbeatMonitor, SelfTestTarget};

/// Result of one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Keep looping.
    Continue,
    /// The operator asked to abort.
    Abort,
}

/// Lifecycle state of a [`Supervisor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Constructed, nothing started.
    Built,
    /// Workers and timers running.
    Running,
    /// Torn down. Terminal.
    Stopped,
}

impl SupervisorState {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Built => "built",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

/// One step of [`Supervisor::shutdown_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeardownStep {
    /// Switch the safety output off.
    SafetyOutput,
    /// Stop and join the self-test cycle timer.
    SelfTestTimer,
    /// Stop and join the heartbeat timer.
    HeartbeatTimer,
    /// Stop and join the IR worker.
    IrWorker,
    /// Stop and join the server worker.
    ServerWorker,
    /// Close and drain every channel.
    Channels,
    /// Stop and join operator input.
    Input,
}

impl TeardownStep {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SafetyOutput => "safety output",
            Self::SelfTestTimer => "self-test timer",
            Self::HeartbeatTimer => "heartbeat timer",
            Self::IrWorker => "ir worker",
            Self::ServerWorker => "server worker",
            Self::Channels => "channels",
            Self::Input => "input",
        }
    }
}

/// Order in which [`Supervisor::shutdown_all`] releases components.
pub const TEARDOWN_ORDER: [TeardownStep; 7] = [
    TeardownStep::SafetyOutput,
    TeardownStep::SelfTestTimer,
    TeardownStep::HeartbeatTimer,
    TeardownStep::IrWorker,
    TeardownStep::ServerWorker,
    TeardownStep::Channels,
    TeardownStep::Input,
];

enum InputSource {
    None,
    Stdin,
    Reader(Box<dyn BufRead + Send>),
    Custom(Box<dyn Worker>),
}

/// Builder for [`Supervisor`].
pub struct SupervisorBuilder {
    config: SupervisorConfig,
    abort: Signal,
    server_handler: Box<dyn MessageHandler>,
    ir_handler: Box<dyn MessageHandler>,
    dispatcher: Box<dyn MessageHandler>,
    output: Option<Box<dyn SafetyOutput>>,
    input: InputSource,
    heartbeat_interval: Option<Duration>,
    self_test_interval: Option<Duration>,
    worker_poll_interval: Option<Duration>,
}

impl fmt::Debug for SupervisorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupervisorBuilder")
            .field("config", &self.config)
            .field("abort", &self.abort)
            .field("has_output", &self.output.is_some())
            .finish_non_exhaustive()
    }
}

impl SupervisorBuilder {
    /// Start from a configuration.
    #[must_use]
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            config,
            abort: Signal::new("operator abort"),
            server_handler: Box::new(LoggingHandler),
            ir_handler: Box::new(LoggingHandler),
            dispatcher: Box::new(LoggingHandler),
            output: None,
            input: InputSource::None,
            heartbeat_interval: None,
            self_test_interval: None,
            worker_poll_interval: None,
        }
    }

    /// The abort signal the supervisor will watch.
    #[must_use]
    pub fn abort_signal(&self) -> Signal {
        self.abort.clone()
    }

    /// Business logic of the server worker.
    #[must_use]
    pub fn server_handler(mut self, handler: impl MessageHandler + 'static) -> Self {
        self.server_handler = Box::new(handler);
        self
    }

    /// Business logic of the IR worker.
    #[must_use]
    pub fn ir_handler(mut self, handler: impl MessageHandler + 'static) -> Self {
        self.ir_handler = Box::new(handler);
        self
    }

    /// Business logic for non-self-test messages reaching the supervisor.
    #[must_use]
    pub fn dispatcher(mut self, handler: impl MessageHandler + 'static) -> Self {
        self.dispatcher = Box::new(handler);
        self
    }

    /// Safety output to drive. Defaults to a [`RecordingOutput`].
    #[must_use]
    pub fn output(mut self, output: impl SafetyOutput + 'static) -> Self {
        self.output = Some(Box::new(output));
        self
    }

    /// Watch standard input for operator aborts.
    #[must_use]
    pub fn stdin_input(mut self) -> Self {
        self.input = InputSource::Stdin;
        self
    }

    /// Watch an arbitrary line source for operator aborts.
    #[must_use]
    pub fn input_reader(mut self, reader: impl BufRead + Send + 'static) -> Self {
        self.input = InputSource::Reader(Box::new(reader));
        self
    }

    /// Use a custom component as operator input. It is started after the
    /// workers and stopped last.
    #[must_use]
    pub fn input_worker(mut self, input: impl Worker + 'static) -> Self {
        self.input = InputSource::Custom(Box::new(input));
        self
    }

    /// Override the heartbeat timer period.
    #[must_use]
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = Some(interval);
        self
    }

    /// Override the self-test cycle length.
    #[must_use]
    pub fn self_test_interval(mut self, interval: Duration) -> Self {
        self.self_test_interval = Some(interval);
        self
    }

    /// Override the worker poll period.
    #[must_use]
    pub fn worker_poll_interval(mut self, interval: Duration) -> Self {
        self.worker_poll_interval = Some(interval);
        self
    }

    /// Construct every component and switch the safety output off.
    ///
    /// # Errors
    ///
    /// Fails fast on the first component that cannot be constructed.
    pub fn build(self) -> SupervisorResult<Supervisor> {
        let config = self.config;
        config.validate()?;
        let poll = self.worker_poll_interval.unwrap_or(config.worker_poll_interval());

        let server_signals = WorkerSignals::new(Member::Server.as_str());
        let ir_signals = WorkerSignals::new(Member::Ir.as_str());
        let heartbeat_due = Signal::new("heartbeat check due");

        let channels = SystemChannels::new(config.channel_capacity)?;

        let mut monitor = HeartbeatMonitor::new(config.heartbeat_debounce_ticks);
        monitor.add_worker(Member::Server.as_str(), server_signals.heartbeat.clone())?;
        monitor.add_worker(Member::Ir.as_str(), ir_signals.heartbeat.clone())?;

        let server = ChannelWorker::new(
            Member::Server,
            &channels,
            server_signals.clone(),
            poll,
            self.server_handler,
        )?;
        let ir = ChannelWorker::new(Member::Ir, &channels, ir_signals.clone(), poll, self.ir_handler)?;
        let input: Option<Box<dyn Worker>> = match self.input {
            InputSource::None => None,
            InputSource::Stdin => Some(Box::new(ConsoleInput::stdin(self.abort.clone(), poll))),
            InputSource::Reader(reader) => Some(Box::new(ConsoleInput::from_reader(
                reader,
                self.abort.clone(),
                poll,
            ))),
            InputSource::Custom(input) => Some(input),
        };

        let due = heartbeat_due.clone();
        let heartbeat_timer = PeriodicTimer::new(
            "heartbeat check",
            self.heartbeat_interval.unwrap_or(config.heartbeat_interval()),
            TimerPolicy::FailOpen,
            move || {
                due.set();
                Ok(())
            },
        )?;
        let self_test = ChannelSelfTest::new(
            &channels,
            self.self_test_interval.unwrap_or(config.self_test_interval()),
        )?;

        let mut output: Box<dyn SafetyOutput> = match self.output {
            Some(output) => output,
            None => Box::new(RecordingOutput::new()),
        };
        output.off()?;

        tracing::info!(
            channel_capacity = config.channel_capacity,
            debounce = config.heartbeat_debounce_ticks,
            "supervisor constructed"
        );

        Ok(Supervisor {
            outbox: Outbox::new(Member::Main, channels.clone()),
            config,
            abort: self.abort,
            server_signals,
            ir_signals,
            heartbeat_due,
            channels,
            monitor,
            server: Box::new(server),
            ir: Box::new(ir),
            input,
            heartbeat_timer,
            self_test,
            output: OutputSlot(output),
            dispatcher: BoxedHandler(self.dispatcher),
            errors: SupervisorErrors::default(),
            tick: 0,
            state: SupervisorState::Built,
        })
    }
}

struct OutputSlot(Box<dyn SafetyOutput>);

impl fmt::Debug for OutputSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SafetyOutput")
            .field("on", &self.0.is_on())
            .finish()
    }
}

/// Appliance supervisor.
#[derive(Debug)]
pub struct Supervisor {
    config: SupervisorConfig,
    abort: Signal,
    server_signals: WorkerSignals,
    ir_signals: WorkerSignals,
    heartbeat_due: Signal,
    channels: SystemChannels,
    monitor: HeartbeatMonitor,
    server: Box<dyn Worker>,
    ir: Box<dyn Worker>,
    input: Option<Box<dyn Worker>>,
    heartbeat_timer: PeriodicTimer,
    self_test: ChannelSelfTest,
    output: OutputSlot,
    dispatcher: BoxedHandler,
    outbox: Outbox,
    errors: SupervisorErrors,
    tick: u64,
    state: SupervisorState,
}

impl Supervisor {
    /// Start building a supervisor.
    #[must_use]
    pub fn builder(config: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(config)
    }

    /// Start workers, operator input and timers.
    ///
    /// # Errors
    ///
    /// Returns the first start failure after tearing down everything that
    /// already started.
    pub fn start(&mut self) -> SupervisorResult<()> {
        if self.state != SupervisorState::Built {
            return Err(SupervisorError::InvalidLifecycle(self.state.as_str()));
        }
        self.state = SupervisorState::Running;

        if let Err(e) = self.start_components() {
            tracing::error!(error = %e, "supervisor start failed, tearing down");
            self.shutdown_all();
            return Err(e);
        }
        tracing::info!("supervisor running");
        Ok(())
    }

    fn start_components(&mut self) -> SupervisorResult<()> {
        self.server.start()?;
        self.ir.start()?;
        if let Some(input) = self.input.as_mut() {
            input.start()?;
        }
        self.heartbeat_timer.start()?;
        self.self_test.start()?;
        Ok(())
    }

    /// Run one loop iteration.
    ///
    /// Failures inside the iteration are logged; the safety output is always
    /// re-evaluated.
    ///
    /// A stopped supervisor does nothing and reports [`TickOutcome::Abort`].
    pub fn tick(&mut self) -> TickOutcome {
        if self.state == SupervisorState::Stopped {
            return TickOutcome::Abort;
        }
        let tick = self.tick;
        tracing::trace!(tick, "supervisor tick");

        self.drain_inbound();
        self.self_test.advance(tick);
        self.check_heartbeats(tick);
        self.evaluate();

        self.tick = self.tick.saturating_add(1);
        if self.abort.is_set() {
            TickOutcome::Abort
        } else {
            TickOutcome::Continue
        }
    }

    fn drain_inbound(&mut self) {
        for _ in 0..self.config.inbound_batch_size {
            match self.channels.main.get() {
                Ok(Some(msg)) => {
                    if !self.self_test.observe(&msg) {
                        self.dispatcher.dispatch(&msg, &self.outbox);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "inbound channel unavailable");
                    break;
                }
            }
        }
    }

    fn check_heartbeats(&mut self, tick: u64) {
        if !self.heartbeat_due.wait(Some(Duration::ZERO)) {
            return;
        }
        if let Some(report) = self.monitor.run(tick) {
            self.errors.heartbeat = !report.is_healthy();
        }
        self.heartbeat_timer.restart();
    }

    /// Recompute the fault aggregate and drive the safety output.
    ///
    /// Returns the aggregate used for the decision. Once stopped, the output
    /// is held off and the last aggregate is returned unchanged.
    pub fn evaluate(&mut self) -> SupervisorErrors {
        if self.state == SupervisorState::Stopped {
            if self.output.0.is_on() {
                tracing::warn!("safety output found on after shutdown");
                if let Err(e) = self.output.0.off() {
                    tracing::error!(error = %e, "failed to switch safety output off");
                }
            }
            return self.errors;
        }
        let previous = self.errors;
        self.errors.server = self.server_signals.error.is_set();
        self.errors.ir = self.ir_signals.error.is_set();
        self.errors.test_main = self.self_test.is_failed(SelfTestTarget::Main);
        self.errors.test_server = self.self_test.is_failed(SelfTestTarget::Server);
        self.errors.test_ir = self.self_test.is_failed(SelfTestTarget::Ir);

        if self.errors != previous {
            if self.errors.is_error() {
                tracing::error!(tick = self.tick, faults = %self.errors, "faults active");
            } else {
                tracing::info!(tick = self.tick, "all faults cleared");
            }
        }

        if let Err(e) = self.output.0.set(!self.errors.is_error()) {
            tracing::error!(error = %e, requested_on = !self.errors.is_error(), "safety output command failed");
        }
        self.errors
    }

    /// Start if needed, tick until the operator aborts, then shut down.
    ///
    /// # Errors
    ///
    /// Returns an error if the supervisor cannot start.
    pub fn run(&mut self) -> SupervisorResult<()> {
        if self.state == SupervisorState::Built {
            self.start()?;
        }
        let interval = self.config.tick_interval();
        loop {
            if self.tick() == TickOutcome::Abort || self.abort.wait(Some(interval)) {
                tracing::info!(tick = self.tick, "abort requested");
                break;
            }
        }
        self.shutdown_all();
        Ok(())
    }

    /// Tear everything down in [`TEARDOWN_ORDER`]. Best effort and
    /// idempotent: a failing step is logged and the next one still runs.
    pub fn shutdown_all(&mut self) {
        if self.state == SupervisorState::Stopped {
            return;
        }
        self.state = SupervisorState::Stopped;
        tracing::info!("supervisor shutting down");

        for step in TEARDOWN_ORDER {
            tracing::debug!(step = step.as_str(), "teardown");
            self.teardown(step);
        }
        tracing::info!("supervisor stopped");
    }

    fn teardown(&mut self, step: TeardownStep) {
        match step {
            TeardownStep::SafetyOutput => {
                if let Err(e) = self.output.0.off() {
                    tracing::error!(error = %e, "failed to switch safety output off");
                }
            }
            TeardownStep::SelfTestTimer => {
                self.self_test.shutdown();
                if let Err(e) = self.self_test.join() {
                    tracing::warn!(error = %e, "self-test timer join failed");
                }
            }
            TeardownStep::HeartbeatTimer => {
                self.heartbeat_timer.shutdown();
                if let Err(e) = self.heartbeat_timer.join() {
                    tracing::warn!(error = %e, "heartbeat timer join failed");
                }
            }
            TeardownStep::IrWorker => stop_worker(&mut *self.ir),
            TeardownStep::ServerWorker => stop_worker(&mut *self.server),
            TeardownStep::Channels => {
                self.channels.close_all();
                let discarded = self.channels.join_all();
                tracing::debug!(discarded, "channels torn down");
            }
            TeardownStep::Input => {
                if let Some(input) = self.input.as_mut() {
                    stop_worker(&mut **input);
                }
            }
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Fault aggregate of the latest evaluation.
    #[must_use]
    pub fn errors(&self) -> SupervisorErrors {
        self.errors
    }

    /// Number of completed ticks.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Whether the safety output is on.
    #[must_use]
    pub fn output_is_on(&self) -> bool {
        self.output.0.is_on()
    }

    /// The abort signal.
    #[must_use]
    pub fn abort_signal(&self) -> Signal {
        self.abort.clone()
    }

    /// Signals shared with a worker.
    #[must_use]
    pub fn worker_signals(&self, member: Member) -> Option<&WorkerSignals> {
        match member {
            Member::Server => Some(&self.server_signals),
            Member::Ir => Some(&self.ir_signals),
            Member::Main | Member::Backend => None,
        }
    }

    /// The system channels.
    #[must_use]
    pub fn channels(&self) -> &SystemChannels {
        &self.channels
    }

    /// The channel self-test.
    #[must_use]
    pub fn self_test(&self) -> &ChannelSelfTest {
        &self.self_test
    }

    /// Control handle of the heartbeat timer.
    #[must_use]
    pub fn heartbeat_timer(&self) -> TimerHandle {
        self.heartbeat_timer.handle()
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }
}

fn stop_worker(worker: &mut dyn Worker) {
    worker.shutdown();
    if let Err(e) = worker.join() {
        tracing::warn!(worker = worker.name(), error = %e, "worker join failed");
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if self.state == SupervisorState::Running {
            self.shutdown_all();
        }
    }
}
