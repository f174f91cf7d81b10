//! Channel self-test: probe every channel and expect a reply within a cycle.
//!
//! Each cycle the supervisor puts a probe on the MAIN, SERVER and IR
//! channels. MAIN loops its probe back to itself; the workers answer with an
//! acknowledgment on MAIN. When the cycle timer fires, every target that did
//! not answer is marked failed. Targets are tracked independently, so one
//! silent worker never taints the others.
//!
//! Every request carries a correlation id and only an acknowledgment echoing
//! the id of the target's outstanding request counts. A request that went
//! unanswered stays outstanding and is not sent again until it is answered,
//! unless its answer may have been dropped on a full MAIN channel.
//!
//! A probe that cannot even be enqueued fails its target immediately.

use crate::error::WatchdogResult;
use std::fmt;
use std::time::Duration;
use thermoguard_ipc::{
    ChannelReader, ChannelWriter, Member, Message, MessageHeader, PutErrorKind, SelfTestEvent,
    Signal, SystemChannels,
};
use thermoguard_timer::{PeriodicTimer, TimerHandle, TimerPolicy};

/// Default length of one self-test cycle.
pub const DEFAULT_SELF_TEST_INTERVAL: Duration = Duration::from_secs(10);

/// A channel under self-test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelfTestTarget {
    /// The supervisor's own inbound channel.
    Main,
    /// The server worker channel.
    Server,
    /// The IR worker channel.
    Ir,
}

impl SelfTestTarget {
    /// Every target in probe order.
    pub const ALL: [Self; 3] = [Self::Main, Self::Server, Self::Ir];

    /// Member owning the probed channel.
    #[must_use]
    pub const fn member(self) -> Member {
        match self {
            Self::Main => Member::Main,
            Self::Server => Member::Server,
            Self::Ir => Member::Ir,
        }
    }

    /// Tag of the probe sent to this target.
    #[must_use]
    pub const fn probe_event(self) -> SelfTestEvent {
        match self {
            Self::Main => SelfTestEvent::ReqFromMainToMain,
            Self::Server => SelfTestEvent::ReqFromMainToServer,
            Self::Ir => SelfTestEvent::ReqFromMainToIr,
        }
    }

    /// Tag that proves this target answered.
    #[must_use]
    pub const fn ack_event(self) -> SelfTestEvent {
        match self {
            Self::Main => SelfTestEvent::ReqFromMainToMain,
            Self::Server => SelfTestEvent::AckFromServerToMain,
            Self::Ir => SelfTestEvent::AckFromIrToMain,
        }
    }

    /// Target whose acknowledgment carries `tag`.
    #[must_use]
    pub fn from_ack(tag: SelfTestEvent) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.ack_event() == tag)
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.member().as_str()
    }
}

impl fmt::Display for SelfTestTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a target failed its self-test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfTestFailure {
    /// The probe could not be enqueued on the target channel.
    ProbeRejected {
        /// Rejection reason reported by the channel.
        reason: PutErrorKind,
    },
    /// No acknowledgment arrived within the cycle.
    AckMissing,
    /// No acknowledgment arrived and the MAIN channel rejected puts as full
    /// during the cycle, so the answer was most likely lost on the way back.
    AckDroppedInbound,
}

impl fmt::Display for SelfTestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProbeRejected { reason } => write!(f, "probe rejected ({})", reason.as_str()),
            Self::AckMissing => f.write_str("acknowledgment missing"),
            Self::AckDroppedInbound => f.write_str("acknowledgment dropped on full inbound channel"),
        }
    }
}

/// Per-target self-test bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueTestRecord {
    /// A request is outstanding for this target.
    pub started: bool,
    /// The outstanding request was acknowledged in the current cycle.
    pub done: bool,
    /// The target failed its most recent verdict.
    pub error: bool,
    /// Tick at which the current cycle began for this target.
    pub last_cycle_start_counter: u64,
    /// Diagnostic for the current failure.
    pub last_failure: Option<SelfTestFailure>,
    /// Correlation id of the outstanding request.
    pub request_id: Option<String>,
}

impl QueueTestRecord {
    fn fail(&mut self, failure: SelfTestFailure) {
        self.error = true;
        self.last_failure = Some(failure);
    }

    fn pass(&mut self) {
        self.error = false;
        self.last_failure = None;
    }
}

#[derive(Debug, Default)]
struct Records {
    main: QueueTestRecord,
    server: QueueTestRecord,
    ir: QueueTestRecord,
}

impl Records {
    fn get(&self, target: SelfTestTarget) -> &QueueTestRecord {
        match target {
            SelfTestTarget::Main => &self.main,
            SelfTestTarget::Server => &self.server,
            SelfTestTarget::Ir => &self.ir,
        }
    }

    fn get_mut(&mut self, target: SelfTestTarget) -> &mut QueueTestRecord {
        match target {
            SelfTestTarget::Main => &mut self.main,
            SelfTestTarget::Server => &mut self.server,
            SelfTestTarget::Ir => &mut self.ir,
        }
    }
}

#[derive(Debug)]
struct Probe {
    target: SelfTestTarget,
    writer: ChannelWriter,
    rejected: bool,
}

/// Self-test driver owned by the supervisor.
#[derive(Debug)]
pub struct ChannelSelfTest {
    probes: [Probe; 3],
    inbound: ChannelReader,
    inbound_full_at_cycle_start: u64,
    records: Records,
    next_request: u64,
    cycle_open: bool,
    cycle_due: Signal,
    timer: PeriodicTimer,
}

impl ChannelSelfTest {
    /// Create a self-test over the given channels with a cycle of `interval`.
    ///
    /// # Errors
    ///
    /// Fails only if the cycle timer cannot be constructed.
    pub fn new(channels: &SystemChannels, interval: Duration) -> WatchdogResult<Self> {
        let cycle_due = Signal::new("self-test cycle due");
        let due = cycle_due.clone();
        let timer = PeriodicTimer::new("channel self-test", interval, TimerPolicy::FailOpen, move || {
            due.set();
            Ok(())
        })?;

        Ok(Self {
            probes: SelfTestTarget::ALL.map(|target| Probe {
                target,
                writer: channels.channel_for(target.member()).writer(),
                rejected: false,
            }),
            inbound: channels.main.reader(),
            inbound_full_at_cycle_start: 0,
            records: Records::default(),
            next_request: 0,
            cycle_open: false,
            cycle_due,
            timer,
        })
    }

    /// Start the cycle timer.
    ///
    /// # Errors
    ///
    /// Returns the timer error if it was already started or cannot spawn.
    pub fn start(&mut self) -> WatchdogResult<()> {
        self.timer.start()?;
        Ok(())
    }

    /// Drive the self-test from the supervisor tick.
    ///
    /// Opens the first cycle on the first call, then closes and reopens a
    /// cycle whenever the cycle timer fired. Returns the targets that failed
    /// at a cycle boundary, if one was crossed.
    pub fn advance(&mut self, tick: u64) -> Option<Vec<SelfTestTarget>> {
        if !self.cycle_open {
            self.begin_cycle(tick);
            return None;
        }
        if self.cycle_due.wait(Some(Duration::ZERO)) {
            return Some(self.on_cycle_boundary(tick));
        }
        None
    }

    /// Close the current cycle, restart the timer and open the next cycle.
    ///
    /// Returns the targets that failed this cycle.
    pub fn on_cycle_boundary(&mut self, tick: u64) -> Vec<SelfTestTarget> {
        let inbound_full = self.inbound.stats().rejected_full;
        let inbound_dropped = inbound_full > self.inbound_full_at_cycle_start;
        let mut failed = Vec::new();

        for probe in &mut self.probes {
            let target = probe.target;
            let record = self.records.get_mut(target);
            if record.done {
                record.pass();
                record.started = false;
            } else if probe.rejected {
                record.started = false;
            } else {
                let failure = if inbound_dropped {
                    SelfTestFailure::AckDroppedInbound
                } else {
                    SelfTestFailure::AckMissing
                };
                record.fail(failure);
                // An answer lost on MAIN will never arrive, so that request is replaced.
                record.started = failure == SelfTestFailure::AckMissing;
                tracing::error!(
                    target = %target,
                    tick,
                    started_at = record.last_cycle_start_counter,
                    failure = %failure,
                    outstanding = record.started,
                    "channel self-test failed"
                );
            }
            if record.error {
                failed.push(target);
            }
            record.done = false;
            probe.rejected = false;
        }

        self.timer.restart();
        self.begin_cycle(tick);
        failed
    }

    fn begin_cycle(&mut self, tick: u64) {
        self.cycle_open = true;
        self.inbound_full_at_cycle_start = self.inbound.stats().rejected_full;

        for probe in &mut self.probes {
            let record = self.records.get_mut(probe.target);
            if record.started {
                continue;
            }
            self.next_request = self.next_request.wrapping_add(1);
            let id = format!("self-test-{}-{}", probe.target, self.next_request);
            record.started = true;
            record.done = false;
            record.last_cycle_start_counter = tick;
            record.request_id = Some(id.clone());

            let header = MessageHeader::new(Member::Main, probe.target.member(), probe.target.probe_event())
                .with_id(id);
            if let Err(e) = probe.writer.put(Message::new(header)) {
                probe.rejected = true;
                let failure = SelfTestFailure::ProbeRejected { reason: e.kind() };
                record.fail(failure);
                tracing::error!(target = %probe.target, tick, failure = %failure, "channel self-test probe failed");
            }
        }
    }

    /// Consume an inbound MAIN-channel message if it is self-test traffic.
    ///
    /// Returns `true` if the message belonged to the self-test.
    pub fn observe(&mut self, msg: &Message) -> bool {
        let Some(tag) = msg.event().as_self_test() else {
            return false;
        };
        if msg.dest() != Member::Main {
            tracing::warn!(event = %tag, dest = %msg.dest(), "self-test message on wrong channel");
            return true;
        }
        if let Some(target) = SelfTestTarget::from_ack(tag) {
            let id = msg.header().id.as_str();
            let record = self.records.get_mut(target);
            if record.started && record.request_id.as_deref() == Some(id) {
                record.done = true;
            } else {
                tracing::debug!(target = %target, id, "stale self-test acknowledgment ignored");
            }
        }
        true
    }

    /// Whether the target failed its most recent verdict.
    #[must_use]
    pub fn is_failed(&self, target: SelfTestTarget) -> bool {
        self.records.get(target).error
    }

    /// Bookkeeping for one target.
    #[must_use]
    pub fn record(&self, target: SelfTestTarget) -> &QueueTestRecord {
        self.records.get(target)
    }

    /// Targets currently failed.
    #[must_use]
    pub fn failed_targets(&self) -> Vec<SelfTestTarget> {
        SelfTestTarget::ALL
            .into_iter()
            .filter(|t| self.is_failed(*t))
            .collect()
    }

    /// Control handle of the cycle timer.
    #[must_use]
    pub fn timer_handle(&self) -> TimerHandle {
        self.timer.handle()
    }

    /// Ask the cycle timer to stop.
    pub fn shutdown(&self) {
        self.timer.shutdown();
    }

    /// Wait for the cycle timer thread to exit.
    ///
    /// # Errors
    ///
    /// Returns the timer error if its thread panicked.
    pub fn join(&mut self) -> WatchdogResult<()> {
        self.timer.join()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_tags() {
        assert_eq!(SelfTestTarget::Main.ack_event(), SelfTestTarget::Main.probe_event());
        assert_eq!(
            SelfTestTarget::from_ack(SelfTestEvent::AckFromServerToMain),
            Some(SelfTestTarget::Server)
        );
        assert_eq!(SelfTestTarget::from_ack(SelfTestEvent::ReqFromMainToIr), None);
        for target in SelfTestTarget::ALL {
            assert_eq!(SelfTestEvent::probe_for(target.member()), Some(target.probe_event()));
            assert_eq!(SelfTestEvent::reply_for(target.member()), Some(target.ack_event()));
        }
    }

    #[test]
    fn test_failure_display() {
        let failure = SelfTestFailure::ProbeRejected {
            reason: PutErrorKind::Full,
        };
        assert_eq!(failure.to_string(), "probe rejected (full)");
    }
}
