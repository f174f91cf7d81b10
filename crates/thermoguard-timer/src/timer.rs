//! One-shot periodic timer with explicit restart.
//!
//! A [`PeriodicTimer`] owns a dedicated thread. Once started it waits for its
//! interval, runs the callback once, then parks until [`PeriodicTimer::restart`]
//! re-arms it or [`PeriodicTimer::shutdown`] stops it.
//!
//! ## State Machine
//!
//! ```text
//! ┌──────┐ start/restart ┌───────┐ interval ┌────────┐
//! │ Idle │──────────────►│ Armed │─────────►│ Firing │
//! └──────┘               └───────┘          └────────┘
//!    ▲                       │ shutdown       │    │ Err + FailStop
//!    │         callback done │                │    ▼
//!    └───────────────────────┼────────────────┘ ┌────────┐
//!                            ▼                  │ Halted │
//!                       ┌─────────┐             └────────┘
//!                       │ Stopped │
//!                       └─────────┘
//! ```
//!
//! An armed wait is cut short by shutdown and the callback does not fire.
//! Callbacks run synchronously on the timer thread with no lock held.

use crate::error::{TimerError, TimerResult};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Minimum timer name length in characters.
pub const MIN_NAME_LEN: usize = 3;
/// Maximum timer name length in characters.
pub const MAX_NAME_LEN: usize = 50;

/// Callback invoked when the timer fires.
pub type TimerCallback = Box<dyn FnMut() -> anyhow::Result<()> + Send + 'static>;

/// What a callback error does to the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerPolicy {
    /// Halt the timer permanently.
    FailStop,
    /// Log the error and keep serving restarts.
    FailOpen,
}

/// Observable timer phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerPhase {
    /// Not started, or waiting for a restart after firing.
    Idle,
    /// Waiting for the interval to elapse.
    Armed,
    /// Running the callback.
    Firing,
    /// Exited after shutdown.
    Stopped,
    /// Exited after a callback error under [`TimerPolicy::FailStop`].
    Halted,
}

impl TimerPhase {
    /// Whether the timer thread has exited.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Halted)
    }
}

#[derive(Debug)]
struct TimerState {
    phase: TimerPhase,
    restart_requested: bool,
    shutdown_requested: bool,
    fire_count: u64,
}

#[derive(Debug)]
struct TimerShared {
    name: String,
    interval: Duration,
    policy: TimerPolicy,
    state: Mutex<TimerState>,
    cond: Condvar,
}

impl TimerShared {
    fn set_phase(&self, state: &mut MutexGuard<'_, TimerState>, phase: TimerPhase) {
        state.phase = phase;
        self.cond.notify_all();
    }

    fn restart(&self) {
        let mut state = self.state.lock();
        if state.phase.is_terminal() {
            tracing::debug!(timer = %self.name, phase = ?state.phase, "restart ignored");
            return;
        }
        state.restart_requested = true;
        self.cond.notify_all();
    }

    fn shutdown(&self) {
        let mut state = self.state.lock();
        state.shutdown_requested = true;
        self.cond.notify_all();
    }

    /// Returns `false` if shutdown was requested before the interval elapsed.
    fn wait_armed(&self, state: &mut MutexGuard<'_, TimerState>) -> bool {
        let deadline = Instant::now().checked_add(self.interval);
        while !state.shutdown_requested {
            match deadline {
                Some(deadline) => {
                    if self.cond.wait_until(state, deadline).timed_out() {
                        break;
                    }
                }
                None => self.cond.wait(state),
            }
        }
        !state.shutdown_requested
    }

    /// Returns `false` if shutdown was requested instead of a restart.
    fn wait_restart(&self, state: &mut MutexGuard<'_, TimerState>) -> bool {
        while !state.restart_requested && !state.shutdown_requested {
            self.cond.wait(state);
        }
        !state.shutdown_requested
    }

    fn run(&self, mut callback: TimerCallback) {
        tracing::debug!(timer = %self.name, interval_ms = self.interval.as_millis(), "timer thread started");
        let mut state = self.state.lock();

        let final_phase = loop {
            if state.shutdown_requested {
                break TimerPhase::Stopped;
            }
            state.restart_requested = false;
            self.set_phase(&mut state, TimerPhase::Armed);
            if !self.wait_armed(&mut state) {
                break TimerPhase::Stopped;
            }

            self.set_phase(&mut state, TimerPhase::Firing);
            let outcome = MutexGuard::unlocked(&mut state, || callback());
            state.fire_count = state.fire_count.saturating_add(1);

            if let Err(e) = outcome {
                tracing::error!(timer = %self.name, policy = ?self.policy, error = %format!("{e:#}"), "timer callback failed");
                if self.policy == TimerPolicy::FailStop {
                    break TimerPhase::Halted;
                }
            }

            self.set_phase(&mut state, TimerPhase::Idle);
            if !self.wait_restart(&mut state) {
                break TimerPhase::Stopped;
            }
        };

        state.restart_requested = false;
        state.shutdown_requested = false;
        self.set_phase(&mut state, final_phase);
        tracing::debug!(timer = %self.name, phase = ?final_phase, "timer thread exited");
    }
}

/// Cloneable control handle for a running [`PeriodicTimer`].
#[derive(Debug, Clone)]
pub struct TimerHandle {
    shared: Arc<TimerShared>,
}

impl TimerHandle {
    /// Timer name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Re-arm the timer for another interval. Ignored once the timer exited.
    pub fn restart(&self) {
        self.shared.restart();
    }

    /// Ask the timer thread to exit.
    pub fn shutdown(&self) {
        self.shared.shutdown();
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> TimerPhase {
        self.shared.state.lock().phase
    }

    /// How many times the callback ran.
    #[must_use]
    pub fn fire_count(&self) -> u64 {
        self.shared.state.lock().fire_count
    }

    /// Block until the callback ran at least `count` times and returned.
    ///
    /// Returns `false` on timeout or if the timer exited first.
    pub fn wait_for_fires(&self, count: u64, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.shared.state.lock();
        let reached = |s: &TimerState| s.fire_count >= count && s.phase != TimerPhase::Firing;
        loop {
            if reached(&state) {
                return true;
            }
            if state.phase.is_terminal() {
                return false;
            }
            match deadline {
                Some(deadline) => {
                    if self.shared.cond.wait_until(&mut state, deadline).timed_out() {
                        return reached(&state);
                    }
                }
                None => self.shared.cond.wait(&mut state),
            }
        }
    }
}

/// Periodic timer that fires once per arm and must be restarted explicitly.
pub struct PeriodicTimer {
    shared: Arc<TimerShared>,
    callback: Option<TimerCallback>,
    thread: Option<JoinHandle<()>>,
}

impl fmt::Debug for PeriodicTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeriodicTimer")
            .field("name", &self.shared.name)
            .field("interval", &self.shared.interval)
            .field("policy", &self.shared.policy)
            .field("started", &self.callback.is_none())
            .finish_non_exhaustive()
    }
}

impl PeriodicTimer {
    /// Create an idle timer.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::InvalidName`] unless the name is 3 to 50
    /// characters long.
    pub fn new<F>(
        name: impl Into<String>,
        interval: Duration,
        policy: TimerPolicy,
        callback: F,
    ) -> TimerResult<Self>
    where
        F: FnMut() -> anyhow::Result<()> + Send + 'static,
    {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            shared: Arc::new(TimerShared {
                name,
                interval,
                policy,
                state: Mutex::new(TimerState {
                    phase: TimerPhase::Idle,
                    restart_requested: false,
                    shutdown_requested: false,
                    fire_count: 0,
                }),
                cond: Condvar::new(),
            }),
            callback: Some(Box::new(callback)),
            thread: None,
        })
    }

    /// Timer name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Configured interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.shared.interval
    }

    /// Configured error policy.
    #[must_use]
    pub fn policy(&self) -> TimerPolicy {
        self.shared.policy
    }

    /// Spawn the timer thread and arm it immediately.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::AlreadyStarted`] on a second call and
    /// [`TimerError::Spawn`] if the OS refuses the thread.
    pub fn start(&mut self) -> TimerResult<()> {
        let callback = self
            .callback
            .take()
            .ok_or_else(|| TimerError::AlreadyStarted(self.shared.name.clone()))?;
        let shared = Arc::clone(&self.shared);
        let handle = std::thread::Builder::new()
            .name(format!("timer-{}", self.shared.name))
            .spawn(move || shared.run(callback))
            .map_err(|e| {
                let mut state = self.shared.state.lock();
                self.shared.set_phase(&mut state, TimerPhase::Stopped);
                TimerError::spawn(self.shared.name.as_str(), e)
            })?;
        self.thread = Some(handle);
        Ok(())
    }

    /// See [`TimerHandle::restart`].
    pub fn restart(&self) {
        self.shared.restart();
    }

    /// See [`TimerHandle::shutdown`].
    pub fn shutdown(&self) {
        self.shared.shutdown();
    }

    /// Wait for the timer thread to exit.
    ///
    /// Returns immediately if the timer never started or was already joined.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::Panicked`] if the callback panicked.
    pub fn join(&mut self) -> TimerResult<()> {
        match self.thread.take() {
            Some(handle) => handle
                .join()
                .map_err(|payload| TimerError::panicked(self.shared.name.clone(), &*payload)),
            None => Ok(()),
        }
    }

    /// Whether the thread was started and not yet joined.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> TimerPhase {
        self.shared.state.lock().phase
    }

    /// How many times the callback ran.
    #[must_use]
    pub fn fire_count(&self) -> u64 {
        self.shared.state.lock().fire_count
    }

    /// Cloneable control handle.
    #[must_use]
    pub fn handle(&self) -> TimerHandle {
        TimerHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.shutdown();
            if let Err(e) = self.join() {
                tracing::warn!(timer = %self.shared.name, error = %e, "timer join failed on drop");
            }
        }
    }
}

fn validate_name(name: &str) -> TimerResult<()> {
    let len = name.chars().count();
    if (MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) {
        Ok(())
    } else {
        Err(TimerError::InvalidName {
            name: name.to_owned(),
            len,
            min: MIN_NAME_LEN,
            max: MAX_NAME_LEN,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_bounds() {
        assert!(matches!(validate_name("abc"), Ok(())));
        assert!(matches!(validate_name(&"x".repeat(50)), Ok(())));
        assert!(matches!(validate_name("ab"), Err(TimerError::InvalidName { len: 2, .. })));
        assert!(matches!(validate_name(&"x".repeat(51)), Err(TimerError::InvalidName { len: 51, .. })));
    }

    #[test]
    fn test_phase_terminal() {
        assert!(TimerPhase::Stopped.is_terminal());
        assert!(TimerPhase::Halted.is_terminal());
        assert!(!TimerPhase::Armed.is_terminal());
        assert!(!TimerPhase::Idle.is_terminal());
    }

    #[test]
    fn test_unstarted_timer_joins_immediately() -> TimerResult<()> {
        let mut timer =
            PeriodicTimer::new("idle timer", Duration::from_secs(60), TimerPolicy::FailOpen, || Ok(()))?;
        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert!(!timer.is_running());
        timer.join()
    }
}
