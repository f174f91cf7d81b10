//! Shared boolean signals with wait-and-consume semantics.
//!
//! A [`Signal`] is the coordination primitive every other component is built
//! from: shutdown requests, heartbeats, worker error flags and timer cycle
//! boundaries are all signals.
//!
//! # Consume on wait
//!
//! A successful [`Signal::wait`] clears the flag before returning. One-shot
//! conditions ("a heartbeat arrived", "the self-test cycle expired") are
//! therefore observed exactly once by exactly one waiter.
//!
//! # Failure model
//!
//! The flag lives behind a `parking_lot` mutex, which cannot be poisoned, so
//! every operation is infallible. Callers should still treat signals as
//! best-effort state and re-check after acting on them.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct SignalState {
    flag: Mutex<bool>,
    cond: Condvar,
}

/// Shared boolean flag with set/clear/wait-with-timeout semantics.
///
/// Cloning a `Signal` yields another handle to the same flag.
#[derive(Debug, Clone)]
pub struct Signal {
    name: Arc<str>,
    state: Arc<SignalState>,
}

impl Signal {
    /// Create a new cleared signal. The name is only used for diagnostics.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name: String = name.into();
        Self {
            name: Arc::from(name),
            state: Arc::new(SignalState::default()),
        }
    }

    /// Diagnostic name of the signal.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the flag and wake every waiter. Idempotent.
    pub fn set(&self) {
        let mut flag = self.state.flag.lock();
        *flag = true;
        self.state.cond.notify_all();
    }

    /// Clear the flag. Idempotent.
    pub fn clear(&self) {
        *self.state.flag.lock() = false;
    }

    /// Non-blocking snapshot of the flag.
    #[must_use]
    pub fn is_set(&self) -> bool {
        *self.state.flag.lock()
    }

    /// Wait until the flag is set or `timeout` elapses.
    ///
    /// `None` waits without bound. `Some(Duration::ZERO)` polls.
    ///
    /// Returns `true` iff the flag was set during the wait; in that case the
    /// flag is cleared before returning.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        let mut flag = self.state.flag.lock();

        match timeout {
            Some(timeout) if timeout.is_zero() => {}
            Some(timeout) => {
                // An unrepresentable deadline degrades to an unbounded wait.
                let deadline = Instant::now().checked_add(timeout);
                while !*flag {
                    match deadline {
                        Some(deadline) => {
                            if self.state.cond.wait_until(&mut flag, deadline).timed_out() {
                                break;
                            }
                        }
                        None => self.state.cond.wait(&mut flag),
                    }
                }
            }
            None => {
                tracing::trace!(signal = %self.name, "unbounded wait");
                while !*flag {
                    self.state.cond.wait(&mut flag);
                }
            }
        }

        let was_set = *flag;
        *flag = false;
        was_set
    }

    /// Returns `true` if both handles refer to the same flag.
    #[must_use]
    pub fn same_as(&self, other: &Signal) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

/// The signals a supervised worker shares with its supervisor.
#[derive(Debug, Clone)]
pub struct WorkerSignals {
    /// Set by the supervisor to ask the worker to stop.
    pub shutdown: Signal,
    /// Re-asserted by the worker on every loop iteration.
    pub heartbeat: Signal,
    /// Held set by the worker while it cannot answer self-test probes.
    pub error: Signal,
}

impl WorkerSignals {
    /// Create the signal bundle for the named worker.
    #[must_use]
    pub fn new(worker: &str) -> Self {
        Self {
            shutdown: Signal::new(format!("{worker} shutdown")),
            heartbeat: Signal::new(format!("{worker} heartbeat")),
            error: Signal::new(format!("{worker} error")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_set_clear_idempotent() {
        let signal = Signal::new("test");
        assert!(!signal.is_set());

        signal.set();
        signal.set();
        assert!(signal.is_set());

        signal.clear();
        signal.clear();
        assert!(!signal.is_set());
    }

    #[test]
    fn test_wait_consumes() {
        let signal = Signal::new("test");
        signal.set();

        assert!(signal.wait(Some(Duration::ZERO)));
        assert!(!signal.is_set());
        assert!(!signal.wait(Some(Duration::ZERO)));
    }

    #[test]
    fn test_wait_times_out() {
        let signal = Signal::new("test");
        let start = Instant::now();
        assert!(!signal.wait(Some(Duration::from_millis(30))));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_wait_wakes_on_set_from_other_thread() {
        let signal = Signal::new("test");
        let setter = signal.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            setter.set();
        });

        assert!(signal.wait(Some(Duration::from_secs(5))));
        assert!(matches!(handle.join(), Ok(())));
        assert!(!signal.is_set());
    }

    #[test]
    fn test_clones_share_state() {
        let a = Signal::new("shared");
        let b = a.clone();
        let c = Signal::new("shared");

        a.set();
        assert!(b.is_set());
        assert!(!c.is_set());
        assert!(a.same_as(&b));
        assert!(!a.same_as(&c));
    }

    #[test]
    fn test_worker_signal_names() {
        let signals = WorkerSignals::new("server");
        assert_eq!(signals.shutdown.name(), "server shutdown");
        assert_eq!(signals.heartbeat.name(), "server heartbeat");
        assert_eq!(signals.error.name(), "server error");
    }
}
