//! Debounced heartbeat liveness checks.
//!
//! Every monitored worker re-asserts its heartbeat [`Signal`] on each loop
//! iteration. The monitor consumes those signals, but only once the tick
//! counter has moved more than `debounce` ticks past the previous check, so a
//! worker gets a whole window to prove it is alive.

use crate::error::{WatchdogError, WatchdogResult};
use std::time::Duration;
use thermoguard_ipc::Signal;

/// Default number of ticks between two heartbeat checks.
pub const DEFAULT_DEBOUNCE_TICKS: u64 = 5;

/// Outcome of one heartbeat check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatReport {
    /// Tick at which the check ran.
    pub tick: u64,
    /// Workers whose heartbeat was not set since the previous check.
    pub failed: Vec<String>,
}

impl HeartbeatReport {
    /// Whether every worker was alive.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.failed.is_empty()
    }

    /// Whether the named worker missed its heartbeat.
    #[must_use]
    pub fn is_failed(&self, worker: &str) -> bool {
        self.failed.iter().any(|w| w == worker)
    }
}

#[derive(Debug)]
struct MonitoredWorker {
    name: String,
    heartbeat: Signal,
    consecutive_failures: u32,
}

/// Tick-debounced heartbeat checker.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    debounce: u64,
    last_checked: u64,
    workers: Vec<MonitoredWorker>,
}

impl Default for HeartbeatMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_TICKS)
    }
}

impl HeartbeatMonitor {
    /// Create a monitor that checks once the tick moved more than `debounce`.
    #[must_use]
    pub fn new(debounce: u64) -> Self {
        Self {
            debounce,
            last_checked: 0,
            workers: Vec::new(),
        }
    }

    /// Monitor the heartbeat of a named worker.
    ///
    /// # Errors
    ///
    /// Returns [`WatchdogError::DuplicateWorker`] if the name is taken.
    pub fn add_worker(&mut self, name: impl Into<String>, heartbeat: Signal) -> WatchdogResult<()> {
        let name = name.into();
        if self.workers.iter().any(|w| w.name == name) {
            return Err(WatchdogError::duplicate_worker(name));
        }
        tracing::debug!(worker = %name, "heartbeat monitored");
        self.workers.push(MonitoredWorker {
            name,
            heartbeat,
            consecutive_failures: 0,
        });
        Ok(())
    }

    /// Check heartbeats if the debounce window elapsed.
    ///
    /// Returns `None` when no check ran; the previous verdict then stands.
    pub fn run(&mut self, tick: u64) -> Option<HeartbeatReport> {
        if tick.abs_diff(self.last_checked) <= self.debounce {
            return None;
        }
        self.last_checked = tick;

        let mut failed = Vec::new();
        for worker in &mut self.workers {
            if worker.heartbeat.wait(Some(Duration::ZERO)) {
                if worker.consecutive_failures > 0 {
                    tracing::info!(worker = %worker.name, tick, "heartbeat recovered");
                }
                worker.consecutive_failures = 0;
            } else {
                worker.consecutive_failures = worker.consecutive_failures.saturating_add(1);
                tracing::error!(
                    worker = %worker.name,
                    tick,
                    consecutive = worker.consecutive_failures,
                    "heartbeat missed"
                );
                failed.push(worker.name.clone());
            }
        }

        Some(HeartbeatReport { tick, failed })
    }

    /// Tick of the most recent check.
    #[must_use]
    pub fn last_checked_tick(&self) -> u64 {
        self.last_checked
    }

    /// Configured debounce window in ticks.
    #[must_use]
    pub fn debounce(&self) -> u64 {
        self.debounce
    }

    /// Consecutive missed checks of the named worker.
    #[must_use]
    pub fn consecutive_failures(&self, worker: &str) -> Option<u32> {
        self.workers
            .iter()
            .find(|w| w.name == worker)
            .map(|w| w.consecutive_failures)
    }

    /// Names of the monitored workers.
    pub fn worker_names(&self) -> impl Iterator<Item = &str> {
        self.workers.iter().map(|w| w.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_duplicate_worker_rejected() -> TestResult {
        let mut monitor = HeartbeatMonitor::default();
        monitor.add_worker("server", Signal::new("hb"))?;
        let err = monitor.add_worker("server", Signal::new("hb2"));
        assert!(matches!(err, Err(WatchdogError::DuplicateWorker(_))));
        assert_eq!(monitor.worker_names().count(), 1);
        Ok(())
    }

    #[test]
    fn test_alive_worker_passes_and_is_consumed() -> TestResult {
        let heartbeat = Signal::new("server heartbeat");
        let mut monitor = HeartbeatMonitor::new(1);
        monitor.add_worker("server", heartbeat.clone())?;

        heartbeat.set();
        let report = monitor.run(2).ok_or("check must run")?;
        assert!(report.is_healthy());
        assert!(!heartbeat.is_set());

        let report = monitor.run(4).ok_or("check must run")?;
        assert!(report.is_failed("server"));
        assert_eq!(monitor.consecutive_failures("server"), Some(1));
        Ok(())
    }

    #[test]
    fn test_backwards_tick_still_counts_distance() {
        let mut monitor = HeartbeatMonitor::new(5);
        assert!(monitor.run(100).is_some());
        assert!(monitor.run(97).is_none());
        assert!(monitor.run(90).is_some());
        assert_eq!(monitor.last_checked_tick(), 90);
    }
}
