//! Aggregated fault state driving the safety output.

use std::fmt;

/// One flag per independent fault source.
///
/// The safety output is on exactly when no flag is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SupervisorErrors {
    /// A worker missed its heartbeat at the latest check.
    pub heartbeat: bool,
    /// The server worker reported an error.
    pub server: bool,
    /// The IR worker reported an error.
    pub ir: bool,
    /// The MAIN channel failed its self-test.
    pub test_main: bool,
    /// The SERVER channel failed its self-test.
    pub test_server: bool,
    /// The IR channel failed its self-test.
    pub test_ir: bool,
}

impl SupervisorErrors {
    /// Whether any fault is active.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.active_faults().next().is_some()
    }

    /// Names of the active faults.
    pub fn active_faults(&self) -> impl Iterator<Item = &'static str> {
        [
            ("heartbeat", self.heartbeat),
            ("server", self.server),
            ("ir", self.ir),
            ("test_main", self.test_main),
            ("test_server", self.test_server),
            ("test_ir", self.test_ir),
        ]
        .into_iter()
        .filter_map(|(name, active)| active.then_some(name))
    }
}

impl fmt::Display for SupervisorErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let faults: Vec<&str> = self.active_faults().collect();
        if faults.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&faults.join(", "))
        }
    }
}
