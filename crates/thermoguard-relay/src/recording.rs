//! Software safety output that records every command.
//!
//! Useful for tests and for running the supervisor without relay hardware.

use crate::error::{RelayError, RelayResult};
use crate::output::SafetyOutput;
use parking_lot::Mutex;
use std::sync::Arc;

/// A command issued to a [`RecordingOutput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputCommand {
    /// `on()` was called.
    On,
    /// `off()` was called.
    Off,
}

#[derive(Debug, Default)]
struct RecordingState {
    on: bool,
    commands: Vec<OutputCommand>,
    faulted: bool,
}

/// Shared view of a [`RecordingOutput`]'s history.
#[derive(Debug, Clone)]
pub struct OutputHistory {
    state: Arc<Mutex<RecordingState>>,
}

impl OutputHistory {
    /// Every command received, including redundant ones.
    #[must_use]
    pub fn commands(&self) -> Vec<OutputCommand> {
        self.state.lock().commands.clone()
    }

    /// Output level after each command that changed it.
    #[must_use]
    pub fn transitions(&self) -> Vec<bool> {
        let state = self.state.lock();
        let mut level = false;
        let mut transitions = Vec::new();
        for command in &state.commands {
            let next = *command == OutputCommand::On;
            if next != level {
                transitions.push(next);
                level = next;
            }
        }
        transitions
    }

    /// The most recent command.
    #[must_use]
    pub fn last_command(&self) -> Option<OutputCommand> {
        self.state.lock().commands.last().copied()
    }

    /// Whether the output is currently on.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.state.lock().on
    }

    /// Make every following command fail until cleared.
    pub fn set_faulted(&self, faulted: bool) {
        self.state.lock().faulted = faulted;
    }
}

/// In-memory safety output.
#[derive(Debug, Default)]
pub struct RecordingOutput {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingOutput {
    /// Create an output that starts off.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the command history.
    #[must_use]
    pub fn history(&self) -> OutputHistory {
        OutputHistory {
            state: Arc::clone(&self.state),
        }
    }

    fn command(&mut self, command: OutputCommand) -> RelayResult<()> {
        let mut state = self.state.lock();
        if state.faulted {
            return Err(RelayError::bus(0, 0, "recording output faulted"));
        }
        state.on = command == OutputCommand::On;
        state.commands.push(command);
        Ok(())
    }
}

impl SafetyOutput for RecordingOutput {
    fn on(&mut self) -> RelayResult<()> {
        self.command(OutputCommand::On)
    }

    fn off(&mut self) -> RelayResult<()> {
        self.command(OutputCommand::Off)
    }

    fn is_on(&self) -> bool {
        self.state.lock().on
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_skip_redundant_commands() -> RelayResult<()> {
        let mut output = RecordingOutput::new();
        let history = output.history();

        output.off()?;
        output.on()?;
        output.on()?;
        output.off()?;

        assert_eq!(history.commands().len(), 4);
        assert_eq!(history.transitions(), vec![true, false]);
        assert_eq!(history.last_command(), Some(OutputCommand::Off));
        assert!(!output.is_on());
        Ok(())
    }

    #[test]
    fn test_faulted_output_keeps_level() -> RelayResult<()> {
        let mut output = RecordingOutput::new();
        let history = output.history();
        output.on()?;

        history.set_faulted(true);
        assert!(output.off().is_err_and(|e| e.is_bus()));
        assert!(history.is_on());
        Ok(())
    }
}
