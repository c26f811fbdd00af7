// crates/trustgate-daemon/src/state.rs
//
// Lifecycle state machine for the Trustgate daemon.
//
// Valid transitions:
//   Starting -> Serving
//   Any state -> ShuttingDown

use std::fmt;

/// Lifecycle states of the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    /// Loading configuration and opening storage.
    Starting,
    /// The API server is accepting requests.
    Serving,
    ShuttingDown,
}

impl fmt::Display for DaemonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaemonState::Starting => write!(f, "Starting"),
            DaemonState::Serving => write!(f, "Serving"),
            DaemonState::ShuttingDown => write!(f, "ShuttingDown"),
        }
    }
}

pub struct DaemonStateMachine {
    pub current: DaemonState,
}

impl DaemonStateMachine {
    pub fn new() -> Self {
        Self {
            current: DaemonState::Starting,
        }
    }

    /// Attempt to transition to a new state.
    ///
    /// Returns an error if the transition is not valid.
    pub fn transition(&mut self, new_state: DaemonState) -> Result<(), String> {
        let valid = matches!(
            (self.current, new_state),
            (_, DaemonState::ShuttingDown) | (DaemonState::Starting, DaemonState::Serving)
        );

        if valid {
            tracing::info!("State transition: {} -> {}", self.current, new_state);
            self.current = new_state;
            Ok(())
        } else {
            Err(format!(
                "Invalid state transition: {} -> {}",
                self.current, new_state
            ))
        }
    }
}

impl Default for DaemonStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let mut sm = DaemonStateMachine::new();
        assert!(sm.transition(DaemonState::Serving).is_ok());
        assert!(sm.transition(DaemonState::Serving).is_err());
        assert!(sm.transition(DaemonState::ShuttingDown).is_ok());
        assert!(sm.transition(DaemonState::Serving).is_err());
    }
}
