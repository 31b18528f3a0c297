//! Per-device pairing state machine.
//!
//! ```text
//!   Unpaired --Paired--> Paired --Triggered--> Paired
//!                          |
//!                          +------Reset------> Unpaired
//! ```
//!
//! Triggering never changes pairing state, and a failed trigger leaves the
//! device where it was. Re-pairing an already paired device is allowed
//! (it replaces the key). Resetting an unpaired device is a no-op.

use thiserror::Error;

/// Pairing state of one remote device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PairingState {
    /// No credential stored.
    Unpaired,
    /// A credential is stored; triggers can be sent.
    Paired,
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingEvent {
    /// A valid key was saved for the device.
    Paired,
    /// A trigger was sent.
    Triggered,
    /// The pairing was reset.
    Reset,
}

/// Rejected transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StateError {
    /// Triggering requires a pairing.
    #[error("device is not paired")]
    NotPaired,
}

impl PairingState {
    /// State implied by whether a credential exists.
    pub fn from_paired(paired: bool) -> Self {
        if paired {
            Self::Paired
        } else {
            Self::Unpaired
        }
    }

    /// Check if the device is paired.
    pub fn is_paired(self) -> bool {
        self == Self::Paired
    }

    /// Process an event and return the new state.
    ///
    /// This is a pure function - no side effects.
    pub fn on_event(self, event: PairingEvent) -> Result<Self, StateError> {
        match (self, event) {
            (_, PairingEvent::Paired) => Ok(Self::Paired),
            (Self::Paired, PairingEvent::Triggered) => Ok(Self::Paired),
            (Self::Unpaired, PairingEvent::Triggered) => Err(StateError::NotPaired),
            (_, PairingEvent::Reset) => Ok(Self::Unpaired),
        }
    }
}

impl std::fmt::Display for PairingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unpaired => f.write_str("unpaired"),
            Self::Paired => f.write_str("paired"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairing_enters_paired() {
        let state = PairingState::Unpaired.on_event(PairingEvent::Paired);
        assert_eq!(state, Ok(PairingState::Paired));
    }

    #[test]
    fn trigger_keeps_paired() {
        let state = PairingState::Paired.on_event(PairingEvent::Triggered);
        assert_eq!(state, Ok(PairingState::Paired));
    }

    #[test]
    fn trigger_requires_pairing() {
        let state = PairingState::Unpaired.on_event(PairingEvent::Triggered);
        assert_eq!(state, Err(StateError::NotPaired));
    }

    #[test]
    fn reset_returns_to_unpaired() {
        assert_eq!(
            PairingState::Paired.on_event(PairingEvent::Reset),
            Ok(PairingState::Unpaired)
        );
        assert_eq!(
            PairingState::Unpaired.on_event(PairingEvent::Reset),
            Ok(PairingState::Unpaired)
        );
    }

    #[test]
    fn re_pairing_is_allowed() {
        let state = PairingState::Paired.on_event(PairingEvent::Paired);
        assert_eq!(state, Ok(PairingState::Paired));
    }

    #[test]
    fn display_is_lowercase() {
        assert_eq!(PairingState::Paired.to_string(), "paired");
        assert_eq!(PairingState::from_paired(false).to_string(), "unpaired");
    }
}
