//! State machine trait for status enums.
//!
//! Slot states and appointment statuses both implement this so that
//! transition rules live in one table per enum.

use std::fmt;

/// A rejected transition between two states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRejected<S> {
    pub from: S,
    pub to: S,
}

impl<S: fmt::Debug> fmt::Display for TransitionRejected<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cannot transition from {:?} to {:?}", self.from, self.to)
    }
}

impl<S: fmt::Debug> std::error::Error for TransitionRejected<S> {}

/// Trait for status enums that represent state machines.
///
/// ```ignore
/// let next = AppointmentStatus::Pending.transition_to(AppointmentStatus::Confirmed)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, TransitionRejected<Self>> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(TransitionRejected {
                from: *self,
                to: target,
            })
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
