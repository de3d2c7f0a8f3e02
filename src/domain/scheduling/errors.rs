//! Slot and schedule errors.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, ProfessionalId, SlotId};

use super::SlotState;

/// Failures of slot primitives and availability publication.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    #[error("Slot {0} not found")]
    NotFound(SlotId),

    #[error("No schedule for professional {0}")]
    ScheduleNotFound(ProfessionalId),

    /// The conditional write did not match the slot's current state or holder.
    #[error("Slot {slot_id} is {}", state.as_str())]
    Conflict { slot_id: SlotId, state: SlotState },

    #[error("Invalid availability: {0}")]
    InvalidAvailability(String),

    #[error("Slot storage failure: {0}")]
    Infrastructure(String),
}

impl From<SlotError> for DomainError {
    fn from(err: SlotError) -> Self {
        let code = match &err {
            SlotError::NotFound(_) => ErrorCode::SlotNotFound,
            SlotError::ScheduleNotFound(_) => ErrorCode::ScheduleNotFound,
            SlotError::Conflict { .. } => ErrorCode::SlotConflict,
            SlotError::InvalidAvailability(_) => ErrorCode::ValidationFailed,
            SlotError::Infrastructure(_) => ErrorCode::DatabaseError,
        };
        DomainError::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_names_current_state() {
        let id = SlotId::new();
        let err = SlotError::Conflict {
            slot_id: id,
            state: SlotState::Booked,
        };
        assert_eq!(err.to_string(), format!("Slot {} is booked", id));
        assert_eq!(DomainError::from(err).code, ErrorCode::SlotConflict);
    }
}
