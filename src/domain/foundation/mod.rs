//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, and error types that form the
//! vocabulary of the booking domain.

mod errors;
mod events;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{DomainEvent, EventEnvelope, EventId, EventMetadata, SerializableDomainEvent};
pub use ids::{AppointmentId, ClientId, PatientId, ProfessionalId, ScheduleId, SlotId};
pub use state_machine::{StateMachine, TransitionRejected};
pub use timestamp::Timestamp;
