//! Appointment domain module.
//!
//! Handles the appointment lifecycle and its reconciliation with payment
//! settlements.
//!
//! # Module Structure
//!
//! - `aggregate` - Appointment aggregate entity
//! - `status` - AppointmentStatus state machine
//! - `settlement` - Payment references, outcomes, settlement records
//! - `events` - AppointmentEvent notifications
//! - `errors` - BookingError taxonomy

mod aggregate;
mod errors;
mod events;
mod settlement;
mod status;

pub use aggregate::{Appointment, CancellationReason, NewAppointment};
pub use errors::BookingError;
pub use events::AppointmentEvent;
pub use settlement::{
    PaymentReference, SettlementMetadata, SettlementNotice, SettlementOutcome, SettlementRecord,
};
pub use status::AppointmentStatus;
