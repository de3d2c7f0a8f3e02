//! Booking error taxonomy.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | Validation | 400 |
//! | NotFound | 404 |
//! | SlotConflict | 409 |
//! | PaymentInit | 502 |
//! | PaymentCallback | 500 |
//! | InvalidSignature | 401 |
//! | InvalidTransition | 409 (200 on the webhook path) |
//! | Internal | 500 |

use crate::domain::foundation::{
    AppointmentId, DomainError, ErrorCode, SlotId, TransitionRejected, ValidationError,
};
use crate::domain::scheduling::SlotError;

use super::AppointmentStatus;

/// Errors surfaced by booking operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// Missing or malformed input. Nothing was changed.
    Validation { field: String, message: String },

    /// Unknown schedule, slot or appointment.
    NotFound { resource: &'static str, id: String },

    /// Another booking holds the slot.
    SlotConflict(SlotId),

    /// The gateway refused to initialize a transaction. The appointment
    /// stays pending until TTL expiry.
    PaymentInit {
        appointment_id: AppointmentId,
        reason: String,
    },

    /// A settlement could not be applied.
    PaymentCallback { reason: String },

    /// Webhook signature verification failed.
    InvalidSignature,

    /// The state machine refused the transition. Nothing was changed.
    InvalidTransition {
        current: AppointmentStatus,
        attempted: AppointmentStatus,
    },

    /// Unexpected fault. The message is logged, never returned to callers.
    Internal(String),
}

impl BookingError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BookingError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn schedule_not_found(professional_id: impl ToString) -> Self {
        BookingError::NotFound {
            resource: "schedule",
            id: professional_id.to_string(),
        }
    }

    pub fn slot_not_found(slot_id: SlotId) -> Self {
        BookingError::NotFound {
            resource: "slot",
            id: slot_id.to_string(),
        }
    }

    pub fn appointment_not_found(id: AppointmentId) -> Self {
        BookingError::NotFound {
            resource: "appointment",
            id: id.to_string(),
        }
    }

    pub fn payment_init(appointment_id: AppointmentId, reason: impl Into<String>) -> Self {
        BookingError::PaymentInit {
            appointment_id,
            reason: reason.into(),
        }
    }

    pub fn payment_callback(reason: impl Into<String>) -> Self {
        BookingError::PaymentCallback {
            reason: reason.into(),
        }
    }

    pub fn invalid_transition(current: AppointmentStatus, attempted: AppointmentStatus) -> Self {
        BookingError::InvalidTransition { current, attempted }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        BookingError::Internal(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            BookingError::Validation { .. } => ErrorCode::ValidationFailed,
            BookingError::NotFound { resource, .. } => match *resource {
                "schedule" => ErrorCode::ScheduleNotFound,
                "slot" => ErrorCode::SlotNotFound,
                _ => ErrorCode::AppointmentNotFound,
            },
            BookingError::SlotConflict(_) => ErrorCode::SlotConflict,
            BookingError::PaymentInit { .. } => ErrorCode::PaymentInitFailed,
            BookingError::PaymentCallback { .. } | BookingError::InvalidSignature => {
                ErrorCode::PaymentCallbackFailed
            }
            BookingError::InvalidTransition { .. } => ErrorCode::InvalidStateTransition,
            BookingError::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn message(&self) -> String {
        match self {
            BookingError::Validation { field, message } => format!("{}: {}", field, message),
            BookingError::NotFound { resource, id } => format!("{} {} not found", resource, id),
            BookingError::SlotConflict(id) => {
                format!("Slot {} is no longer available; choose another slot", id)
            }
            BookingError::PaymentInit { appointment_id, reason } => format!(
                "Payment could not be started for appointment {}: {}",
                appointment_id, reason
            ),
            BookingError::PaymentCallback { reason } => {
                format!("Payment settlement rejected: {}", reason)
            }
            BookingError::InvalidSignature => "Invalid webhook signature".to_string(),
            BookingError::InvalidTransition { current, attempted } => format!(
                "Appointment is {} and cannot become {}",
                current, attempted
            ),
            BookingError::Internal(msg) => format!("Internal error: {}", msg),
        }
    }
}

impl std::fmt::Display for BookingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for BookingError {}

impl From<ValidationError> for BookingError {
    fn from(err: ValidationError) -> Self {
        BookingError::validation(err.field().to_string(), err.to_string())
    }
}

impl From<TransitionRejected<AppointmentStatus>> for BookingError {
    fn from(err: TransitionRejected<AppointmentStatus>) -> Self {
        BookingError::invalid_transition(err.from, err.to)
    }
}

impl From<SlotError> for BookingError {
    fn from(err: SlotError) -> Self {
        match err {
            SlotError::NotFound(id) => BookingError::slot_not_found(id),
            SlotError::ScheduleNotFound(pid) => BookingError::schedule_not_found(pid),
            SlotError::Conflict { slot_id, .. } => BookingError::SlotConflict(slot_id),
            SlotError::InvalidAvailability(msg) => BookingError::validation("availability", msg),
            SlotError::Infrastructure(msg) => BookingError::Internal(msg),
        }
    }
}

impl From<DomainError> for BookingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => BookingError::validation(
                err.detail("field").unwrap_or("request").to_string(),
                err.message,
            ),
            ErrorCode::ScheduleNotFound => BookingError::NotFound {
                resource: "schedule",
                id: err.detail("id").unwrap_or_default().to_string(),
            },
            ErrorCode::SlotNotFound => BookingError::NotFound {
                resource: "slot",
                id: err.detail("id").unwrap_or_default().to_string(),
            },
            ErrorCode::AppointmentNotFound => BookingError::NotFound {
                resource: "appointment",
                id: err.detail("id").unwrap_or_default().to_string(),
            },
            ErrorCode::SlotConflict => match err.detail("slot_id").map(str::parse::<SlotId>) {
                Some(Ok(slot_id)) => BookingError::SlotConflict(slot_id),
                _ => BookingError::Internal(err.to_string()),
            },
            ErrorCode::PaymentCallbackFailed => BookingError::payment_callback(err.message),
            _ => BookingError::Internal(err.to_string()),
        }
    }
}

impl From<BookingError> for DomainError {
    fn from(err: BookingError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}
