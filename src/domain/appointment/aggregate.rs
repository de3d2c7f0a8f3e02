//! Appointment aggregate.
//!
//! # Design Decisions
//!
//! - **Money in minor units**: `amount` is an i64 (kobo, cents), never a float
//! - **Reference fixed at booking**: the payment reference is generated here
//!   and echoed back by the gateway, so settlements can be checked against it
//! - **Slot end snapshot**: `slot_ends_at` lets completion and sweeps run
//!   without a join against the slot

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    AppointmentId, ClientId, PatientId, ProfessionalId, SlotId, StateMachine, Timestamp,
};

use super::{AppointmentStatus, BookingError, PaymentReference, SettlementOutcome};

/// Why an appointment was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationReason {
    ClientRequested,
    ProfessionalRequested,
    PaymentFailed,
    PaymentTimeout,
}

impl CancellationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancellationReason::ClientRequested => "client_requested",
            CancellationReason::ProfessionalRequested => "professional_requested",
            CancellationReason::PaymentFailed => "payment_failed",
            CancellationReason::PaymentTimeout => "payment_timeout",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "client_requested" => Some(CancellationReason::ClientRequested),
            "professional_requested" => Some(CancellationReason::ProfessionalRequested),
            "payment_failed" => Some(CancellationReason::PaymentFailed),
            "payment_timeout" => Some(CancellationReason::PaymentTimeout),
            _ => None,
        }
    }
}

impl std::fmt::Display for CancellationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to open a pending appointment on a reserved slot.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub id: AppointmentId,
    pub professional_id: ProfessionalId,
    pub client_id: ClientId,
    pub patient_id: PatientId,
    pub slot_id: SlotId,
    pub slot_ends_at: Timestamp,
    pub amount: i64,
}

/// A client's claim on a slot.
///
/// # Invariants
///
/// - At most one active (pending/confirmed) appointment references a slot
/// - `cancellation_reason` is set iff `status` is `Cancelled`
/// - Status changes follow `AppointmentStatus` transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub professional_id: ProfessionalId,
    pub client_id: ClientId,
    pub patient_id: PatientId,
    pub slot_id: SlotId,
    pub status: AppointmentStatus,
    pub payment_reference: PaymentReference,
    pub amount: i64,
    pub slot_ends_at: Timestamp,
    pub cancellation_reason: Option<CancellationReason>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Appointment {
    /// Opens a pending appointment.
    pub fn book(new: NewAppointment, now: Timestamp) -> Self {
        Self {
            id: new.id,
            professional_id: new.professional_id,
            client_id: new.client_id,
            patient_id: new.patient_id,
            slot_id: new.slot_id,
            status: AppointmentStatus::Pending,
            payment_reference: PaymentReference::generate(),
            amount: new.amount,
            slot_ends_at: new.slot_ends_at,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// `pending -> confirmed`.
    pub fn confirm(&mut self, now: Timestamp) -> Result<(), BookingError> {
        self.transition_to(AppointmentStatus::Confirmed, now)
    }

    /// `pending|confirmed -> cancelled`.
    pub fn cancel(&mut self, reason: CancellationReason, now: Timestamp) -> Result<(), BookingError> {
        self.transition_to(AppointmentStatus::Cancelled, now)?;
        self.cancellation_reason = Some(reason);
        Ok(())
    }

    /// `confirmed -> completed`, once the slot has ended.
    pub fn complete(&mut self, now: Timestamp) -> Result<(), BookingError> {
        if now.is_before(&self.slot_ends_at) {
            return Err(BookingError::invalid_transition(
                self.status,
                AppointmentStatus::Completed,
            ));
        }
        self.transition_to(AppointmentStatus::Completed, now)
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// A pending appointment past its TTL.
    pub fn is_payment_overdue(&self, now: Timestamp, ttl_secs: i64) -> bool {
        self.status == AppointmentStatus::Pending
            && !self.created_at.plus_secs(ttl_secs).is_after(&now)
    }

    /// True when the appointment already shows the effect of `outcome`.
    ///
    /// Used to treat a redelivered settlement as a no-op.
    pub fn reflects(&self, outcome: SettlementOutcome) -> bool {
        match outcome {
            SettlementOutcome::Success => self.status == AppointmentStatus::Confirmed,
            SettlementOutcome::Failed => {
                self.status == AppointmentStatus::Cancelled
                    && self.cancellation_reason == Some(CancellationReason::PaymentFailed)
            }
        }
    }

    fn transition_to(&mut self, target: AppointmentStatus, now: Timestamp) -> Result<(), BookingError> {
        self.status = self.status.transition_to(target)?;
        self.updated_at = now;
        Ok(())
    }
}
