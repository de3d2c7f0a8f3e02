//! Appointment repository port.
//!
//! Status changes go through `compare_and_set`, which only writes when the
//! stored status still equals the caller's expectation.

use async_trait::async_trait;

use crate::domain::appointment::{Appointment, AppointmentStatus, PaymentReference};
use crate::domain::foundation::{AppointmentId, DomainError, SlotId, Timestamp};

#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Persists a new appointment.
    ///
    /// # Errors
    ///
    /// `ErrorCode::SlotConflict` if another active appointment already
    /// references the same slot.
    async fn insert(&self, appointment: &Appointment) -> Result<(), DomainError>;

    /// Writes `appointment` only if the stored status is `expected`.
    ///
    /// Returns `false` when the guard did not match (nothing written).
    async fn compare_and_set(
        &self,
        appointment: &Appointment,
        expected: AppointmentStatus,
    ) -> Result<bool, DomainError>;

    async fn find_by_id(&self, id: AppointmentId) -> Result<Option<Appointment>, DomainError>;

    async fn find_by_reference(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<Appointment>, DomainError>;

    /// The pending or confirmed appointment holding a slot, if any.
    async fn find_active_for_slot(&self, slot_id: SlotId) -> Result<Option<Appointment>, DomainError>;

    /// Pending appointments created at or before `cutoff`, oldest first.
    async fn find_pending_created_before(
        &self,
        cutoff: Timestamp,
        limit: usize,
    ) -> Result<Vec<Appointment>, DomainError>;

    /// Confirmed appointments whose slot ended at or before `now`.
    async fn find_confirmed_ended_before(
        &self,
        now: Timestamp,
        limit: usize,
    ) -> Result<Vec<Appointment>, DomainError>;
}
