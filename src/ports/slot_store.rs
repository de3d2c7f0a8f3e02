//! SlotStore port - persisted availability and the slot CAS primitives.
//!
//! Every mutation is a single conditional write keyed on the slot's current
//! state (and holder). Adapters must never implement `reserve`, `finalize`
//! or `release` as a read followed by an unguarded write.

use async_trait::async_trait;

use crate::domain::foundation::{AppointmentId, ProfessionalId, SlotId, Timestamp};
use crate::domain::scheduling::{AvailabilityInput, DayFilter, Schedule, Slot, SlotError};

#[async_trait]
pub trait SlotStore: Send + Sync {
    /// Bulk upsert of a professional's availability.
    ///
    /// Creates the schedule on first publication. Held slots are left as
    /// they are.
    async fn publish(
        &self,
        professional_id: &ProfessionalId,
        availability: &[AvailabilityInput],
        now: Timestamp,
    ) -> Result<Schedule, SlotError>;

    async fn find_schedule(&self, professional_id: &ProfessionalId) -> Result<Option<Schedule>, SlotError>;

    async fn find_slot(&self, slot_id: SlotId) -> Result<Option<Slot>, SlotError>;

    /// Available slots, ascending by date and start time.
    ///
    /// Fails with `ScheduleNotFound` when the professional has no schedule.
    async fn list_available(
        &self,
        professional_id: &ProfessionalId,
        filter: Option<DayFilter>,
    ) -> Result<Vec<Slot>, SlotError>;

    /// `available -> reserved` for `holder`; `Conflict` if not available.
    async fn reserve(&self, slot_id: SlotId, holder: AppointmentId) -> Result<Slot, SlotError>;

    /// `reserved -> booked`; `Conflict` unless reserved by `holder`.
    async fn finalize(&self, slot_id: SlotId, holder: AppointmentId) -> Result<Slot, SlotError>;

    /// `reserved|booked -> available`; `Conflict` unless held by `holder`.
    async fn release(&self, slot_id: SlotId, holder: AppointmentId) -> Result<Slot, SlotError>;

    /// Held slots whose end time is at or before `now`, oldest first.
    async fn list_elapsed_held(&self, now: Timestamp, limit: usize) -> Result<Vec<Slot>, SlotError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn SlotStore) {}
}
