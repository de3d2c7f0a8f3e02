//! AppointmentLifecycle - applies appointment transitions with their side effects.
//!
//! Every transition runs in the same order:
//!
//! 1. Domain check on a snapshot (`Appointment::confirm` etc.)
//! 2. Repository compare-and-set against the snapshot's status
//! 3. Slot side effect, guarded by the appointment id as holder
//! 4. Fire-and-forget notification
//!
//! A lost compare-and-set means someone else moved the appointment first;
//! the caller gets `InvalidTransition` carrying the status that won.

use std::sync::Arc;

use crate::application::Notifier;
use crate::domain::appointment::{
    Appointment, AppointmentEvent, AppointmentStatus, BookingError, CancellationReason,
};
use crate::domain::foundation::AppointmentId;
use crate::ports::{AppointmentRepository, Clock, SlotStore};

pub struct AppointmentLifecycle {
    appointments: Arc<dyn AppointmentRepository>,
    slots: Arc<dyn SlotStore>,
    notifier: Notifier,
    clock: Arc<dyn Clock>,
}

impl AppointmentLifecycle {
    pub fn new(
        appointments: Arc<dyn AppointmentRepository>,
        slots: Arc<dyn SlotStore>,
        notifier: Notifier,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            appointments,
            slots,
            notifier,
            clock,
        }
    }

    pub async fn load(&self, id: AppointmentId) -> Result<Appointment, BookingError> {
        self.appointments
            .find_by_id(id)
            .await?
            .ok_or_else(|| BookingError::appointment_not_found(id))
    }

    /// `pending -> confirmed`, then books the slot.
    pub async fn confirm(&self, current: &Appointment) -> Result<Appointment, BookingError> {
        let mut next = current.clone();
        next.confirm(self.clock.now())?;
        self.commit(current.status, &next).await?;

        // The appointment is the source of truth once payment has landed.
        // A slot left reserved still excludes other bookings.
        if let Err(e) = self.slots.finalize(next.slot_id, next.id).await {
            tracing::error!(
                appointment_id = %next.id,
                slot_id = %next.slot_id,
                error = %e,
                "Appointment confirmed but slot could not be finalized"
            );
        }

        tracing::info!(appointment_id = %next.id, slot_id = %next.slot_id, "Appointment confirmed");
        let event = AppointmentEvent::Confirmed {
            appointment_id: next.id,
            professional_id: next.professional_id.clone(),
            client_id: next.client_id.clone(),
            slot_id: next.slot_id,
            occurred_at: next.updated_at,
        };
        self.notifier.emit_correlated(event, &next.payment_reference);
        Ok(next)
    }

    /// `pending|confirmed -> cancelled`, then frees the slot.
    pub async fn cancel(
        &self,
        current: &Appointment,
        reason: CancellationReason,
    ) -> Result<Appointment, BookingError> {
        let mut next = current.clone();
        next.cancel(reason, self.clock.now())?;
        self.commit(current.status, &next).await?;

        if let Err(e) = self.slots.release(next.slot_id, next.id).await {
            tracing::warn!(
                appointment_id = %next.id,
                slot_id = %next.slot_id,
                error = %e,
                "Cancelled appointment did not hold its slot"
            );
        }

        tracing::info!(
            appointment_id = %next.id,
            slot_id = %next.slot_id,
            reason = %reason,
            "Appointment cancelled"
        );
        let event = AppointmentEvent::Cancelled {
            appointment_id: next.id,
            professional_id: next.professional_id.clone(),
            client_id: next.client_id.clone(),
            slot_id: next.slot_id,
            reason,
            occurred_at: next.updated_at,
        };
        self.notifier.emit_correlated(event, &next.payment_reference);
        Ok(next)
    }

    /// `confirmed -> completed`. The slot is left for the sweep to reclaim.
    pub async fn complete(&self, current: &Appointment) -> Result<Appointment, BookingError> {
        let mut next = current.clone();
        next.complete(self.clock.now())?;
        self.commit(current.status, &next).await?;

        tracing::info!(appointment_id = %next.id, "Appointment completed");
        let event = AppointmentEvent::Completed {
            appointment_id: next.id,
            professional_id: next.professional_id.clone(),
            client_id: next.client_id.clone(),
            slot_id: next.slot_id,
            occurred_at: next.updated_at,
        };
        self.notifier.emit_correlated(event, &next.payment_reference);
        Ok(next)
    }

    async fn commit(&self, expected: AppointmentStatus, next: &Appointment) -> Result<(), BookingError> {
        if self.appointments.compare_and_set(next, expected).await? {
            return Ok(());
        }

        let winner = self.load(next.id).await?;
        tracing::debug!(
            appointment_id = %next.id,
            expected = %expected,
            found = %winner.status,
            "Lost appointment compare-and-set"
        );
        Err(BookingError::invalid_transition(winner.status, next.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::Harness;
    use crate::domain::scheduling::SlotState;
    use crate::ports::SlotStore;

    #[tokio::test]
    async fn confirm_books_the_slot_and_notifies() {
        let h = Harness::new();
        let appt = h.book_first_slot().await;

        let confirmed = h.lifecycle().confirm(&appt).await.unwrap();

        assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
        let slot = h.slots.find_slot(appt.slot_id).await.unwrap().unwrap();
        assert_eq!(slot.state, SlotState::Booked);
        assert_eq!(slot.holder, Some(appt.id));
        h.wait_for_event("appointment.confirmed", 1).await;
    }

    #[tokio::test]
    async fn cancel_releases_the_slot() {
        let h = Harness::new();
        let appt = h.book_first_slot().await;

        let cancelled = h
            .lifecycle()
            .cancel(&appt, CancellationReason::ClientRequested)
            .await
            .unwrap();

        assert_eq!(cancelled.cancellation_reason, Some(CancellationReason::ClientRequested));
        let slot = h.slots.find_slot(appt.slot_id).await.unwrap().unwrap();
        assert_eq!(slot.state, SlotState::Available);
        assert!(slot.holder.is_none());
        h.wait_for_event("appointment.cancelled", 1).await;
    }

    #[tokio::test]
    async fn terminal_appointment_rejects_and_stays_put() {
        let h = Harness::new();
        let appt = h.book_first_slot().await;
        let lifecycle = h.lifecycle();
        let cancelled = lifecycle
            .cancel(&appt, CancellationReason::ClientRequested)
            .await
            .unwrap();

        let err = lifecycle.confirm(&cancelled).await.unwrap_err();

        assert_eq!(
            err,
            BookingError::invalid_transition(AppointmentStatus::Cancelled, AppointmentStatus::Confirmed)
        );
        assert_eq!(lifecycle.load(appt.id).await.unwrap(), cancelled);
    }

    #[tokio::test]
    async fn stale_snapshot_loses_compare_and_set() {
        let h = Harness::new();
        let appt = h.book_first_slot().await;
        let lifecycle = h.lifecycle();
        lifecycle.confirm(&appt).await.unwrap();

        // `appt` still says pending; the store says confirmed.
        let err = lifecycle
            .cancel(&appt, CancellationReason::PaymentTimeout)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            BookingError::invalid_transition(AppointmentStatus::Confirmed, AppointmentStatus::Cancelled)
        );
        let slot = h.slots.find_slot(appt.slot_id).await.unwrap().unwrap();
        assert_eq!(slot.state, SlotState::Booked);
    }

    #[tokio::test]
    async fn complete_requires_slot_end() {
        let h = Harness::new();
        let appt = h.book_first_slot().await;
        let lifecycle = h.lifecycle();
        let confirmed = lifecycle.confirm(&appt).await.unwrap();

        assert!(lifecycle.complete(&confirmed).await.is_err());

        h.clock.set(confirmed.slot_ends_at);
        let completed = lifecycle.complete(&confirmed).await.unwrap();
        assert_eq!(completed.status, AppointmentStatus::Completed);
        h.wait_for_event("appointment.completed", 1).await;
    }

    #[tokio::test]
    async fn unknown_appointment_is_not_found() {
        let h = Harness::new();
        let err = h.lifecycle().load(AppointmentId::new()).await.unwrap_err();
        assert!(matches!(err, BookingError::NotFound { resource: "appointment", .. }));
    }
}
