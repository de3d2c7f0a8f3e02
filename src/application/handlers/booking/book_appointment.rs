//! BookAppointmentHandler - Command handler for booking a slot.
//!
//! Reserves the slot with a single compare-and-swap, opens a pending
//! appointment and starts the payment. Of any number of concurrent bookings
//! for one slot, exactly one gets past the reservation.

use std::sync::Arc;

use crate::application::Notifier;
use crate::domain::appointment::{
    Appointment, AppointmentEvent, BookingError, NewAppointment, SettlementMetadata,
};
use crate::domain::foundation::{
    AppointmentId, ClientId, PatientId, ProfessionalId, SlotId, ValidationError,
};
use crate::domain::scheduling::SlotError;
use crate::ports::{
    AppointmentRepository, Clock, InitializeTransaction, PaymentGateway, SlotStore,
    TransactionHandle,
};

/// Command to book a slot. Fields arrive raw from the edge and are
/// validated before anything is touched.
#[derive(Debug, Clone, Default)]
pub struct BookAppointmentCommand {
    pub professional_id: String,
    pub client_id: String,
    pub patient_id: String,
    pub slot_id: String,
    /// Fee in minor units.
    pub amount: i64,
    pub payer_email: String,
    pub payee_account: String,
    pub callback_url: Option<String>,
}

/// Result of a successful booking.
#[derive(Debug, Clone)]
pub struct BookAppointmentResult {
    pub appointment: Appointment,
    pub payment: TransactionHandle,
}

struct ValidBooking {
    professional_id: ProfessionalId,
    client_id: ClientId,
    patient_id: PatientId,
    slot_id: SlotId,
    amount: i64,
    payer_email: String,
    payee_account: String,
    callback_url: Option<String>,
}

impl BookAppointmentCommand {
    fn validate(self) -> Result<ValidBooking, BookingError> {
        let professional_id = ProfessionalId::new(self.professional_id)?;
        let client_id = ClientId::new(self.client_id)?;
        let patient_id = PatientId::new(self.patient_id)?;

        if self.slot_id.trim().is_empty() {
            return Err(ValidationError::empty_field("slotId").into());
        }
        let slot_id: SlotId = self
            .slot_id
            .trim()
            .parse()
            .map_err(|_| BookingError::validation("slotId", "must be a UUID"))?;

        if self.amount <= 0 {
            return Err(BookingError::validation("amount", "must be positive"));
        }

        let payer_email = self.payer_email.trim().to_string();
        if !is_plausible_email(&payer_email) {
            return Err(BookingError::validation("payerEmail", "must be an e-mail address"));
        }

        let payee_account = self.payee_account.trim().to_string();
        if payee_account.is_empty() {
            return Err(ValidationError::empty_field("payeeAccount").into());
        }

        Ok(ValidBooking {
            professional_id,
            client_id,
            patient_id,
            slot_id,
            amount: self.amount,
            payer_email,
            payee_account,
            callback_url: self.callback_url.filter(|u| !u.trim().is_empty()),
        })
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Handler coordinating slot reservation, appointment creation and payment.
pub struct BookAppointmentHandler {
    slots: Arc<dyn SlotStore>,
    appointments: Arc<dyn AppointmentRepository>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Notifier,
    clock: Arc<dyn Clock>,
}

impl BookAppointmentHandler {
    pub fn new(
        slots: Arc<dyn SlotStore>,
        appointments: Arc<dyn AppointmentRepository>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Notifier,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            slots,
            appointments,
            gateway,
            notifier,
            clock,
        }
    }

    pub async fn handle(&self, cmd: BookAppointmentCommand) -> Result<BookAppointmentResult, BookingError> {
        // 1. Validate input; nothing is touched on failure
        let booking = cmd.validate()?;
        let now = self.clock.now();

        // 2. The slot must exist, belong to the professional and lie ahead
        let slot = self
            .slots
            .find_slot(booking.slot_id)
            .await?
            .filter(|s| s.professional_id == booking.professional_id)
            .ok_or_else(|| BookingError::slot_not_found(booking.slot_id))?;
        if slot.is_elapsed(now) {
            return Err(BookingError::validation("slotId", "slot has already ended"));
        }

        // 3. Reserve: the only step that decides between racing bookings
        let appointment_id = AppointmentId::new();
        match self.slots.reserve(slot.id, appointment_id).await {
            Ok(_) => {}
            Err(SlotError::Conflict { .. }) => {
                tracing::debug!(slot_id = %slot.id, "Slot already held");
                return Err(BookingError::SlotConflict(slot.id));
            }
            Err(e) => return Err(e.into()),
        }

        // 4. Persist the pending appointment, releasing the slot if that fails
        let appointment = Appointment::book(
            NewAppointment {
                id: appointment_id,
                professional_id: booking.professional_id,
                client_id: booking.client_id,
                patient_id: booking.patient_id,
                slot_id: slot.id,
                slot_ends_at: slot.ends_at(),
                amount: booking.amount,
            },
            now,
        );
        if let Err(e) = self.appointments.insert(&appointment).await {
            if let Err(release_err) = self.slots.release(slot.id, appointment_id).await {
                tracing::error!(
                    slot_id = %slot.id,
                    appointment_id = %appointment_id,
                    error = %release_err,
                    "Could not release slot after failed insert"
                );
            }
            return Err(e.into());
        }

        tracing::info!(
            appointment_id = %appointment.id,
            slot_id = %slot.id,
            professional_id = %appointment.professional_id,
            "Appointment booked, awaiting payment"
        );
        let event = AppointmentEvent::Booked {
            appointment_id: appointment.id,
            professional_id: appointment.professional_id.clone(),
            client_id: appointment.client_id.clone(),
            slot_id: slot.id,
            occurred_at: now,
        };
        self.notifier.emit_correlated(event, &appointment.payment_reference);

        // 5. Start the payment. On failure the appointment stays pending
        // and the sweep expires it.
        let payment = self
            .gateway
            .initialize(InitializeTransaction {
                amount: appointment.amount,
                payer_email: booking.payer_email,
                payee_account: booking.payee_account,
                reference: appointment.payment_reference.clone(),
                metadata: SettlementMetadata {
                    appointment_id: appointment.id,
                    slot_id: slot.id,
                },
                callback_url: booking.callback_url,
            })
            .await
            .map_err(|e| {
                tracing::warn!(
                    appointment_id = %appointment.id,
                    error = %e,
                    retryable = e.retryable,
                    "Payment initialization failed"
                );
                BookingError::payment_init(appointment.id, e.message)
            })?;

        Ok(BookAppointmentResult { appointment, payment })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::Harness;
    use crate::domain::appointment::AppointmentStatus;
    use crate::domain::scheduling::SlotState;
    use crate::ports::PaymentError;

    #[tokio::test]
    async fn books_available_slot() {
        let h = Harness::new();
        let schedule = h.publish_day("dr-ada").await;
        let slot = &schedule.slots[0];

        let result = h.booking().handle(h.book_command("dr-ada", slot.id)).await.unwrap();

        assert_eq!(result.appointment.status, AppointmentStatus::Pending);
        assert_eq!(result.payment.reference, result.appointment.payment_reference);
        let stored = h.slots.find_slot(slot.id).await.unwrap().unwrap();
        assert_eq!(stored.state, SlotState::Reserved);
        assert_eq!(stored.holder, Some(result.appointment.id));

        let sent = h.gateway.initialized();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].metadata.appointment_id, result.appointment.id);
        assert_eq!(sent[0].metadata.slot_id, slot.id);
        h.wait_for_event("appointment.booked", 1).await;
    }

    #[tokio::test]
    async fn second_booking_conflicts() {
        let h = Harness::new();
        let schedule = h.publish_day("dr-ada").await;
        let slot_id = schedule.slots[0].id;
        let handler = h.booking();

        handler.handle(h.book_command("dr-ada", slot_id)).await.unwrap();
        let err = handler.handle(h.book_command("dr-ada", slot_id)).await.unwrap_err();

        assert_eq!(err, BookingError::SlotConflict(slot_id));
        assert_eq!(h.appointments.for_slot(slot_id).len(), 1);
    }

    #[tokio::test]
    async fn missing_field_fails_without_side_effects() {
        let h = Harness::new();
        let schedule = h.publish_day("dr-ada").await;
        let slot_id = schedule.slots[0].id;
        let mut cmd = h.book_command("dr-ada", slot_id);
        cmd.client_id = String::new();

        let err = h.booking().handle(cmd).await.unwrap_err();

        assert!(matches!(err, BookingError::Validation { .. }));
        let slot = h.slots.find_slot(slot_id).await.unwrap().unwrap();
        assert_eq!(slot.state, SlotState::Available);
        assert_eq!(h.gateway.call_count("initialize"), 0);
    }

    #[tokio::test]
    async fn rejects_bad_amount_and_email() {
        let h = Harness::new();
        let schedule = h.publish_day("dr-ada").await;
        let slot_id = schedule.slots[0].id;

        let mut cmd = h.book_command("dr-ada", slot_id);
        cmd.amount = 0;
        assert!(matches!(
            h.booking().handle(cmd).await,
            Err(BookingError::Validation { ref field, .. }) if field == "amount"
        ));

        let mut cmd = h.book_command("dr-ada", slot_id);
        cmd.payer_email = "not-an-email".to_string();
        assert!(matches!(
            h.booking().handle(cmd).await,
            Err(BookingError::Validation { ref field, .. }) if field == "payerEmail"
        ));
    }

    #[tokio::test]
    async fn slot_of_other_professional_is_not_found() {
        let h = Harness::new();
        let schedule = h.publish_day("dr-ada").await;

        let err = h
            .booking()
            .handle(h.book_command("dr-bob", schedule.slots[0].id))
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::NotFound { resource: "slot", .. }));
    }

    #[tokio::test]
    async fn elapsed_slot_is_rejected() {
        let h = Harness::new();
        let schedule = h.publish_day("dr-ada").await;
        let slot = &schedule.slots[0];
        h.clock.set(slot.ends_at());

        let err = h.booking().handle(h.book_command("dr-ada", slot.id)).await.unwrap_err();
        assert!(matches!(err, BookingError::Validation { .. }));
    }

    #[tokio::test]
    async fn gateway_failure_leaves_pending_appointment() {
        let h = Harness::new();
        let schedule = h.publish_day("dr-ada").await;
        let slot_id = schedule.slots[0].id;
        h.gateway
            .set_method_error("initialize", PaymentError::network("gateway down"));

        let err = h.booking().handle(h.book_command("dr-ada", slot_id)).await.unwrap_err();

        let BookingError::PaymentInit { appointment_id, .. } = err else {
            panic!("expected PaymentInit, got {:?}", err);
        };
        let stored = h.appointments.for_slot(slot_id);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, appointment_id);
        assert_eq!(stored[0].status, AppointmentStatus::Pending);
        let slot = h.slots.find_slot(slot_id).await.unwrap().unwrap();
        assert_eq!(slot.state, SlotState::Reserved);
    }

    #[test]
    fn email_plausibility() {
        assert!(is_plausible_email("ada@clinic.ng"));
        assert!(!is_plausible_email("ada@clinic"));
        assert!(!is_plausible_email("@clinic.ng"));
        assert!(!is_plausible_email("ada @clinic.ng"));
    }
}
