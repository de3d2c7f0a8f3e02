//! HandleSettlementHandler - applies a payment settlement to its appointment.
//!
//! Settlements are at-least-once: the gateway redelivers webhooks, and a
//! client-triggered verification can race the webhook for the same
//! reference. Each `(reference, outcome)` pair takes effect once; every
//! later delivery is reported as `AlreadyProcessed`.

use std::sync::Arc;

use crate::domain::appointment::{
    Appointment, AppointmentStatus, BookingError, CancellationReason, SettlementNotice,
    SettlementOutcome, SettlementRecord,
};
use crate::domain::foundation::AppointmentId;
use crate::ports::{Clock, SaveResult, SettlementStore};

use super::AppointmentLifecycle;

/// What a settlement did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementResult {
    Confirmed(Appointment),
    Cancelled(Appointment),
    /// The appointment already reflected this outcome.
    AlreadyProcessed { appointment_id: AppointmentId },
}

pub struct HandleSettlementHandler {
    settlements: Arc<dyn SettlementStore>,
    lifecycle: Arc<AppointmentLifecycle>,
    clock: Arc<dyn Clock>,
}

impl HandleSettlementHandler {
    pub fn new(
        settlements: Arc<dyn SettlementStore>,
        lifecycle: Arc<AppointmentLifecycle>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settlements,
            lifecycle,
            clock,
        }
    }

    pub async fn handle(&self, notice: SettlementNotice) -> Result<SettlementResult, BookingError> {
        let appointment_id = notice.metadata.appointment_id;

        // 1. Idempotency: already processed?
        if self.settlements.contains(&notice.reference, notice.outcome).await? {
            tracing::debug!(
                reference = %notice.reference,
                outcome = notice.outcome.as_str(),
                "Settlement already processed"
            );
            return Ok(SettlementResult::AlreadyProcessed { appointment_id });
        }

        // 2. Load the appointment named in the metadata
        let appointment = self.lifecycle.load(appointment_id).await?;

        // 3. The metadata must describe this appointment
        verify_matches(&appointment, &notice)?;

        // 4. Only a pending appointment is settled
        let result = if appointment.status != AppointmentStatus::Pending {
            self.settled_elsewhere(&appointment, &notice)?
        } else {
            // 5. Apply; losing the CAS to a concurrent transition is judged on the winner
            match self.apply(&appointment, notice.outcome).await {
                Ok(result) => result,
                Err(BookingError::InvalidTransition { .. }) => {
                    let latest = self.lifecycle.load(appointment_id).await?;
                    self.settled_elsewhere(&latest, &notice)?
                }
                Err(e) => return Err(e),
            }
        };

        // 6. Remember the pair
        let record = SettlementRecord::from_notice(&notice, self.clock.now());
        if self.settlements.record(&record).await? == SaveResult::AlreadyExists {
            tracing::debug!(reference = %notice.reference, "Settlement recorded concurrently");
        }

        Ok(result)
    }

    /// Outcome for an appointment that has already left `pending`.
    fn settled_elsewhere(
        &self,
        latest: &Appointment,
        notice: &SettlementNotice,
    ) -> Result<SettlementResult, BookingError> {
        if latest.reflects(notice.outcome) {
            return Ok(SettlementResult::AlreadyProcessed {
                appointment_id: latest.id,
            });
        }
        if notice.outcome == SettlementOutcome::Success {
            tracing::warn!(
                appointment_id = %latest.id,
                reference = %notice.reference,
                status = %latest.status,
                "Payment succeeded for an appointment that can no longer be confirmed; refund required"
            );
        } else {
            tracing::warn!(
                appointment_id = %latest.id,
                reference = %notice.reference,
                status = %latest.status,
                "Payment failure reported for an appointment that is no longer pending"
            );
        }
        Err(BookingError::invalid_transition(
            latest.status,
            notice.outcome.target_status(),
        ))
    }

    async fn apply(
        &self,
        appointment: &Appointment,
        outcome: SettlementOutcome,
    ) -> Result<SettlementResult, BookingError> {
        match outcome {
            SettlementOutcome::Success => self
                .lifecycle
                .confirm(appointment)
                .await
                .map(SettlementResult::Confirmed),
            SettlementOutcome::Failed => self
                .lifecycle
                .cancel(appointment, CancellationReason::PaymentFailed)
                .await
                .map(SettlementResult::Cancelled),
        }
    }
}

fn verify_matches(appointment: &Appointment, notice: &SettlementNotice) -> Result<(), BookingError> {
    if notice.metadata.slot_id != appointment.slot_id {
        tracing::warn!(
            appointment_id = %appointment.id,
            expected = %appointment.slot_id,
            received = %notice.metadata.slot_id,
            "Settlement slot does not match appointment"
        );
        return Err(BookingError::payment_callback("slot does not match appointment"));
    }
    if notice.reference != appointment.payment_reference {
        tracing::warn!(
            appointment_id = %appointment.id,
            received = %notice.reference,
            "Settlement reference does not match appointment"
        );
        return Err(BookingError::payment_callback("reference does not match appointment"));
    }
    if notice.outcome == SettlementOutcome::Success {
        if let Some(amount) = notice.amount {
            if amount < appointment.amount {
                tracing::warn!(
                    appointment_id = %appointment.id,
                    expected = appointment.amount,
                    received = amount,
                    "Settlement amount short of appointment fee"
                );
                return Err(BookingError::payment_callback("amount does not cover appointment fee"));
            }
        }
    }
    Ok(())
}
