//! ConfirmAppointmentHandler - client-triggered settlement check.
//!
//! Used when the client returns from checkout before the webhook has
//! arrived: asks the gateway for the appointment's reference and applies
//! whatever it reports through the same settlement path as the webhook.

use std::sync::Arc;

use crate::domain::appointment::{Appointment, AppointmentStatus, BookingError};
use crate::domain::foundation::AppointmentId;
use crate::ports::PaymentGateway;

use super::{AppointmentLifecycle, HandleSettlementHandler, SettlementResult};

#[derive(Debug, Clone)]
pub struct ConfirmAppointmentCommand {
    pub appointment_id: AppointmentId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAppointmentResult {
    Confirmed(Appointment),
    /// Nothing to do; the appointment was confirmed earlier.
    AlreadyConfirmed(Appointment),
    /// The gateway has no final outcome yet.
    AwaitingPayment(Appointment),
    /// The gateway reported a failed payment; the appointment is cancelled.
    Declined(Appointment),
}

impl ConfirmAppointmentResult {
    pub fn appointment(&self) -> &Appointment {
        match self {
            ConfirmAppointmentResult::Confirmed(a)
            | ConfirmAppointmentResult::AlreadyConfirmed(a)
            | ConfirmAppointmentResult::AwaitingPayment(a)
            | ConfirmAppointmentResult::Declined(a) => a,
        }
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            ConfirmAppointmentResult::Confirmed(_) => "confirmed",
            ConfirmAppointmentResult::AlreadyConfirmed(_) => "already_confirmed",
            ConfirmAppointmentResult::AwaitingPayment(_) => "awaiting_payment",
            ConfirmAppointmentResult::Declined(_) => "declined",
        }
    }
}

pub struct ConfirmAppointmentHandler {
    gateway: Arc<dyn PaymentGateway>,
    lifecycle: Arc<AppointmentLifecycle>,
    settlement: Arc<HandleSettlementHandler>,
}

impl ConfirmAppointmentHandler {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        lifecycle: Arc<AppointmentLifecycle>,
        settlement: Arc<HandleSettlementHandler>,
    ) -> Self {
        Self {
            gateway,
            lifecycle,
            settlement,
        }
    }

    pub async fn handle(
        &self,
        cmd: ConfirmAppointmentCommand,
    ) -> Result<ConfirmAppointmentResult, BookingError> {
        let appointment = self.lifecycle.load(cmd.appointment_id).await?;
        match appointment.status {
            AppointmentStatus::Confirmed => {
                return Ok(ConfirmAppointmentResult::AlreadyConfirmed(appointment))
            }
            AppointmentStatus::Pending => {}
            current => {
                return Err(BookingError::invalid_transition(
                    current,
                    AppointmentStatus::Confirmed,
                ))
            }
        }

        let notice = self
            .gateway
            .verify_transaction(&appointment.payment_reference)
            .await
            .map_err(|e| {
                tracing::warn!(
                    appointment_id = %appointment.id,
                    reference = %appointment.payment_reference,
                    error = %e,
                    "Transaction verification failed"
                );
                BookingError::payment_callback(e.message)
            })?;

        let Some(notice) = notice else {
            return Ok(ConfirmAppointmentResult::AwaitingPayment(appointment));
        };

        match self.settlement.handle(notice).await? {
            SettlementResult::Confirmed(a) => Ok(ConfirmAppointmentResult::Confirmed(a)),
            SettlementResult::Cancelled(a) => Ok(ConfirmAppointmentResult::Declined(a)),
            SettlementResult::AlreadyProcessed { appointment_id } => {
                let latest = self.lifecycle.load(appointment_id).await?;
                if latest.status == AppointmentStatus::Confirmed {
                    Ok(ConfirmAppointmentResult::AlreadyConfirmed(latest))
                } else {
                    Ok(ConfirmAppointmentResult::Declined(latest))
                }
            }
        }
    }
}
