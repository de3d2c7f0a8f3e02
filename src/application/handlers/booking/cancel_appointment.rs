//! CancelAppointmentHandler - Command handler for client/professional cancellation.

use std::sync::Arc;

use crate::domain::appointment::{Appointment, BookingError, CancellationReason};
use crate::domain::foundation::AppointmentId;

use super::AppointmentLifecycle;

#[derive(Debug, Clone)]
pub struct CancelAppointmentCommand {
    pub appointment_id: AppointmentId,
    /// Defaults to `client_requested`.
    pub reason: Option<String>,
}

pub struct CancelAppointmentHandler {
    lifecycle: Arc<AppointmentLifecycle>,
}

impl CancelAppointmentHandler {
    pub fn new(lifecycle: Arc<AppointmentLifecycle>) -> Self {
        Self { lifecycle }
    }

    pub async fn handle(&self, cmd: CancelAppointmentCommand) -> Result<Appointment, BookingError> {
        let reason = parse_reason(cmd.reason.as_deref())?;
        let appointment = self.lifecycle.load(cmd.appointment_id).await?;
        self.lifecycle.cancel(&appointment, reason).await
    }
}

/// Payment reasons belong to the settlement and sweep paths only.
fn parse_reason(raw: Option<&str>) -> Result<CancellationReason, BookingError> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        None => Ok(CancellationReason::ClientRequested),
        Some(r) => match CancellationReason::parse(r) {
            Some(reason @ CancellationReason::ClientRequested)
            | Some(reason @ CancellationReason::ProfessionalRequested) => Ok(reason),
            _ => Err(BookingError::validation(
                "reason",
                "must be client_requested or professional_requested",
            )),
        },
    }
}
