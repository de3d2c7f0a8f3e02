//! GetAppointmentHandler - Query handler for a single appointment.

use std::sync::Arc;

use crate::domain::appointment::{Appointment, BookingError};
use crate::domain::foundation::AppointmentId;
use crate::ports::AppointmentRepository;

#[derive(Debug, Clone)]
pub struct GetAppointmentQuery {
    pub appointment_id: AppointmentId,
}

pub struct GetAppointmentHandler {
    appointments: Arc<dyn AppointmentRepository>,
}

impl GetAppointmentHandler {
    pub fn new(appointments: Arc<dyn AppointmentRepository>) -> Self {
        Self { appointments }
    }

    pub async fn handle(&self, query: GetAppointmentQuery) -> Result<Appointment, BookingError> {
        self.appointments
            .find_by_id(query.appointment_id)
            .await?
            .ok_or_else(|| BookingError::appointment_not_found(query.appointment_id))
    }
}
