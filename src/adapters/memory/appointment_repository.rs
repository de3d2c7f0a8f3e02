//! In-memory AppointmentRepository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::domain::appointment::{Appointment, AppointmentStatus, PaymentReference};
use crate::domain::foundation::{AppointmentId, DomainError, ErrorCode, SlotId, Timestamp};
use crate::ports::AppointmentRepository;

#[derive(Default)]
pub struct InMemoryAppointmentRepository {
    appointments: Mutex<HashMap<AppointmentId, Appointment>>,
}

impl InMemoryAppointmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<AppointmentId, Appointment>>, DomainError> {
        self.appointments
            .lock()
            .map_err(|_| DomainError::new(ErrorCode::InternalError, "appointment store lock poisoned"))
    }

    /// All appointments referencing a slot, any status.
    pub fn for_slot(&self, slot_id: SlotId) -> Vec<Appointment> {
        self.lock()
            .map(|map| map.values().filter(|a| a.slot_id == slot_id).cloned().collect())
            .unwrap_or_default()
    }

    fn sorted_by_created(mut list: Vec<Appointment>, limit: usize) -> Vec<Appointment> {
        list.sort_by_key(|a| a.created_at);
        list.truncate(limit);
        list
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn insert(&self, appointment: &Appointment) -> Result<(), DomainError> {
        let mut map = self.lock()?;
        if map.contains_key(&appointment.id) {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("appointment {} already exists", appointment.id),
            ));
        }
        let slot_taken = map
            .values()
            .any(|a| a.slot_id == appointment.slot_id && a.is_active());
        if appointment.is_active() && slot_taken {
            return Err(DomainError::new(
                ErrorCode::SlotConflict,
                format!("slot {} already has an active appointment", appointment.slot_id),
            )
            .with_detail("slot_id", appointment.slot_id.to_string()));
        }
        map.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn compare_and_set(
        &self,
        appointment: &Appointment,
        expected: AppointmentStatus,
    ) -> Result<bool, DomainError> {
        let mut map = self.lock()?;
        match map.get_mut(&appointment.id) {
            Some(stored) if stored.status == expected => {
                *stored = appointment.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(DomainError::new(
                ErrorCode::AppointmentNotFound,
                format!("appointment {} not found", appointment.id),
            )
            .with_detail("id", appointment.id.to_string())),
        }
    }

    async fn find_by_id(&self, id: AppointmentId) -> Result<Option<Appointment>, DomainError> {
        Ok(self.lock()?.get(&id).cloned())
    }

    async fn find_by_reference(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<Appointment>, DomainError> {
        Ok(self
            .lock()?
            .values()
            .find(|a| &a.payment_reference == reference)
            .cloned())
    }

    async fn find_active_for_slot(&self, slot_id: SlotId) -> Result<Option<Appointment>, DomainError> {
        Ok(self
            .lock()?
            .values()
            .find(|a| a.slot_id == slot_id && a.is_active())
            .cloned())
    }

    async fn find_pending_created_before(
        &self,
        cutoff: Timestamp,
        limit: usize,
    ) -> Result<Vec<Appointment>, DomainError> {
        let list = self
            .lock()?
            .values()
            .filter(|a| a.status == AppointmentStatus::Pending && !a.created_at.is_after(&cutoff))
            .cloned()
            .collect();
        Ok(Self::sorted_by_created(list, limit))
    }

    async fn find_confirmed_ended_before(
        &self,
        now: Timestamp,
        limit: usize,
    ) -> Result<Vec<Appointment>, DomainError> {
        let list = self
            .lock()?
            .values()
            .filter(|a| a.status == AppointmentStatus::Confirmed && !a.slot_ends_at.is_after(&now))
            .cloned()
            .collect();
        Ok(Self::sorted_by_created(list, limit))
    }
}
