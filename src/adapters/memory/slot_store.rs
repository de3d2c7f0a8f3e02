//! In-memory SlotStore.
//!
//! Each primitive runs its check and its write inside one mutex critical
//! section, which gives the same all-or-nothing behavior as a conditional
//! UPDATE. Used for tests and for running without a database.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::domain::foundation::{AppointmentId, ProfessionalId, SlotId, Timestamp};
use crate::domain::scheduling::{AvailabilityInput, DayFilter, Schedule, Slot, SlotError};
use crate::ports::SlotStore;

#[derive(Default)]
struct Inner {
    schedules: HashMap<ProfessionalId, Schedule>,
    owners: HashMap<SlotId, ProfessionalId>,
}

impl Inner {
    fn slot_mut(&mut self, slot_id: SlotId) -> Result<&mut Slot, SlotError> {
        let owner = self.owners.get(&slot_id).ok_or(SlotError::NotFound(slot_id))?;
        self.schedules
            .get_mut(owner)
            .and_then(|s| s.slot_mut(slot_id))
            .ok_or(SlotError::NotFound(slot_id))
    }
}

#[derive(Default)]
pub struct InMemorySlotStore {
    inner: Mutex<Inner>,
}

impl InMemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, SlotError> {
        self.inner
            .lock()
            .map_err(|_| SlotError::Infrastructure("slot store lock poisoned".to_string()))
    }

    fn mutate(
        &self,
        slot_id: SlotId,
        op: impl FnOnce(&mut Slot) -> Result<(), SlotError>,
    ) -> Result<Slot, SlotError> {
        let mut inner = self.lock()?;
        let slot = inner.slot_mut(slot_id)?;
        op(slot)?;
        Ok(slot.clone())
    }
}

#[async_trait]
impl SlotStore for InMemorySlotStore {
    async fn publish(
        &self,
        professional_id: &ProfessionalId,
        availability: &[AvailabilityInput],
        now: Timestamp,
    ) -> Result<Schedule, SlotError> {
        let mut inner = self.lock()?;
        let mut schedule = inner
            .schedules
            .get(professional_id)
            .cloned()
            .unwrap_or_else(|| Schedule::new(professional_id.clone(), now));

        let changes = schedule.plan_publication(availability)?;
        schedule.apply(&changes, now);

        for removed in &changes.removed {
            inner.owners.remove(removed);
        }
        for slot in &changes.inserted {
            inner.owners.insert(slot.id, professional_id.clone());
        }
        inner.schedules.insert(professional_id.clone(), schedule.clone());
        Ok(schedule)
    }

    async fn find_schedule(&self, professional_id: &ProfessionalId) -> Result<Option<Schedule>, SlotError> {
        Ok(self.lock()?.schedules.get(professional_id).cloned())
    }

    async fn find_slot(&self, slot_id: SlotId) -> Result<Option<Slot>, SlotError> {
        let mut inner = self.lock()?;
        match inner.slot_mut(slot_id) {
            Ok(slot) => Ok(Some(slot.clone())),
            Err(SlotError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list_available(
        &self,
        professional_id: &ProfessionalId,
        filter: Option<DayFilter>,
    ) -> Result<Vec<Slot>, SlotError> {
        let inner = self.lock()?;
        let schedule = inner
            .schedules
            .get(professional_id)
            .ok_or_else(|| SlotError::ScheduleNotFound(professional_id.clone()))?;
        Ok(schedule.available(filter))
    }

    async fn reserve(&self, slot_id: SlotId, holder: AppointmentId) -> Result<Slot, SlotError> {
        self.mutate(slot_id, |slot| slot.reserve(holder))
    }

    async fn finalize(&self, slot_id: SlotId, holder: AppointmentId) -> Result<Slot, SlotError> {
        self.mutate(slot_id, |slot| slot.finalize(holder))
    }

    async fn release(&self, slot_id: SlotId, holder: AppointmentId) -> Result<Slot, SlotError> {
        self.mutate(slot_id, |slot| slot.release(holder))
    }

    async fn list_elapsed_held(&self, now: Timestamp, limit: usize) -> Result<Vec<Slot>, SlotError> {
        let inner = self.lock()?;
        let mut elapsed: Vec<Slot> = inner
            .schedules
            .values()
            .flat_map(|s| s.slots.iter())
            .filter(|s| s.state.is_held() && s.is_elapsed(now))
            .cloned()
            .collect();
        elapsed.sort_by_key(|s| s.window.sort_key());
        elapsed.truncate(limit);
        Ok(elapsed)
    }
}
