//! Schedule aggregate: one per professional, slots kept ordered.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ProfessionalId, ScheduleId, SlotId, Timestamp};

use super::{validate_windows, DayFilter, Slot, SlotError, SlotWindow};

/// One window in a bulk availability upsert.
///
/// With an `id` the window targets that slot; without one it is matched
/// against an existing slot on the same date and start time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityInput {
    pub id: Option<SlotId>,
    pub window: SlotWindow,
}

impl AvailabilityInput {
    pub fn new(window: SlotWindow) -> Self {
        Self { id: None, window }
    }
}

/// The difference between a schedule and a requested availability set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleChanges {
    /// New available slots.
    pub inserted: Vec<Slot>,
    /// Available slots whose window changes.
    pub reshaped: Vec<Slot>,
    /// Available slots absent from the request.
    pub removed: Vec<SlotId>,
    /// Held slots absent from the request; they are never removed.
    pub kept_held: Vec<SlotId>,
}

impl ScheduleChanges {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.reshaped.is_empty() && self.removed.is_empty()
    }
}

/// The ordered collection of slots belonging to one professional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub professional_id: ProfessionalId,
    pub slots: Vec<Slot>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new(professional_id: ProfessionalId, now: Timestamp) -> Self {
        Self {
            id: ScheduleId::new(),
            professional_id,
            slots: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Works out how to bring the schedule in line with `inputs`.
    ///
    /// Held slots are never reshaped or removed. The resulting slot set
    /// must be free of overlaps.
    pub fn plan_publication(&self, inputs: &[AvailabilityInput]) -> Result<ScheduleChanges, SlotError> {
        let windows: Vec<SlotWindow> = inputs.iter().map(|i| i.window).collect();
        validate_windows(&windows).map_err(|e| SlotError::InvalidAvailability(e.to_string()))?;

        let mut changes = ScheduleChanges::default();
        let mut matched: Vec<SlotId> = Vec::new();
        let mut resulting: Vec<SlotWindow> = Vec::new();

        for input in inputs {
            let existing = match input.id {
                Some(id) => Some(self.slot(id).ok_or_else(|| {
                    SlotError::InvalidAvailability(format!("unknown slot id {}", id))
                })?),
                None => self.slots.iter().find(|s| {
                    s.window.date == input.window.date
                        && s.window.start_time == input.window.start_time
                }),
            };

            match existing {
                Some(slot) => {
                    if matched.contains(&slot.id) {
                        return Err(SlotError::InvalidAvailability(format!(
                            "slot {} listed twice",
                            slot.id
                        )));
                    }
                    matched.push(slot.id);
                    if slot.window != input.window {
                        if slot.state.is_held() {
                            return Err(SlotError::InvalidAvailability(format!(
                                "slot {} is {} and cannot be changed",
                                slot.id,
                                slot.state.as_str()
                            )));
                        }
                        let mut reshaped = slot.clone();
                        reshaped.window = input.window;
                        changes.reshaped.push(reshaped);
                    }
                    resulting.push(input.window);
                }
                None => {
                    let slot = Slot::available(self.professional_id.clone(), input.window);
                    resulting.push(slot.window);
                    changes.inserted.push(slot);
                }
            }
        }

        for slot in &self.slots {
            if matched.contains(&slot.id) {
                continue;
            }
            if slot.state.is_held() {
                changes.kept_held.push(slot.id);
                resulting.push(slot.window);
            } else {
                changes.removed.push(slot.id);
            }
        }

        validate_windows(&resulting).map_err(|e| SlotError::InvalidAvailability(e.to_string()))?;
        Ok(changes)
    }

    /// Applies a plan produced by `plan_publication`.
    pub fn apply(&mut self, changes: &ScheduleChanges, now: Timestamp) {
        self.slots.retain(|s| !changes.removed.contains(&s.id));
        for reshaped in &changes.reshaped {
            if let Some(slot) = self.slot_mut(reshaped.id) {
                slot.window = reshaped.window;
            }
        }
        self.slots.extend(changes.inserted.iter().cloned());
        self.sort_slots();
        self.updated_at = now;
    }

    /// Available slots in ascending date/time order.
    pub fn available(&self, filter: Option<DayFilter>) -> Vec<Slot> {
        self.slots
            .iter()
            .filter(|s| !s.state.is_held())
            .filter(|s| filter.map_or(true, |f| f.matches(s.window.date)))
            .cloned()
            .collect()
    }

    pub fn slot(&self, id: SlotId) -> Option<&Slot> {
        self.slots.iter().find(|s| s.id == id)
    }

    pub fn slot_mut(&mut self, id: SlotId) -> Option<&mut Slot> {
        self.slots.iter_mut().find(|s| s.id == id)
    }

    pub fn sort_slots(&mut self) {
        self.slots.sort_by_key(|s| s.window.sort_key());
    }
}
