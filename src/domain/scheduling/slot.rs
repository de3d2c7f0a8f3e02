//! Slot entity and its state machine.
//!
//! A slot's `state` is the only record of its bookability. The `holder`
//! names the appointment that moved it out of `available` and guards every
//! later transition, so a stale release cannot free a slot someone else
//! has since reserved.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AppointmentId, ProfessionalId, SlotId, StateMachine, Timestamp};

use super::SlotError;

/// Bookability of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    /// Open for reservation.
    Available,
    /// Held by a pending appointment while payment completes.
    Reserved,
    /// Held by a confirmed appointment.
    Booked,
}

impl SlotState {
    /// Storage/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotState::Available => "available",
            SlotState::Reserved => "reserved",
            SlotState::Booked => "booked",
        }
    }

    /// Parses the storage representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(SlotState::Available),
            "reserved" => Some(SlotState::Reserved),
            "booked" => Some(SlotState::Booked),
            _ => None,
        }
    }

    /// True when some appointment currently holds the slot.
    pub fn is_held(&self) -> bool {
        !matches!(self, SlotState::Available)
    }
}

impl StateMachine for SlotState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SlotState::*;
        matches!(
            (self, target),
            (Available, Reserved) | (Reserved, Booked) | (Reserved, Available) | (Booked, Available)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SlotState::*;
        match self {
            Available => vec![Reserved],
            Reserved => vec![Booked, Available],
            Booked => vec![Available],
        }
    }
}

/// A date plus a start/end wall-clock time, interpreted as UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotWindow {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl SlotWindow {
    pub fn new(date: NaiveDate, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            date,
            start_time,
            end_time,
        }
    }

    pub fn starts_at(&self) -> Timestamp {
        Timestamp::from_date_time(self.date, self.start_time)
    }

    pub fn ends_at(&self) -> Timestamp {
        Timestamp::from_date_time(self.date, self.end_time)
    }

    /// Windows overlap when they share a date and their time ranges intersect.
    pub fn overlaps(&self, other: &SlotWindow) -> bool {
        self.date == other.date
            && self.start_time < other.end_time
            && other.start_time < self.end_time
    }

    /// Sort key: ascending date, then start time.
    pub fn sort_key(&self) -> (NaiveDate, NaiveTime) {
        (self.date, self.start_time)
    }
}

/// A discrete bookable time window owned by a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    pub professional_id: ProfessionalId,
    pub window: SlotWindow,
    pub state: SlotState,
    pub holder: Option<AppointmentId>,
}

impl Slot {
    /// Creates an available slot.
    pub fn available(professional_id: ProfessionalId, window: SlotWindow) -> Self {
        Self {
            id: SlotId::new(),
            professional_id,
            window,
            state: SlotState::Available,
            holder: None,
        }
    }

    pub fn ends_at(&self) -> Timestamp {
        self.window.ends_at()
    }

    /// True once the slot's end time is at or before `now`.
    pub fn is_elapsed(&self, now: Timestamp) -> bool {
        !self.ends_at().is_after(&now)
    }

    /// Derived boolean view for clients that expect one.
    pub fn is_booked(&self) -> bool {
        self.state.is_held()
    }

    /// `available -> reserved`, recording the holder.
    pub fn reserve(&mut self, holder: AppointmentId) -> Result<(), SlotError> {
        self.guarded(SlotState::Available, None, SlotState::Reserved)?;
        self.holder = Some(holder);
        Ok(())
    }

    /// `reserved -> booked`, only for the current holder.
    pub fn finalize(&mut self, holder: AppointmentId) -> Result<(), SlotError> {
        self.guarded(SlotState::Reserved, Some(holder), SlotState::Booked)
    }

    /// `reserved|booked -> available`, only for the current holder.
    pub fn release(&mut self, holder: AppointmentId) -> Result<(), SlotError> {
        if self.holder != Some(holder) || !self.state.is_held() {
            return Err(self.conflict());
        }
        self.state = SlotState::Available;
        self.holder = None;
        Ok(())
    }

    fn guarded(
        &mut self,
        expected: SlotState,
        holder: Option<AppointmentId>,
        target: SlotState,
    ) -> Result<(), SlotError> {
        if self.state != expected || self.holder != holder {
            return Err(self.conflict());
        }
        match self.state.transition_to(target) {
            Ok(next) => {
                self.state = next;
                Ok(())
            }
            Err(_) => Err(self.conflict()),
        }
    }

    fn conflict(&self) -> SlotError {
        SlotError::Conflict {
            slot_id: self.id,
            state: self.state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(start: (u32, u32), end: (u32, u32)) -> SlotWindow {
        SlotWindow::new(
            NaiveDate::from_ymd_opt(2030, 5, 6).unwrap(),
            NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
        )
    }

    fn slot() -> Slot {
        Slot::available(ProfessionalId::new("dr-ada").unwrap(), window((9, 0), (9, 30)))
    }

    #[test]
    fn reserve_records_holder() {
        let mut s = slot();
        let holder = AppointmentId::new();
        s.reserve(holder).unwrap();
        assert_eq!(s.state, SlotState::Reserved);
        assert_eq!(s.holder, Some(holder));
        assert!(s.is_booked());
    }

    #[test]
    fn second_reserve_conflicts() {
        let mut s = slot();
        s.reserve(AppointmentId::new()).unwrap();
        let err = s.reserve(AppointmentId::new()).unwrap_err();
        assert!(matches!(err, SlotError::Conflict { state: SlotState::Reserved, .. }));
    }

    #[test]
    fn finalize_requires_matching_holder() {
        let mut s = slot();
        let holder = AppointmentId::new();
        s.reserve(holder).unwrap();
        assert!(s.finalize(AppointmentId::new()).is_err());
        s.finalize(holder).unwrap();
        assert_eq!(s.state, SlotState::Booked);
    }

    #[test]
    fn release_by_stale_holder_is_rejected() {
        let mut s = slot();
        let first = AppointmentId::new();
        s.reserve(first).unwrap();
        s.release(first).unwrap();
        let second = AppointmentId::new();
        s.reserve(second).unwrap();

        assert!(s.release(first).is_err());
        assert_eq!(s.holder, Some(second));
    }

    #[test]
    fn reserve_then_release_restores_original() {
        let original = slot();
        let mut s = original.clone();
        let holder = AppointmentId::new();
        s.reserve(holder).unwrap();
        s.release(holder).unwrap();
        assert_eq!(s, original);
    }

    #[test]
    fn overlapping_windows_are_detected() {
        assert!(window((9, 0), (9, 30)).overlaps(&window((9, 15), (9, 45))));
        assert!(!window((9, 0), (9, 30)).overlaps(&window((9, 30), (10, 0))));
    }

    #[test]
    fn slot_state_transitions_match_table() {
        assert!(SlotState::Available.can_transition_to(&SlotState::Reserved));
        assert!(!SlotState::Available.can_transition_to(&SlotState::Booked));
        assert!(SlotState::Booked.can_transition_to(&SlotState::Available));
        assert!(!SlotState::Available.is_terminal());
    }
}
