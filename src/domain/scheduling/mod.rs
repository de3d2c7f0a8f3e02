//! Scheduling domain module.
//!
//! Slot inventory for professionals.
//!
//! # Module Structure
//!
//! - `slot` - Slot entity and SlotState state machine
//! - `schedule` - Schedule aggregate and availability publication
//! - `availability` - Expansion rules, window validation, day filters
//! - `errors` - SlotError

mod availability;
mod errors;
mod schedule;
mod slot;

pub use availability::{
    validate_windows, AvailabilityRule, DayFilter, DaySpec, MAX_RULE_SPAN_DAYS, MAX_SLOT_MINUTES,
    MIN_SLOT_MINUTES,
};
pub use errors::SlotError;
pub use schedule::{AvailabilityInput, Schedule, ScheduleChanges};
pub use slot::{Slot, SlotState, SlotWindow};
