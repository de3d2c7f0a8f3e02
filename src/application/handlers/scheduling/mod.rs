//! Scheduling command and query handlers.
//!
//! - `PublishAvailabilityHandler` - Replace a professional's open slots
//! - `GetAvailableSlotsHandler` - List bookable slots

mod get_available_slots;
mod publish_availability;

pub use get_available_slots::{GetAvailableSlotsHandler, GetAvailableSlotsQuery};
pub use publish_availability::{
    PublishAvailabilityCommand, PublishAvailabilityHandler, MAX_SLOTS_PER_PUBLICATION,
};
