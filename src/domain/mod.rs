//! Domain layer - pure business logic with no infrastructure dependencies.

pub mod appointment;
pub mod foundation;
pub mod scheduling;
