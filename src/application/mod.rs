//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Command handlers change state through `AppointmentLifecycle` and the
//! slot compare-and-swap primitives; query handlers only read.
//!
//! `ScheduleMaintenance` is the background sweep that expires unpaid
//! appointments and reclaims elapsed slots.

pub mod handlers;
mod maintenance;
mod notifier;

#[cfg(test)]
pub(crate) mod test_support;

pub use handlers::booking::{
    AppointmentLifecycle, BookAppointmentCommand, BookAppointmentHandler, BookAppointmentResult,
    CancelAppointmentCommand, CancelAppointmentHandler, ConfirmAppointmentCommand,
    ConfirmAppointmentHandler, ConfirmAppointmentResult, GetAppointmentHandler,
    GetAppointmentQuery, HandlePaymentWebhookCommand, HandlePaymentWebhookHandler,
    HandleSettlementHandler, SettlementResult, WebhookResult,
};
pub use handlers::scheduling::{
    GetAvailableSlotsHandler, GetAvailableSlotsQuery, PublishAvailabilityCommand,
    PublishAvailabilityHandler,
};
pub use maintenance::{MaintenanceConfig, ScheduleMaintenance, SweepReport};
pub use notifier::Notifier;
