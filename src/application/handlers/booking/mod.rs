//! Booking command and query handlers.
//!
//! ## Commands
//!
//! - `BookAppointmentHandler` - Reserve a slot, open a pending appointment, start payment
//! - `HandleSettlementHandler` - Apply a settlement (idempotent)
//! - `HandlePaymentWebhookHandler` - Verify and dispatch a gateway webhook
//! - `ConfirmAppointmentHandler` - Poll the gateway and apply its settlement
//! - `CancelAppointmentHandler` - Cancel on behalf of the client or professional
//!
//! ## Queries
//!
//! - `GetAppointmentHandler` - Fetch one appointment
//!
//! `AppointmentLifecycle` is the shared transition service the commands
//! (and the maintenance sweep) go through.

mod appointment_lifecycle;
mod book_appointment;
mod cancel_appointment;
mod confirm_appointment;
mod get_appointment;
mod handle_payment_webhook;
mod handle_settlement;

pub use appointment_lifecycle::AppointmentLifecycle;
pub use book_appointment::{BookAppointmentCommand, BookAppointmentHandler, BookAppointmentResult};
pub use cancel_appointment::{CancelAppointmentCommand, CancelAppointmentHandler};
pub use confirm_appointment::{
    ConfirmAppointmentCommand, ConfirmAppointmentHandler, ConfirmAppointmentResult,
};
pub use get_appointment::{GetAppointmentHandler, GetAppointmentQuery};
pub use handle_payment_webhook::{
    HandlePaymentWebhookCommand, HandlePaymentWebhookHandler, WebhookResult,
};
pub use handle_settlement::{HandleSettlementHandler, SettlementResult};
