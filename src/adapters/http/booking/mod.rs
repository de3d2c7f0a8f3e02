//! HTTP adapter for scheduling and booking endpoints.
//!
//! - `GET /health`
//! - `PUT /schedule` - Publish availability
//! - `GET /schedule/:professional_id` - Open slots
//! - `POST /appointments` - Book a slot and start payment
//! - `GET /appointments/:id` - Fetch an appointment
//! - `PATCH /appointments/:id/confirm` - Reconcile payment
//! - `POST /appointments/:id/cancel` - Cancel
//! - `POST /webhooks/payment` - Gateway settlement webhook

pub mod dto;
mod handlers;
mod routes;

pub use dto::*;
pub use handlers::{BookingApiError, BookingAppState};
pub use routes::{appointment_routes, booking_router, schedule_routes, webhook_routes};
