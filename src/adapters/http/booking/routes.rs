//! Axum router configuration for booking endpoints.

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use super::handlers::{
    book_appointment, cancel_appointment, confirm_appointment, get_appointment, get_schedule,
    health, payment_webhook, publish_schedule, BookingAppState,
};

/// Schedule routes.
///
/// - `PUT /schedule` - Publish availability
/// - `GET /schedule/:professional_id` - Open slots, optionally `?date=` or `?weekday=`
pub fn schedule_routes() -> Router<BookingAppState> {
    Router::new()
        .route("/schedule", put(publish_schedule))
        .route("/schedule/:professional_id", get(get_schedule))
}

/// Appointment routes.
///
/// - `POST /appointments` - Book a slot
/// - `GET /appointments/:id` - Fetch an appointment
/// - `PATCH /appointments/:id/confirm` - Reconcile payment with the gateway
/// - `POST /appointments/:id/cancel` - Cancel
pub fn appointment_routes() -> Router<BookingAppState> {
    Router::new()
        .route("/appointments", post(book_appointment))
        .route("/appointments/:id", get(get_appointment))
        .route("/appointments/:id/confirm", patch(confirm_appointment))
        .route("/appointments/:id/cancel", post(cancel_appointment))
}

/// Webhook routes. No caller auth; the gateway signature is verified instead.
pub fn webhook_routes() -> Router<BookingAppState> {
    Router::new().route("/webhooks/payment", post(payment_webhook))
}

/// Complete booking router.
pub fn booking_router() -> Router<BookingAppState> {
    Router::new()
        .route("/health", get(health))
        .merge(schedule_routes())
        .merge(appointment_routes())
        .merge(webhook_routes())
}
