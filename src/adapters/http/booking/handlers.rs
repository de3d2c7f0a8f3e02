//! HTTP handlers for scheduling and booking endpoints.
//!
//! These handlers connect axum routes to application layer command/query handlers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::adapters::paystack::SIGNATURE_HEADER;
use crate::application::{
    AppointmentLifecycle, BookAppointmentCommand, BookAppointmentHandler, CancelAppointmentCommand,
    CancelAppointmentHandler, ConfirmAppointmentCommand, ConfirmAppointmentHandler,
    ConfirmAppointmentResult, GetAppointmentHandler, GetAppointmentQuery, GetAvailableSlotsHandler,
    GetAvailableSlotsQuery, HandlePaymentWebhookCommand, HandlePaymentWebhookHandler,
    HandleSettlementHandler, Notifier, PublishAvailabilityCommand, PublishAvailabilityHandler,
    SettlementResult, WebhookResult,
};
use crate::domain::appointment::BookingError;
use crate::domain::foundation::AppointmentId;
use crate::ports::{AppointmentRepository, Clock, PaymentGateway, SettlementStore, SlotStore};

use super::dto::{
    AppointmentEnvelope, AppointmentResponse, BookAppointmentRequest, BookingResponse,
    CancelAppointmentRequest, ErrorResponse, PublishScheduleRequest, ScheduleQuery,
    ScheduleResponse, WebhookAck,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Application state for booking routes.
#[derive(Clone)]
pub struct BookingAppState {
    pub slot_store: Arc<dyn SlotStore>,
    pub appointment_repository: Arc<dyn AppointmentRepository>,
    pub settlement_store: Arc<dyn SettlementStore>,
    pub payment_gateway: Arc<dyn PaymentGateway>,
    pub notifier: Notifier,
    pub clock: Arc<dyn Clock>,
    /// Used when a booking request carries no `callbackUrl`.
    pub default_callback_url: Option<String>,
}

impl BookingAppState {
    pub fn new(
        slot_store: Arc<dyn SlotStore>,
        appointment_repository: Arc<dyn AppointmentRepository>,
        settlement_store: Arc<dyn SettlementStore>,
        payment_gateway: Arc<dyn PaymentGateway>,
        notifier: Notifier,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            slot_store,
            appointment_repository,
            settlement_store,
            payment_gateway,
            notifier,
            clock,
            default_callback_url: None,
        }
    }

    pub fn with_callback_url(mut self, url: Option<String>) -> Self {
        self.default_callback_url = url;
        self
    }

    pub fn lifecycle(&self) -> Arc<AppointmentLifecycle> {
        Arc::new(AppointmentLifecycle::new(
            self.appointment_repository.clone(),
            self.slot_store.clone(),
            self.notifier.clone(),
            self.clock.clone(),
        ))
    }

    pub fn publish_availability_handler(&self) -> PublishAvailabilityHandler {
        PublishAvailabilityHandler::new(self.slot_store.clone(), self.clock.clone())
    }

    pub fn get_available_slots_handler(&self) -> GetAvailableSlotsHandler {
        GetAvailableSlotsHandler::new(self.slot_store.clone(), self.clock.clone())
    }

    pub fn book_appointment_handler(&self) -> BookAppointmentHandler {
        BookAppointmentHandler::new(
            self.slot_store.clone(),
            self.appointment_repository.clone(),
            self.payment_gateway.clone(),
            self.notifier.clone(),
            self.clock.clone(),
        )
    }

    pub fn get_appointment_handler(&self) -> GetAppointmentHandler {
        GetAppointmentHandler::new(self.appointment_repository.clone())
    }

    pub fn settlement_handler(&self) -> Arc<HandleSettlementHandler> {
        Arc::new(HandleSettlementHandler::new(
            self.settlement_store.clone(),
            self.lifecycle(),
            self.clock.clone(),
        ))
    }

    pub fn confirm_appointment_handler(&self) -> ConfirmAppointmentHandler {
        ConfirmAppointmentHandler::new(
            self.payment_gateway.clone(),
            self.lifecycle(),
            self.settlement_handler(),
        )
    }

    pub fn cancel_appointment_handler(&self) -> CancelAppointmentHandler {
        CancelAppointmentHandler::new(self.lifecycle())
    }

    pub fn payment_webhook_handler(&self) -> HandlePaymentWebhookHandler {
        HandlePaymentWebhookHandler::new(self.payment_gateway.clone(), self.settlement_handler())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Scheduling Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// PUT /schedule - Publish (or republish) a professional's availability
pub async fn publish_schedule(
    State(state): State<BookingAppState>,
    body: Result<Json<PublishScheduleRequest>, JsonRejection>,
) -> Result<impl IntoResponse, BookingApiError> {
    let Json(request) = body.map_err(rejected)?;
    let cmd = PublishAvailabilityCommand::try_from(request)?;

    let schedule = state.publish_availability_handler().handle(cmd).await?;
    Ok((StatusCode::OK, Json(ScheduleResponse::from(&schedule))))
}

/// GET /schedule/:professional_id - List bookable slots
pub async fn get_schedule(
    State(state): State<BookingAppState>,
    Path(professional_id): Path<String>,
    query: Result<Query<ScheduleQuery>, QueryRejection>,
) -> Result<impl IntoResponse, BookingApiError> {
    let Query(query) = query.map_err(rejected_query)?;
    let filter = query.into_filter()?;
    let slots = state
        .get_available_slots_handler()
        .handle(GetAvailableSlotsQuery {
            professional_id: professional_id.clone(),
            filter,
        })
        .await?;

    Ok(Json(ScheduleResponse::new(professional_id, &slots)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Appointment Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /appointments - Book a slot and start payment
pub async fn book_appointment(
    State(state): State<BookingAppState>,
    body: Result<Json<BookAppointmentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, BookingApiError> {
    let Json(request) = body.map_err(rejected)?;
    let amount = request
        .amount
        .ok_or_else(|| BookingError::validation("amount", "is required"))?;

    let cmd = BookAppointmentCommand {
        professional_id: request.professional_id.unwrap_or_default(),
        client_id: request.client_id.unwrap_or_default(),
        patient_id: request.patient_id.unwrap_or_default(),
        slot_id: request.slot_id.unwrap_or_default(),
        amount,
        payer_email: request.payer_email.unwrap_or_default(),
        payee_account: request.payee_account.unwrap_or_default(),
        callback_url: request
            .callback_url
            .or_else(|| state.default_callback_url.clone()),
    };

    let result = state.book_appointment_handler().handle(cmd).await?;
    Ok((StatusCode::CREATED, Json(BookingResponse::from(&result))))
}

/// GET /appointments/:id - Fetch one appointment
pub async fn get_appointment(
    State(state): State<BookingAppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, BookingApiError> {
    let appointment_id = parse_appointment_id(&id)?;
    let appointment = state
        .get_appointment_handler()
        .handle(GetAppointmentQuery { appointment_id })
        .await?;

    Ok(Json(AppointmentEnvelope {
        appointment: AppointmentResponse::from(&appointment),
        outcome: None,
    }))
}

/// PATCH /appointments/:id/confirm - Reconcile with the gateway
///
/// Returns 202 while the transaction is still open.
pub async fn confirm_appointment(
    State(state): State<BookingAppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, BookingApiError> {
    let appointment_id = parse_appointment_id(&id)?;
    let result = state
        .confirm_appointment_handler()
        .handle(ConfirmAppointmentCommand { appointment_id })
        .await?;

    let status = match result {
        ConfirmAppointmentResult::AwaitingPayment(_) => StatusCode::ACCEPTED,
        _ => StatusCode::OK,
    };
    Ok((
        status,
        Json(AppointmentEnvelope {
            appointment: AppointmentResponse::from(result.appointment()),
            outcome: Some(result.outcome().to_string()),
        }),
    ))
}

/// POST /appointments/:id/cancel - Cancel and free the slot
pub async fn cancel_appointment(
    State(state): State<BookingAppState>,
    Path(id): Path<String>,
    body: Option<Json<CancelAppointmentRequest>>,
) -> Result<impl IntoResponse, BookingApiError> {
    let appointment_id = parse_appointment_id(&id)?;
    let reason = body.and_then(|Json(req)| req.reason);

    let appointment = state
        .cancel_appointment_handler()
        .handle(CancelAppointmentCommand {
            appointment_id,
            reason,
        })
        .await?;

    Ok(Json(AppointmentEnvelope {
        appointment: AppointmentResponse::from(&appointment),
        outcome: None,
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Handler
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhooks/payment - Gateway settlement notifications
///
/// Signature verification needs the raw bytes, so the body is not parsed
/// by axum. A settlement that arrives after the appointment already moved
/// on is acknowledged with 200 so the gateway stops retrying.
pub async fn payment_webhook(
    State(state): State<BookingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, BookingApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(BookingError::InvalidSignature)?
        .to_string();

    let result = state
        .payment_webhook_handler()
        .handle(HandlePaymentWebhookCommand {
            payload: body.to_vec(),
            signature,
        })
        .await;

    let status = match result {
        Ok(WebhookResult::Applied(SettlementResult::Confirmed(_))) => "confirmed",
        Ok(WebhookResult::Applied(SettlementResult::Cancelled(_))) => "cancelled",
        Ok(WebhookResult::Applied(SettlementResult::AlreadyProcessed { .. })) => "already_processed",
        Ok(WebhookResult::Ignored { .. }) => "ignored",
        Err(BookingError::InvalidTransition { current, .. }) => {
            tracing::warn!(status = current.as_str(), "Late settlement acknowledged");
            "superseded"
        }
        Err(e) => return Err(e.into()),
    };
    Ok((StatusCode::OK, Json(WebhookAck::new(status))))
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════════════════

fn parse_appointment_id(raw: &str) -> Result<AppointmentId, BookingApiError> {
    raw.parse::<AppointmentId>()
        .map_err(|_| BookingError::validation("id", "must be a UUID").into())
}

fn rejected(rejection: JsonRejection) -> BookingApiError {
    BookingError::validation("body", rejection.body_text()).into()
}

fn rejected_query(rejection: QueryRejection) -> BookingApiError {
    BookingError::validation("query", rejection.body_text()).into()
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts to HTTP responses.
#[derive(Debug)]
pub struct BookingApiError(pub BookingError);

impl From<BookingError> for BookingApiError {
    fn from(err: BookingError) -> Self {
        BookingApiError(err)
    }
}

impl BookingApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            BookingError::Validation { .. } => StatusCode::BAD_REQUEST,
            BookingError::NotFound { .. } => StatusCode::NOT_FOUND,
            BookingError::SlotConflict(_) => StatusCode::CONFLICT,
            BookingError::InvalidTransition { .. } => StatusCode::CONFLICT,
            BookingError::InvalidSignature => StatusCode::UNAUTHORIZED,
            BookingError::PaymentInit { .. } => StatusCode::BAD_GATEWAY,
            BookingError::PaymentCallback { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            BookingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BookingApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.0.code().to_string();

        let body = match &self.0 {
            BookingError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal error while handling request");
                ErrorResponse::new(code, "An internal error occurred")
            }
            BookingError::Validation { field, .. } => {
                ErrorResponse::with_details(code, self.0.message(), json!({ "field": field }))
            }
            BookingError::SlotConflict(slot_id) => ErrorResponse::with_details(
                code,
                self.0.message(),
                json!({ "slotId": slot_id.to_string() }),
            ),
            BookingError::PaymentInit { appointment_id, .. } => ErrorResponse::with_details(
                code,
                self.0.message(),
                json!({ "appointmentId": appointment_id.to_string() }),
            ),
            BookingError::InvalidTransition { current, attempted } => ErrorResponse::with_details(
                code,
                self.0.message(),
                json!({ "current": current.as_str(), "attempted": attempted.as_str() }),
            ),
            BookingError::PaymentCallback { .. } => {
                tracing::error!(error = %self.0.message(), "Payment settlement rejected");
                ErrorResponse::new(code, self.0.message())
            }
            _ => ErrorResponse::new(code, self.0.message()),
        };

        (status, Json(body)).into_response()
    }
}
