//! HTTP DTOs for scheduling and booking endpoints.
//!
//! JSON is camelCase at this boundary. Request bodies keep every field
//! optional so a missing field reaches validation and comes back as a
//! `VALIDATION_FAILED` body rather than a framework rejection.

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::application::{BookAppointmentResult, PublishAvailabilityCommand};
use crate::domain::appointment::{Appointment, BookingError};
use crate::domain::foundation::SlotId;
use crate::domain::scheduling::{
    AvailabilityInput, AvailabilityRule, DayFilter, DaySpec, Schedule, Slot, SlotWindow,
};
use crate::ports::TransactionHandle;

// ════════════════════════════════════════════════════════════════════════════════
// Parsing helpers
// ════════════════════════════════════════════════════════════════════════════════

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, BookingError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| BookingError::validation(field, "is required"))
}

pub(crate) fn parse_date(value: &str, field: &str) -> Result<NaiveDate, BookingError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| BookingError::validation(field, "must be a date (YYYY-MM-DD)"))
}

fn parse_time(value: &str, field: &str) -> Result<NaiveTime, BookingError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| BookingError::validation(field, "must be a time (HH:MM)"))
}

pub(crate) fn parse_weekday(value: &str, field: &str) -> Result<Weekday, BookingError> {
    value
        .trim()
        .parse::<Weekday>()
        .map_err(|_| BookingError::validation(field, "must be a weekday (mon..sun)"))
}

fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// One explicit availability window.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityWindowRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

impl AvailabilityWindowRequest {
    fn into_input(self) -> Result<AvailabilityInput, BookingError> {
        let id = match self.id.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            Some(raw) => Some(
                raw.parse::<SlotId>()
                    .map_err(|_| BookingError::validation("availability.id", "must be a UUID"))?,
            ),
            None => None,
        };
        let window = SlotWindow::new(
            parse_date(required(&self.date, "availability.date")?, "availability.date")?,
            parse_time(required(&self.start_time, "availability.startTime")?, "availability.startTime")?,
            parse_time(required(&self.end_time, "availability.endTime")?, "availability.endTime")?,
        );
        Ok(AvailabilityInput { id, window })
    }
}

/// A rule that expands into back-to-back slots.
///
/// Either `dates`, or `weekdays` with a `from`/`until` range.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRuleRequest {
    #[serde(default)]
    pub dates: Option<Vec<String>>,
    #[serde(default)]
    pub weekdays: Option<Vec<String>>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub until: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub slot_minutes: Option<i64>,
}

impl AvailabilityRuleRequest {
    fn into_rule(self) -> Result<AvailabilityRule, BookingError> {
        let days = match (self.dates, self.weekdays) {
            (Some(dates), None) => DaySpec::Dates(
                dates
                    .iter()
                    .map(|d| parse_date(d, "rules.dates"))
                    .collect::<Result<_, _>>()?,
            ),
            (None, Some(weekdays)) => DaySpec::Weekdays {
                weekdays: weekdays
                    .iter()
                    .map(|w| parse_weekday(w, "rules.weekdays"))
                    .collect::<Result<_, _>>()?,
                from: parse_date(required(&self.from, "rules.from")?, "rules.from")?,
                until: parse_date(required(&self.until, "rules.until")?, "rules.until")?,
            },
            _ => {
                return Err(BookingError::validation(
                    "rules",
                    "each rule needs either dates or weekdays",
                ))
            }
        };
        Ok(AvailabilityRule {
            days,
            start_time: parse_time(required(&self.start_time, "rules.startTime")?, "rules.startTime")?,
            end_time: parse_time(required(&self.end_time, "rules.endTime")?, "rules.endTime")?,
            slot_minutes: self
                .slot_minutes
                .ok_or_else(|| BookingError::validation("rules.slotMinutes", "is required"))?,
        })
    }
}

/// Body of `PUT /schedule`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishScheduleRequest {
    #[serde(default)]
    pub professional_id: Option<String>,
    #[serde(default)]
    pub availability: Vec<AvailabilityWindowRequest>,
    #[serde(default)]
    pub rules: Vec<AvailabilityRuleRequest>,
}

impl TryFrom<PublishScheduleRequest> for PublishAvailabilityCommand {
    type Error = BookingError;

    fn try_from(req: PublishScheduleRequest) -> Result<Self, Self::Error> {
        Ok(PublishAvailabilityCommand {
            professional_id: required(&req.professional_id, "professionalId")?.to_string(),
            availability: req
                .availability
                .into_iter()
                .map(AvailabilityWindowRequest::into_input)
                .collect::<Result<_, _>>()?,
            rules: req
                .rules
                .into_iter()
                .map(AvailabilityRuleRequest::into_rule)
                .collect::<Result<_, _>>()?,
        })
    }
}

/// Query string of `GET /schedule/:professional_id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleQuery {
    pub date: Option<String>,
    pub weekday: Option<String>,
}

impl ScheduleQuery {
    pub fn into_filter(self) -> Result<Option<DayFilter>, BookingError> {
        match (self.date, self.weekday) {
            (None, None) => Ok(None),
            (Some(date), None) => Ok(Some(DayFilter::Date(parse_date(&date, "date")?))),
            (None, Some(weekday)) => Ok(Some(DayFilter::Weekday(parse_weekday(&weekday, "weekday")?))),
            (Some(_), Some(_)) => Err(BookingError::validation("date", "use either date or weekday")),
        }
    }
}

/// Body of `POST /appointments`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    #[serde(default)]
    pub professional_id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub slot_id: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub payer_email: Option<String>,
    #[serde(default)]
    pub payee_account: Option<String>,
    #[serde(default)]
    pub callback_url: Option<String>,
}

/// Body of `POST /appointments/:id/cancel`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelAppointmentRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotResponse {
    pub id: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub state: String,
    pub is_booked: bool,
}

impl From<&Slot> for SlotResponse {
    fn from(slot: &Slot) -> Self {
        Self {
            id: slot.id.to_string(),
            date: slot.window.date.to_string(),
            start_time: format_time(slot.window.start_time),
            end_time: format_time(slot.window.end_time),
            state: slot.state.as_str().to_string(),
            is_booked: slot.is_booked(),
        }
    }
}

/// Slots of one professional; the full set after `PUT`, the open ones on `GET`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResponse {
    pub professional_id: String,
    pub slots: Vec<SlotResponse>,
}

impl ScheduleResponse {
    pub fn new(professional_id: impl Into<String>, slots: &[Slot]) -> Self {
        Self {
            professional_id: professional_id.into(),
            slots: slots.iter().map(SlotResponse::from).collect(),
        }
    }
}

impl From<&Schedule> for ScheduleResponse {
    fn from(schedule: &Schedule) -> Self {
        Self::new(schedule.professional_id.as_str(), &schedule.slots)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentResponse {
    pub id: String,
    pub professional_id: String,
    pub client_id: String,
    pub patient_id: String,
    pub slot_id: String,
    pub status: String,
    pub payment_reference: String,
    pub amount: i64,
    pub slot_ends_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Appointment> for AppointmentResponse {
    fn from(a: &Appointment) -> Self {
        Self {
            id: a.id.to_string(),
            professional_id: a.professional_id.to_string(),
            client_id: a.client_id.to_string(),
            patient_id: a.patient_id.to_string(),
            slot_id: a.slot_id.to_string(),
            status: a.status.as_str().to_string(),
            payment_reference: a.payment_reference.to_string(),
            amount: a.amount,
            slot_ends_at: a.slot_ends_at.as_datetime().to_rfc3339(),
            cancellation_reason: a.cancellation_reason.map(|r| r.as_str().to_string()),
            created_at: a.created_at.as_datetime().to_rfc3339(),
            updated_at: a.updated_at.as_datetime().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub reference: String,
    pub authorization_url: String,
    pub access_code: String,
}

impl From<&TransactionHandle> for PaymentResponse {
    fn from(handle: &TransactionHandle) -> Self {
        Self {
            reference: handle.reference.to_string(),
            authorization_url: handle.authorization_url.clone(),
            access_code: handle.access_code.clone(),
        }
    }
}

/// Response of `POST /appointments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingResponse {
    pub appointment: AppointmentResponse,
    pub payment: PaymentResponse,
}

impl From<&BookAppointmentResult> for BookingResponse {
    fn from(result: &BookAppointmentResult) -> Self {
        Self {
            appointment: AppointmentResponse::from(&result.appointment),
            payment: PaymentResponse::from(&result.payment),
        }
    }
}

/// Single-appointment envelope; `outcome` is set by the confirm endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentEnvelope {
    pub appointment: AppointmentResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
}

/// Acknowledgement returned to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub status: String,
}

impl WebhookAck {
    pub fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
        }
    }
}

/// Standard error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error_code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}
