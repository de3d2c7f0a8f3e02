//! Payment settlement value objects.
//!
//! The gateway owns the money movement. This side keeps only the
//! transaction reference, the metadata that ties it to an appointment, and
//! the last outcome seen for it.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::foundation::{AppointmentId, SlotId, Timestamp, ValidationError};

use super::AppointmentStatus;

/// Gateway transaction reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentReference(String);

impl PaymentReference {
    /// Generates a fresh reference for a new appointment.
    pub fn generate() -> Self {
        Self(format!("cb_{}", Uuid::new_v4().simple()))
    }

    pub fn new(reference: impl Into<String>) -> Result<Self, ValidationError> {
        let reference = reference.into();
        if reference.trim().is_empty() {
            return Err(ValidationError::empty_field("reference"));
        }
        Ok(Self(reference))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the gateway reports for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementOutcome {
    Success,
    Failed,
}

impl SettlementOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementOutcome::Success => "success",
            SettlementOutcome::Failed => "failed",
        }
    }

    /// Status a pending appointment moves to under this outcome.
    pub fn target_status(&self) -> AppointmentStatus {
        match self {
            SettlementOutcome::Success => AppointmentStatus::Confirmed,
            SettlementOutcome::Failed => AppointmentStatus::Cancelled,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(SettlementOutcome::Success),
            "failed" => Some(SettlementOutcome::Failed),
            _ => None,
        }
    }
}

/// Metadata embedded in the transaction at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementMetadata {
    pub appointment_id: AppointmentId,
    pub slot_id: SlotId,
}

/// An inbound settlement signal, from a webhook or a verification poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementNotice {
    pub reference: PaymentReference,
    pub outcome: SettlementOutcome,
    pub metadata: SettlementMetadata,
    /// Amount reported by the gateway, in minor units, when it sends one.
    pub amount: Option<i64>,
}

/// Last outcome processed for a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementRecord {
    pub reference: PaymentReference,
    pub outcome: SettlementOutcome,
    pub appointment_id: AppointmentId,
    pub processed_at: Timestamp,
}

impl SettlementRecord {
    pub fn from_notice(notice: &SettlementNotice, processed_at: Timestamp) -> Self {
        Self {
            reference: notice.reference.clone(),
            outcome: notice.outcome,
            appointment_id: notice.metadata.appointment_id,
            processed_at,
        }
    }
}
