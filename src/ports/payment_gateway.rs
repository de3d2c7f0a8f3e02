//! Payment gateway port.
//!
//! The gateway initializes a transaction for the client to pay out-of-band
//! and later reports its settlement, either by webhook or when asked to
//! verify a reference.
//!
//! # Design
//!
//! - **Gateway agnostic**: no provider types leak past the adapter
//! - **Self-describing settlements**: every transaction carries
//!   `{appointmentId, slotId}` metadata so the callback needs no lookup table

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::appointment::{
    PaymentReference, SettlementMetadata, SettlementNotice, SettlementOutcome,
};
use crate::domain::foundation::{DomainError, ErrorCode};

/// Port for the external payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Starts a transaction and returns the client-facing handle.
    async fn initialize(&self, request: InitializeTransaction) -> Result<TransactionHandle, PaymentError>;

    /// Verifies a webhook signature and parses the delivery.
    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookDelivery, PaymentError>;

    /// Asks the gateway for the current outcome of a reference.
    ///
    /// Returns `Ok(None)` while the transaction is still in flight.
    async fn verify_transaction(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<SettlementNotice>, PaymentError>;
}

/// Request to initialize a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeTransaction {
    /// Amount in minor units.
    pub amount: i64,
    /// Payer contact, an e-mail address.
    pub payer_email: String,
    /// Settlement account of the professional (gateway subaccount code).
    pub payee_account: String,
    pub reference: PaymentReference,
    pub metadata: SettlementMetadata,
    /// Where the gateway sends the payer after checkout.
    pub callback_url: Option<String>,
}

/// What the client needs to complete payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHandle {
    pub reference: PaymentReference,
    pub authorization_url: String,
    pub access_code: String,
}

/// A verified webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookDelivery {
    /// A transaction reached a final outcome.
    Settlement(SettlementNotice),
    /// An event this service does not act on.
    Ignored { event_type: String },
}

/// The settlement fields every gateway payload carries.
///
/// `{reference, status, metadata: {appointmentId, slotId}}`
#[derive(Debug, Clone, Deserialize)]
pub struct SettlementPayload {
    pub reference: String,
    pub status: String,
    #[serde(default)]
    pub amount: Option<i64>,
    pub metadata: Option<SettlementMetadata>,
}

impl SettlementPayload {
    /// Maps gateway statuses to an outcome.
    ///
    /// `Ok(None)` for statuses that are not final (`pending`, `ongoing`).
    pub fn into_notice(self) -> Result<Option<SettlementNotice>, PaymentError> {
        let outcome = match self.status.as_str() {
            "success" => SettlementOutcome::Success,
            "failed" | "abandoned" | "reversed" => SettlementOutcome::Failed,
            _ => return Ok(None),
        };
        let reference = PaymentReference::new(self.reference)
            .map_err(|e| PaymentError::invalid_payload(e.to_string()))?;
        let metadata = self.metadata.ok_or_else(|| {
            PaymentError::invalid_payload(format!("transaction {} carries no booking metadata", reference))
        })?;
        Ok(Some(SettlementNotice {
            reference,
            outcome,
            metadata,
            amount: self.amount,
        }))
    }
}

/// Errors from payment gateway operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    pub code: PaymentErrorCode,
    pub message: String,
    /// Gateway's own error text, if it sent one.
    pub provider_code: Option<String>,
    pub retryable: bool,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::Rejected, message)
    }

    pub fn invalid_signature(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidSignature, message)
    }

    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidPayload, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

/// Payment error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    NetworkError,
    AuthenticationError,
    /// The gateway refused the request (bad amount, unknown subaccount...).
    Rejected,
    InvalidSignature,
    InvalidPayload,
    ProviderError,
}

impl PaymentErrorCode {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentErrorCode::NetworkError | PaymentErrorCode::ProviderError)
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::Rejected => "rejected",
            PaymentErrorCode::InvalidSignature => "invalid_signature",
            PaymentErrorCode::InvalidPayload => "invalid_payload",
            PaymentErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        let code = match err.code {
            PaymentErrorCode::InvalidSignature | PaymentErrorCode::InvalidPayload => {
                ErrorCode::PaymentCallbackFailed
            }
            _ => ErrorCode::PaymentInitFailed,
        };
        DomainError::new(code, err.message).with_detail("payment_code", err.code.to_string())
    }
}
