//! Paystack wire types.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::appointment::SettlementMetadata;
use crate::ports::SettlementPayload;

/// Body of `POST /transaction/initialize`.
#[derive(Debug, Serialize)]
pub struct InitializeBody<'a> {
    pub email: &'a str,
    /// Minor units (kobo, pesewas, cents).
    pub amount: i64,
    pub currency: &'a str,
    pub reference: &'a str,
    pub subaccount: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<&'a str>,
    pub metadata: &'a SettlementMetadata,
}

/// Every Paystack API response: `{status, message, data}`.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub status: bool,
    pub message: String,
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct InitializeData {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

/// Transaction object, as found in verify responses and webhook `data`.
///
/// Paystack sends `metadata` as an object, or as an empty string when the
/// transaction was created without one.
#[derive(Debug, Deserialize)]
pub struct TransactionData {
    pub reference: String,
    pub status: String,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub metadata: JsonValue,
}

impl TransactionData {
    pub fn into_payload(self) -> SettlementPayload {
        let metadata = match self.metadata {
            JsonValue::Object(_) => serde_json::from_value(self.metadata).ok(),
            _ => None,
        };
        SettlementPayload {
            reference: self.reference,
            status: self.status,
            amount: self.amount,
            metadata,
        }
    }
}

/// Webhook body: `{event, data}`.
#[derive(Debug, Deserialize)]
pub struct WebhookBody {
    pub event: String,
    pub data: TransactionData,
}
