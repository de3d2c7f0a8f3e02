//! Paystack payment gateway adapter.
//!
//! # Security
//!
//! - HMAC-SHA512 over the raw webhook body, hex encoded in `x-paystack-signature`
//! - Constant-time signature comparison
//! - Secrets handled via `secrecy::SecretString`
//!
//! # Configuration
//!
//! ```ignore
//! let config = PaystackConfig::new(secret_key, webhook_secret).with_currency("NGN");
//! let gateway = PaystackGateway::new(config)?;
//! ```

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha512;
use std::time::Duration;
use subtle::ConstantTimeEq;

use crate::domain::appointment::{PaymentReference, SettlementNotice};
use crate::ports::{
    InitializeTransaction, PaymentError, PaymentErrorCode, PaymentGateway, TransactionHandle,
    WebhookDelivery,
};

use super::api_types::{ApiResponse, InitializeBody, InitializeData, TransactionData, WebhookBody};

type HmacSha512 = Hmac<Sha512>;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

/// Paystack API configuration.
#[derive(Clone)]
pub struct PaystackConfig {
    secret_key: SecretString,
    webhook_secret: SecretString,
    api_base_url: String,
    currency: String,
    timeout: Duration,
}

impl PaystackConfig {
    pub fn new(secret_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            secret_key: SecretString::new(secret_key.into()),
            webhook_secret: SecretString::new(webhook_secret.into()),
            api_base_url: "https://api.paystack.co".to_string(),
            currency: "NGN".to_string(),
            timeout: Duration::from_secs(15),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Paystack implementation of `PaymentGateway`.
pub struct PaystackGateway {
    config: PaystackConfig,
    http_client: reqwest::Client,
}

impl PaystackGateway {
    pub fn new(config: PaystackConfig) -> Result<Self, PaymentError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::network(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    /// Computes the hex signature Paystack would send for `payload`.
    pub fn sign(secret: &str, payload: &[u8]) -> Result<String, PaymentError> {
        let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
            .map_err(|e| PaymentError::invalid_signature(e.to_string()))?;
        mac.update(payload);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn verify_signature(&self, payload: &[u8], signature: &str) -> Result<(), PaymentError> {
        let provided = hex::decode(signature.trim()).map_err(|_| {
            tracing::warn!("Webhook signature is not valid hex");
            PaymentError::invalid_signature("Malformed signature")
        })?;

        let mut mac = HmacSha512::new_from_slice(self.config.webhook_secret.expose_secret().as_bytes())
            .map_err(|e| PaymentError::invalid_signature(e.to_string()))?;
        mac.update(payload);
        let expected = mac.finalize().into_bytes();

        if expected.as_slice().ct_eq(&provided).unwrap_u8() != 1 {
            tracing::warn!(payload_len = payload.len(), "Invalid webhook signature");
            return Err(PaymentError::invalid_signature("Invalid signature"));
        }
        Ok(())
    }

    async fn read_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        operation: &str,
    ) -> Result<T, PaymentError> {
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(PaymentError::authentication("Paystack rejected the secret key"));
        }

        let body: ApiResponse<T> = response.json().await.map_err(|e| {
            PaymentError::new(
                PaymentErrorCode::ProviderError,
                format!("Failed to parse Paystack {} response: {}", operation, e),
            )
        })?;

        match body.data {
            Some(data) if body.status && status.is_success() => Ok(data),
            _ if status.is_server_error() => Err(PaymentError::new(
                PaymentErrorCode::ProviderError,
                format!("Paystack {} failed: {}", operation, body.message),
            )
            .with_provider_code(status.as_str())),
            _ => Err(PaymentError::rejected(format!(
                "Paystack {} refused: {}",
                operation, body.message
            ))
            .with_provider_code(status.as_str())),
        }
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    async fn initialize(&self, request: InitializeTransaction) -> Result<TransactionHandle, PaymentError> {
        let url = format!("{}/transaction/initialize", self.config.api_base_url);
        let body = InitializeBody {
            email: &request.payer_email,
            amount: request.amount,
            currency: &self.config.currency,
            reference: request.reference.as_str(),
            subaccount: &request.payee_account,
            callback_url: request.callback_url.as_deref(),
            metadata: &request.metadata,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let data: InitializeData = Self::read_response(response, "initialize").await?;

        if data.reference != request.reference.as_str() {
            tracing::warn!(
                requested = %request.reference,
                returned = %data.reference,
                "Paystack returned a different reference"
            );
            return Err(PaymentError::new(
                PaymentErrorCode::ProviderError,
                "Paystack returned a different reference",
            ));
        }

        Ok(TransactionHandle {
            reference: request.reference,
            authorization_url: data.authorization_url,
            access_code: data.access_code,
        })
    }

    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookDelivery, PaymentError> {
        self.verify_signature(payload, signature)?;

        let body: WebhookBody = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse webhook payload");
            PaymentError::invalid_payload(format!("Invalid JSON: {}", e))
        })?;

        if !body.event.starts_with("charge.") {
            return Ok(WebhookDelivery::Ignored {
                event_type: body.event,
            });
        }

        match body.data.into_payload().into_notice()? {
            Some(notice) => Ok(WebhookDelivery::Settlement(notice)),
            None => Ok(WebhookDelivery::Ignored {
                event_type: body.event,
            }),
        }
    }

    async fn verify_transaction(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<SettlementNotice>, PaymentError> {
        let url = format!(
            "{}/transaction/verify/{}",
            self.config.api_base_url,
            reference.as_str()
        );
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let data: TransactionData = Self::read_response(response, "verify").await?;
        data.into_payload().into_notice()
    }
}
