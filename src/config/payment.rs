//! Payment configuration (Paystack)

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Payment gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Paystack secret key (`sk_test_…` / `sk_live_…`)
    pub secret_key: SecretString,

    /// Secret used to sign webhooks; Paystack signs with the secret key
    /// unless a separate one is set
    pub webhook_secret: Option<SecretString>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Where the payer is sent after checkout, unless the booking names one
    pub callback_url: Option<String>,

    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl PaymentConfig {
    pub fn is_test_mode(&self) -> bool {
        self.secret_key.expose_secret().starts_with("sk_test_")
    }

    pub fn is_live_mode(&self) -> bool {
        self.secret_key.expose_secret().starts_with("sk_live_")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The secret webhooks are verified against.
    pub fn webhook_secret(&self) -> &SecretString {
        self.webhook_secret.as_ref().unwrap_or(&self.secret_key)
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let key = self.secret_key.expose_secret();
        if key.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__SECRET_KEY"));
        }
        if !key.starts_with("sk_") {
            return Err(ValidationError::InvalidPaystackKey);
        }
        if !self.base_url.starts_with("https://") && !self.base_url.starts_with("http://") {
            return Err(ValidationError::InvalidUrl("payment.base_url"));
        }
        if let Some(url) = &self.callback_url {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(ValidationError::InvalidUrl("payment.callback_url"));
            }
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ValidationError::InvalidCurrency);
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "https://api.paystack.co".to_string()
}

fn default_currency() -> String {
    "NGN".to_string()
}

fn default_timeout() -> u64 {
    15
}
