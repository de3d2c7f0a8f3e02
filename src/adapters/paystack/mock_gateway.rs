//! Mock payment gateway for tests and local runs.
//!
//! Supports:
//! - Scripted verification outcomes per reference
//! - Error injection per method
//! - Call tracking
//!
//! Webhooks are accepted when the signature equals the configured secret,
//! and the body is read as `{reference, status, metadata}`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::appointment::{PaymentReference, SettlementNotice};
use crate::ports::{
    InitializeTransaction, PaymentError, PaymentGateway, SettlementPayload, TransactionHandle,
    WebhookDelivery,
};

/// Mock payment gateway.
///
/// ```ignore
/// let gateway = MockPaymentGateway::new();
/// gateway.set_method_error("initialize", PaymentError::network("down"));
/// ```
#[derive(Clone)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
    webhook_secret: String,
}

#[derive(Default)]
struct MockState {
    /// Outcomes returned by `verify_transaction`.
    settlements: HashMap<PaymentReference, SettlementNotice>,
    method_errors: HashMap<String, PaymentError>,
    initialized: Vec<InitializeTransaction>,
    call_log: Vec<String>,
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::with_webhook_secret("mock-signature")
    }

    pub fn with_webhook_secret(secret: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockState::default())),
            webhook_secret: secret.into(),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, MockState>, PaymentError> {
        self.inner
            .lock()
            .map_err(|_| PaymentError::network("mock gateway lock poisoned"))
    }

    /// The signature `verify_webhook` accepts.
    pub fn webhook_secret(&self) -> &str {
        &self.webhook_secret
    }

    /// Makes `verify_transaction` report `notice` for its reference.
    pub fn settle(&self, notice: SettlementNotice) {
        if let Ok(mut state) = self.state() {
            state.settlements.insert(notice.reference.clone(), notice);
        }
    }

    /// Fails every call to `method` with `error`.
    pub fn set_method_error(&self, method: &str, error: PaymentError) {
        if let Ok(mut state) = self.state() {
            state.method_errors.insert(method.to_string(), error);
        }
    }

    pub fn clear_errors(&self) {
        if let Ok(mut state) = self.state() {
            state.method_errors.clear();
        }
    }

    /// Requests passed to `initialize`, in call order.
    pub fn initialized(&self) -> Vec<InitializeTransaction> {
        self.state().map(|s| s.initialized.clone()).unwrap_or_default()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .map(|s| s.call_log.iter().filter(|m| *m == method).count())
            .unwrap_or(0)
    }

    fn enter(&self, method: &str) -> Result<(), PaymentError> {
        let mut state = self.state()?;
        state.call_log.push(method.to_string());
        match state.method_errors.get(method) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn initialize(&self, request: InitializeTransaction) -> Result<TransactionHandle, PaymentError> {
        self.enter("initialize")?;
        let handle = TransactionHandle {
            reference: request.reference.clone(),
            authorization_url: format!("https://checkout.mock/{}", request.reference),
            access_code: format!("ac_{}", request.reference),
        };
        self.state()?.initialized.push(request);
        Ok(handle)
    }

    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookDelivery, PaymentError> {
        self.enter("verify_webhook")?;
        if signature != self.webhook_secret {
            return Err(PaymentError::invalid_signature("Invalid signature"));
        }
        let body: SettlementPayload = serde_json::from_slice(payload)
            .map_err(|e| PaymentError::invalid_payload(format!("Invalid JSON: {}", e)))?;
        let status = body.status.clone();
        match body.into_notice()? {
            Some(notice) => Ok(WebhookDelivery::Settlement(notice)),
            None => Ok(WebhookDelivery::Ignored { event_type: status }),
        }
    }

    async fn verify_transaction(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<SettlementNotice>, PaymentError> {
        self.enter("verify_transaction")?;
        Ok(self.state()?.settlements.get(reference).cloned())
    }
}
