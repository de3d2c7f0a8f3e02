//! HandlePaymentWebhookHandler - Command handler for gateway webhooks.
//!
//! Verifies the signature, then hands settlements to
//! `HandleSettlementHandler`. Events that are not settlements are
//! acknowledged and ignored.

use std::sync::Arc;

use crate::domain::appointment::BookingError;
use crate::ports::{PaymentErrorCode, PaymentGateway, WebhookDelivery};

use super::{HandleSettlementHandler, SettlementResult};

/// Command carrying a raw webhook delivery.
#[derive(Debug, Clone)]
pub struct HandlePaymentWebhookCommand {
    /// Raw body, exactly as received; the signature covers these bytes.
    pub payload: Vec<u8>,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookResult {
    Applied(SettlementResult),
    Ignored { event_type: String },
}

pub struct HandlePaymentWebhookHandler {
    gateway: Arc<dyn PaymentGateway>,
    settlement: Arc<HandleSettlementHandler>,
}

impl HandlePaymentWebhookHandler {
    pub fn new(gateway: Arc<dyn PaymentGateway>, settlement: Arc<HandleSettlementHandler>) -> Self {
        Self { gateway, settlement }
    }

    pub async fn handle(&self, cmd: HandlePaymentWebhookCommand) -> Result<WebhookResult, BookingError> {
        let delivery = self
            .gateway
            .verify_webhook(&cmd.payload, &cmd.signature)
            .await
            .map_err(|e| match e.code {
                PaymentErrorCode::InvalidSignature => {
                    tracing::warn!("Webhook rejected: invalid signature");
                    BookingError::InvalidSignature
                }
                PaymentErrorCode::InvalidPayload => BookingError::validation("payload", e.message),
                _ => BookingError::payment_callback(e.message),
            })?;

        match delivery {
            WebhookDelivery::Settlement(notice) => {
                tracing::info!(
                    reference = %notice.reference,
                    outcome = notice.outcome.as_str(),
                    appointment_id = %notice.metadata.appointment_id,
                    "Settlement received"
                );
                let result = self.settlement.handle(notice).await?;
                Ok(WebhookResult::Applied(result))
            }
            WebhookDelivery::Ignored { event_type } => {
                tracing::debug!(event_type = %event_type, "Webhook event ignored");
                Ok(WebhookResult::Ignored { event_type })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::Harness;
    use crate::domain::appointment::AppointmentStatus;
    use serde_json::json;

    fn body(reference: &str, status: &str, appointment_id: String, slot_id: String) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "reference": reference,
            "status": status,
            "metadata": { "appointmentId": appointment_id, "slotId": slot_id }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn signed_success_confirms() {
        let h = Harness::new();
        let appt = h.book_first_slot().await;

        let result = h
            .webhook()
            .handle(HandlePaymentWebhookCommand {
                payload: body(
                    appt.payment_reference.as_str(),
                    "success",
                    appt.id.to_string(),
                    appt.slot_id.to_string(),
                ),
                signature: h.gateway.webhook_secret().to_string(),
            })
            .await
            .unwrap();

        assert!(matches!(
            result,
            WebhookResult::Applied(SettlementResult::Confirmed(ref a)) if a.status == AppointmentStatus::Confirmed
        ));
    }

    #[tokio::test]
    async fn bad_signature_changes_nothing() {
        let h = Harness::new();
        let appt = h.book_first_slot().await;

        let err = h
            .webhook()
            .handle(HandlePaymentWebhookCommand {
                payload: body(
                    appt.payment_reference.as_str(),
                    "success",
                    appt.id.to_string(),
                    appt.slot_id.to_string(),
                ),
                signature: "forged".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(err, BookingError::InvalidSignature);
        assert_eq!(
            h.lifecycle().load(appt.id).await.unwrap().status,
            AppointmentStatus::Pending
        );
    }

    #[tokio::test]
    async fn in_flight_status_is_ignored() {
        let h = Harness::new();
        let appt = h.book_first_slot().await;

        let result = h
            .webhook()
            .handle(HandlePaymentWebhookCommand {
                payload: body(
                    appt.payment_reference.as_str(),
                    "ongoing",
                    appt.id.to_string(),
                    appt.slot_id.to_string(),
                ),
                signature: h.gateway.webhook_secret().to_string(),
            })
            .await
            .unwrap();

        assert_eq!(result, WebhookResult::Ignored { event_type: "ongoing".to_string() });
    }

    #[tokio::test]
    async fn malformed_body_is_a_validation_error() {
        let h = Harness::new();
        let err = h
            .webhook()
            .handle(HandlePaymentWebhookCommand {
                payload: b"{not json".to_vec(),
                signature: h.gateway.webhook_secret().to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::Validation { .. }));
    }
}
