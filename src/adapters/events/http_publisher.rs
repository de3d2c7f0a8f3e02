//! HTTP fan-out publisher.
//!
//! POSTs each envelope as JSON to a notification relay (the service that
//! owns sockets and push delivery). Delivery is best-effort; callers log
//! failures.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::EventPublisher;

/// Header carrying the event id, for receiver-side deduplication.
pub const EVENT_ID_HEADER: &str = "x-event-id";

pub struct HttpEventPublisher {
    endpoint: String,
    http_client: reqwest::Client,
}

impl HttpEventPublisher {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, DomainError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                DomainError::new(ErrorCode::InternalError, format!("HTTP client setup failed: {}", e))
            })?;
        Ok(Self {
            endpoint: endpoint.into(),
            http_client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl EventPublisher for HttpEventPublisher {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .header(EVENT_ID_HEADER, event.event_id.as_str())
            .json(&event)
            .send()
            .await
            .map_err(|e| {
                DomainError::new(ErrorCode::InternalError, format!("notification relay unreachable: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(DomainError::new(
                ErrorCode::InternalError,
                format!("notification relay answered {}", response.status()),
            )
            .with_detail("event_type", event.event_type));
        }

        tracing::debug!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            "Notification relayed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn unreachable_relay_is_an_error() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let publisher =
            HttpEventPublisher::new("http://127.0.0.1:9/events", Duration::from_millis(200)).unwrap();
        let envelope = EventEnvelope::new("appointment.booked", "a-1", "Appointment", json!({}));
        assert!(publisher.publish(envelope).await.is_err());
    }
}
