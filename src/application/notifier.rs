//! Fire-and-forget notification emission.
//!
//! Transitions hand their event to the `Notifier` after the state change
//! is persisted. Publishing runs on a spawned task, so a slow or failing
//! publisher never delays or fails the transition that triggered it.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::domain::appointment::{AppointmentEvent, PaymentReference};
use crate::domain::foundation::{DomainEvent, SerializableDomainEvent};
use crate::ports::EventPublisher;

#[derive(Clone)]
pub struct Notifier {
    publisher: Arc<dyn EventPublisher>,
}

impl Notifier {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self { publisher }
    }

    /// Publishes `event` in the background.
    ///
    /// The handle is returned for tests; production callers drop it.
    pub fn emit(&self, event: AppointmentEvent) -> Option<JoinHandle<()>> {
        self.dispatch(event, None)
    }

    /// Like `emit`, tagging the envelope with the payment reference so
    /// consumers can tie every event of one booking together.
    pub fn emit_correlated(
        &self,
        event: AppointmentEvent,
        reference: &PaymentReference,
    ) -> Option<JoinHandle<()>> {
        self.dispatch(event, Some(reference))
    }

    fn dispatch(
        &self,
        event: AppointmentEvent,
        reference: Option<&PaymentReference>,
    ) -> Option<JoinHandle<()>> {
        let event_type = event.event_type();
        let envelope = match event.to_envelope() {
            Ok(envelope) => match reference {
                Some(reference) => envelope.with_correlation_id(reference.as_str()),
                None => envelope,
            },
            Err(e) => {
                tracing::error!(event_type, error = %e, "Failed to serialize event");
                return None;
            }
        };

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!(event_type, "No runtime available, notification dropped");
                return None;
            }
        };

        let publisher = self.publisher.clone();
        Some(runtime.spawn(async move {
            let event_id = envelope.event_id.clone();
            if let Err(e) = publisher.publish(envelope).await {
                tracing::warn!(
                    event_type,
                    event_id = %event_id,
                    error = %e,
                    "Notification publish failed"
                );
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::domain::foundation::{ProfessionalId, SlotId, Timestamp};

    fn event() -> AppointmentEvent {
        AppointmentEvent::SlotReleased {
            slot_id: SlotId::new(),
            professional_id: ProfessionalId::new("dr-ada").unwrap(),
            occurred_at: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn emit_publishes_in_background() {
        let bus = Arc::new(InMemoryEventBus::new());
        let notifier = Notifier::new(bus.clone());

        notifier.emit(event()).unwrap().await.unwrap();
        assert!(bus.has_event("slot.released"));
    }

    #[tokio::test]
    async fn publish_failure_is_swallowed() {
        let notifier = Notifier::new(Arc::new(InMemoryEventBus::failing()));
        let handle = notifier.emit(event()).unwrap();
        assert!(handle.await.is_ok());
    }

    #[tokio::test]
    async fn correlated_emit_carries_the_payment_reference() {
        let bus = Arc::new(InMemoryEventBus::new());
        let notifier = Notifier::new(bus.clone());
        let reference = PaymentReference::new("cb_ref_1").unwrap();

        notifier.emit_correlated(event(), &reference).unwrap().await.unwrap();

        let published = bus.published_events();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].metadata.correlation_id.as_deref(), Some("cb_ref_1"));
    }

    #[test]
    fn emit_outside_runtime_drops_quietly() {
        let notifier = Notifier::new(Arc::new(InMemoryEventBus::new()));
        assert!(notifier.emit(event()).is_none());
    }
}
