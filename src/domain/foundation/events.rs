//! Event infrastructure shared by every context that emits notifications.
//!
//! - `DomainEvent` - contract every emitted event satisfies
//! - `EventEnvelope` - transport wrapper handed to an `EventPublisher`
//! - `EventId` / `EventMetadata` - deduplication and correlation context

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

use super::Timestamp;

/// Trait that all domain events must implement.
pub trait DomainEvent: Send + Sync {
    /// Routing key such as `appointment.confirmed.v1`.
    fn event_type(&self) -> &'static str;

    /// ID of the aggregate that emitted this event.
    fn aggregate_id(&self) -> String;

    /// Aggregate kind, e.g. `Appointment` or `Slot`.
    fn aggregate_type(&self) -> &'static str;

    /// When the event occurred.
    fn occurred_at(&self) -> Timestamp;
}

/// Provides `to_envelope()` for any serializable domain event.
pub trait SerializableDomainEvent: DomainEvent + Serialize {
    /// Converts this event into an `EventEnvelope` for transport.
    fn to_envelope(&self) -> Result<EventEnvelope, serde_json::Error> {
        let mut envelope = EventEnvelope::new(
            self.event_type(),
            self.aggregate_id(),
            self.aggregate_type(),
            serde_json::to_value(self)?,
        );
        envelope.occurred_at = self.occurred_at();
        Ok(envelope)
    }
}

impl<T: DomainEvent + Serialize> SerializableDomainEvent for T {}

/// Unique identifier for events (used for deduplication by consumers).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Creates a new random EventId.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlation context carried alongside an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Links events caused by the same inbound request or webhook.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

/// Transport envelope for domain events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: EventId,
    pub event_type: String,
    pub schema_version: u32,
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub occurred_at: Timestamp,
    pub payload: JsonValue,
    pub metadata: EventMetadata,
}

impl EventEnvelope {
    /// Creates an envelope from raw parts.
    ///
    /// The schema version comes from the `.vN` suffix of `event_type`,
    /// defaulting to 1.
    pub fn new(
        event_type: impl Into<String>,
        aggregate_id: impl Into<String>,
        aggregate_type: impl Into<String>,
        payload: JsonValue,
    ) -> Self {
        let event_type = event_type.into();
        let schema_version = Self::extract_version(&event_type);

        Self {
            event_id: EventId::new(),
            event_type,
            schema_version,
            aggregate_id: aggregate_id.into(),
            aggregate_type: aggregate_type.into(),
            occurred_at: Timestamp::now(),
            payload,
            metadata: EventMetadata::default(),
        }
    }

    pub(crate) fn extract_version(event_type: &str) -> u32 {
        event_type
            .rsplit_once(".v")
            .and_then(|(_, version_str)| version_str.parse::<u32>().ok())
            .unwrap_or(1)
    }

    /// Sets the correlation id.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.metadata.correlation_id = Some(correlation_id.into());
        self
    }

    /// Deserializes the payload into a concrete event type.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Pinged {
        target: String,
        at: Timestamp,
    }

    impl DomainEvent for Pinged {
        fn event_type(&self) -> &'static str {
            "test.pinged.v2"
        }
        fn aggregate_id(&self) -> String {
            self.target.clone()
        }
        fn aggregate_type(&self) -> &'static str {
            "Target"
        }
        fn occurred_at(&self) -> Timestamp {
            self.at
        }
    }

    #[test]
    fn to_envelope_copies_routing_fields() {
        let event = Pinged {
            target: "t-1".into(),
            at: Timestamp::now(),
        };
        let envelope = event.to_envelope().unwrap();

        assert_eq!(envelope.event_type, "test.pinged.v2");
        assert_eq!(envelope.schema_version, 2);
        assert_eq!(envelope.aggregate_id, "t-1");
        assert_eq!(envelope.aggregate_type, "Target");
        assert_eq!(envelope.occurred_at, event.at);
        assert_eq!(envelope.payload_as::<Pinged>().unwrap(), event);
    }

    #[test]
    fn version_defaults_to_one_without_suffix() {
        assert_eq!(EventEnvelope::extract_version("slot.released"), 1);
        assert_eq!(EventEnvelope::extract_version("slot.released.v3"), 3);
    }

    #[test]
    fn correlation_id_is_attached() {
        let envelope = EventEnvelope::new("a.b", "1", "A", JsonValue::Null).with_correlation_id("ref_1");
        assert_eq!(envelope.metadata.correlation_id.as_deref(), Some("ref_1"));
    }
}
