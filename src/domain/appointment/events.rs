//! Appointment domain events.
//!
//! Emitted after a transition has been persisted. Consumers (socket/push
//! fan-out, audit) receive them as `EventEnvelope`s and must tolerate
//! duplicates.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    AppointmentId, ClientId, DomainEvent, ProfessionalId, SlotId, Timestamp,
};

use super::CancellationReason;

/// Events that occur during the appointment lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppointmentEvent {
    /// Slot reserved and appointment opened, awaiting payment.
    Booked {
        appointment_id: AppointmentId,
        professional_id: ProfessionalId,
        client_id: ClientId,
        slot_id: SlotId,
        occurred_at: Timestamp,
    },

    /// Settlement succeeded. State transition: Pending → Confirmed
    Confirmed {
        appointment_id: AppointmentId,
        professional_id: ProfessionalId,
        client_id: ClientId,
        slot_id: SlotId,
        occurred_at: Timestamp,
    },

    /// State transition: Pending|Confirmed → Cancelled
    Cancelled {
        appointment_id: AppointmentId,
        professional_id: ProfessionalId,
        client_id: ClientId,
        slot_id: SlotId,
        reason: CancellationReason,
        occurred_at: Timestamp,
    },

    /// State transition: Confirmed → Completed
    Completed {
        appointment_id: AppointmentId,
        professional_id: ProfessionalId,
        client_id: ClientId,
        slot_id: SlotId,
        occurred_at: Timestamp,
    },

    /// A held slot went back to available without a lifecycle transition
    /// (maintenance reclaim).
    SlotReleased {
        slot_id: SlotId,
        professional_id: ProfessionalId,
        occurred_at: Timestamp,
    },
}

impl AppointmentEvent {
    pub fn slot_id(&self) -> SlotId {
        match self {
            AppointmentEvent::Booked { slot_id, .. }
            | AppointmentEvent::Confirmed { slot_id, .. }
            | AppointmentEvent::Cancelled { slot_id, .. }
            | AppointmentEvent::Completed { slot_id, .. }
            | AppointmentEvent::SlotReleased { slot_id, .. } => *slot_id,
        }
    }

    pub fn appointment_id(&self) -> Option<AppointmentId> {
        match self {
            AppointmentEvent::Booked { appointment_id, .. }
            | AppointmentEvent::Confirmed { appointment_id, .. }
            | AppointmentEvent::Cancelled { appointment_id, .. }
            | AppointmentEvent::Completed { appointment_id, .. } => Some(*appointment_id),
            AppointmentEvent::SlotReleased { .. } => None,
        }
    }
}

impl DomainEvent for AppointmentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AppointmentEvent::Booked { .. } => "appointment.booked",
            AppointmentEvent::Confirmed { .. } => "appointment.confirmed",
            AppointmentEvent::Cancelled { .. } => "appointment.cancelled",
            AppointmentEvent::Completed { .. } => "appointment.completed",
            AppointmentEvent::SlotReleased { .. } => "slot.released",
        }
    }

    fn aggregate_id(&self) -> String {
        match self.appointment_id() {
            Some(id) => id.to_string(),
            None => self.slot_id().to_string(),
        }
    }

    fn aggregate_type(&self) -> &'static str {
        match self {
            AppointmentEvent::SlotReleased { .. } => "Slot",
            _ => "Appointment",
        }
    }

    fn occurred_at(&self) -> Timestamp {
        match self {
            AppointmentEvent::Booked { occurred_at, .. }
            | AppointmentEvent::Confirmed { occurred_at, .. }
            | AppointmentEvent::Cancelled { occurred_at, .. }
            | AppointmentEvent::Completed { occurred_at, .. }
            | AppointmentEvent::SlotReleased { occurred_at, .. } => *occurred_at,
        }
    }
}
