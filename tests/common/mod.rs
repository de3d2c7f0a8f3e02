//! Shared wiring for integration tests: in-memory stores, the mock
//! gateway and a clock pinned to Monday 2030-01-07 12:00 UTC.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate, NaiveTime};

use carebook::adapters::events::InMemoryEventBus;
use carebook::adapters::memory::{
    InMemoryAppointmentRepository, InMemorySettlementStore, InMemorySlotStore,
};
use carebook::adapters::paystack::MockPaymentGateway;
use carebook::adapters::FixedClock;
use carebook::application::{
    AppointmentLifecycle, BookAppointmentCommand, BookAppointmentHandler,
    HandlePaymentWebhookCommand, HandlePaymentWebhookHandler, HandleSettlementHandler,
    MaintenanceConfig, Notifier, PublishAvailabilityCommand, PublishAvailabilityHandler,
    ScheduleMaintenance,
};
use carebook::domain::appointment::{
    Appointment, SettlementMetadata, SettlementNotice, SettlementOutcome,
};
use carebook::domain::foundation::{SlotId, Timestamp};
use carebook::domain::scheduling::{AvailabilityInput, Schedule, SlotWindow};

pub const PROFESSIONAL: &str = "dr-ada";

pub fn day(n: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 1, 7)
        .and_then(|d| d.checked_add_days(Days::new(n)))
        .unwrap()
}

pub fn at(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

pub struct TestHarness {
    pub slots: Arc<InMemorySlotStore>,
    pub appointments: Arc<InMemoryAppointmentRepository>,
    pub settlements: Arc<InMemorySettlementStore>,
    pub gateway: MockPaymentGateway,
    pub bus: Arc<InMemoryEventBus>,
    pub clock: Arc<FixedClock>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(InMemorySlotStore::new()),
            appointments: Arc::new(InMemoryAppointmentRepository::new()),
            settlements: Arc::new(InMemorySettlementStore::new()),
            gateway: MockPaymentGateway::new(),
            bus: Arc::new(InMemoryEventBus::new()),
            clock: Arc::new(FixedClock::new(Timestamp::from_date_time(day(0), at(12, 0)))),
        }
    }

    pub fn notifier(&self) -> Notifier {
        Notifier::new(self.bus.clone())
    }

    pub fn lifecycle(&self) -> Arc<AppointmentLifecycle> {
        Arc::new(AppointmentLifecycle::new(
            self.appointments.clone(),
            self.slots.clone(),
            self.notifier(),
            self.clock.clone(),
        ))
    }

    pub fn booking(&self) -> BookAppointmentHandler {
        BookAppointmentHandler::new(
            self.slots.clone(),
            self.appointments.clone(),
            Arc::new(self.gateway.clone()),
            self.notifier(),
            self.clock.clone(),
        )
    }

    pub fn settlement(&self) -> HandleSettlementHandler {
        HandleSettlementHandler::new(self.settlements.clone(), self.lifecycle(), self.clock.clone())
    }

    pub fn webhook(&self) -> HandlePaymentWebhookHandler {
        HandlePaymentWebhookHandler::new(Arc::new(self.gateway.clone()), Arc::new(self.settlement()))
    }

    /// A webhook delivery for `appointment` signed the way the mock gateway expects.
    pub fn webhook_command(
        &self,
        appointment: &Appointment,
        status: &str,
    ) -> HandlePaymentWebhookCommand {
        let payload = serde_json::json!({
            "reference": appointment.payment_reference.as_str(),
            "status": status,
            "amount": appointment.amount,
            "metadata": {
                "appointmentId": appointment.id.to_string(),
                "slotId": appointment.slot_id.to_string()
            }
        });
        HandlePaymentWebhookCommand {
            payload: payload.to_string().into_bytes(),
            signature: self.gateway.webhook_secret().to_string(),
        }
    }

    pub fn maintenance(&self) -> ScheduleMaintenance {
        ScheduleMaintenance::new(
            self.appointments.clone(),
            self.slots.clone(),
            self.settlements.clone(),
            self.lifecycle(),
            self.notifier(),
            self.clock.clone(),
            MaintenanceConfig::default(),
        )
    }

    /// Publishes the given `(start_hour, start_minute, minutes)` windows on `day(1)`.
    pub async fn publish(&self, windows: &[(u32, u32, i64)]) -> Schedule {
        let availability = windows
            .iter()
            .map(|&(h, m, minutes)| {
                let start = at(h, m);
                let end = start + chrono::Duration::minutes(minutes);
                AvailabilityInput::new(SlotWindow::new(day(1), start, end))
            })
            .collect();
        PublishAvailabilityHandler::new(self.slots.clone(), self.clock.clone())
            .handle(PublishAvailabilityCommand {
                professional_id: PROFESSIONAL.to_string(),
                availability,
                rules: vec![],
            })
            .await
            .unwrap()
    }

    pub fn book_command(&self, slot_id: SlotId, client: &str) -> BookAppointmentCommand {
        BookAppointmentCommand {
            professional_id: PROFESSIONAL.to_string(),
            client_id: client.to_string(),
            patient_id: format!("{}-patient", client),
            slot_id: slot_id.to_string(),
            amount: 1_500_000,
            payer_email: format!("{}@example.com", client),
            payee_account: "ACCT_dr_ada".to_string(),
            callback_url: None,
        }
    }

    pub async fn book(&self, slot_id: SlotId) -> Appointment {
        self.booking()
            .handle(self.book_command(slot_id, "client-1"))
            .await
            .unwrap()
            .appointment
    }

    pub fn notice(&self, appointment: &Appointment, outcome: SettlementOutcome) -> SettlementNotice {
        SettlementNotice {
            reference: appointment.payment_reference.clone(),
            outcome,
            metadata: SettlementMetadata {
                appointment_id: appointment.id,
                slot_id: appointment.slot_id,
            },
            amount: Some(appointment.amount),
        }
    }

    /// Waits for spawned notifications to land.
    pub async fn wait_for_event(&self, event_type: &str, count: usize) {
        for _ in 0..100 {
            if self.bus.events_of_type(event_type).len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for {} x{}", event_type, count);
    }
}
