//! Shared wiring for application-layer tests: in-memory adapters, a mock
//! gateway and a clock pinned to a known Monday noon (UTC).

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};

use crate::adapters::events::InMemoryEventBus;
use crate::adapters::memory::{
    InMemoryAppointmentRepository, InMemorySettlementStore, InMemorySlotStore,
};
use crate::adapters::paystack::MockPaymentGateway;
use crate::adapters::FixedClock;
use crate::application::handlers::booking::*;
use crate::application::handlers::scheduling::*;
use crate::application::{MaintenanceConfig, Notifier, ScheduleMaintenance};
use crate::domain::appointment::Appointment;
use crate::domain::foundation::{SlotId, Timestamp};
use crate::domain::scheduling::{AvailabilityInput, Schedule, SlotWindow};
use crate::ports::Clock;

/// `n` days after the harness's starting date.
pub fn day(n: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 1, 7)
        .and_then(|d| d.checked_add_days(chrono::Days::new(n)))
        .unwrap()
}

pub fn at(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

pub struct Harness {
    pub slots: Arc<InMemorySlotStore>,
    pub appointments: Arc<InMemoryAppointmentRepository>,
    pub settlements: Arc<InMemorySettlementStore>,
    pub gateway: MockPaymentGateway,
    pub bus: Arc<InMemoryEventBus>,
    pub clock: Arc<FixedClock>,
}

impl Harness {
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

    pub fn now(&self) -> Timestamp {
        self.clock.now()
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

    pub fn confirm(&self) -> ConfirmAppointmentHandler {
        ConfirmAppointmentHandler::new(
            Arc::new(self.gateway.clone()),
            self.lifecycle(),
            Arc::new(self.settlement()),
        )
    }

    pub fn cancel(&self) -> CancelAppointmentHandler {
        CancelAppointmentHandler::new(self.lifecycle())
    }

    pub fn publish(&self) -> PublishAvailabilityHandler {
        PublishAvailabilityHandler::new(self.slots.clone(), self.clock.clone())
    }

    pub fn available_slots(&self) -> GetAvailableSlotsHandler {
        GetAvailableSlotsHandler::new(self.slots.clone(), self.clock.clone())
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

    /// Publishes 09:00, 10:00 and 11:00 one-hour slots on `day(1)`.
    pub async fn publish_day(&self, professional: &str) -> Schedule {
        let availability = [9, 10, 11]
            .into_iter()
            .map(|h| AvailabilityInput::new(SlotWindow::new(day(1), at(h, 0), at(h + 1, 0))))
            .collect();
        self.publish()
            .handle(PublishAvailabilityCommand {
                professional_id: professional.to_string(),
                availability,
                rules: vec![],
            })
            .await
            .unwrap()
    }

    pub fn book_command(&self, professional: &str, slot_id: SlotId) -> BookAppointmentCommand {
        BookAppointmentCommand {
            professional_id: professional.to_string(),
            client_id: "client-1".to_string(),
            patient_id: "patient-1".to_string(),
            slot_id: slot_id.to_string(),
            amount: 1_500_000,
            payer_email: "client@example.com".to_string(),
            payee_account: "ACCT_dr_ada".to_string(),
            callback_url: None,
        }
    }

    /// Publishes a day for `dr-ada` and books its first slot.
    pub async fn book_first_slot(&self) -> Appointment {
        let schedule = self.publish_day("dr-ada").await;
        self.booking()
            .handle(self.book_command("dr-ada", schedule.slots[0].id))
            .await
            .unwrap()
            .appointment
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
