//! End-to-end booking flow against the in-memory adapters.
//!
//! Covers the booking walk-through: reserve, conflicting second booking,
//! settlement, redelivered settlement, and TTL expiry by the sweep.

mod common;

use std::sync::Arc;

use futures::future::join_all;

use carebook::application::{SettlementResult, WebhookResult};
use carebook::domain::appointment::{
    AppointmentStatus, BookingError, CancellationReason, SettlementOutcome,
};
use carebook::domain::scheduling::SlotState;
use carebook::ports::{AppointmentRepository, SlotStore};

use common::{TestHarness, PROFESSIONAL};

// =============================================================================
// Reservation
// =============================================================================

#[tokio::test]
async fn booking_reserves_the_slot_and_leaves_a_pending_appointment() {
    let h = TestHarness::new();
    let schedule = h.publish(&[(9, 0, 30)]).await;
    let slot_id = schedule.slots[0].id;

    let appointment = h.book(slot_id).await;

    assert_eq!(appointment.status, AppointmentStatus::Pending);
    let slot = h.slots.find_slot(slot_id).await.unwrap().unwrap();
    assert_eq!(slot.state, SlotState::Reserved);
    assert_eq!(slot.holder, Some(appointment.id));
    assert_eq!(h.gateway.initialized().len(), 1);
}

#[tokio::test]
async fn second_booking_of_the_same_slot_conflicts() {
    let h = TestHarness::new();
    let schedule = h.publish(&[(9, 0, 30)]).await;
    let slot_id = schedule.slots[0].id;
    h.book(slot_id).await;

    let second = h.booking().handle(h.book_command(slot_id, "client-2")).await;

    assert!(matches!(second, Err(BookingError::SlotConflict(id)) if id == slot_id));
    assert_eq!(h.appointments.for_slot(slot_id).len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bookings_have_exactly_one_winner() {
    const CLIENTS: usize = 16;

    let h = TestHarness::new();
    let schedule = h.publish(&[(9, 0, 30)]).await;
    let slot_id = schedule.slots[0].id;
    let handler = Arc::new(h.booking());

    let attempts = (0..CLIENTS).map(|i| {
        let handler = handler.clone();
        let cmd = h.book_command(slot_id, &format!("client-{}", i));
        tokio::spawn(async move { handler.handle(cmd).await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(BookingError::SlotConflict(_))))
        .count();
    assert_eq!(winners, 1);
    assert_eq!(conflicts, CLIENTS - 1);

    let active: Vec<_> = h
        .appointments
        .for_slot(slot_id)
        .into_iter()
        .filter(|a| a.is_active())
        .collect();
    assert_eq!(active.len(), 1);
}

#[tokio::test]
async fn cancel_returns_the_slot_to_its_original_state() {
    let h = TestHarness::new();
    let schedule = h.publish(&[(9, 0, 30)]).await;
    let before = schedule.slots[0].clone();

    let appointment = h.book(before.id).await;
    h.lifecycle()
        .cancel(&appointment, CancellationReason::ClientRequested)
        .await
        .unwrap();

    let after = h.slots.find_slot(before.id).await.unwrap().unwrap();
    assert_eq!(after, before);
    let open = h.slots.list_available(&appointment.professional_id, None).await.unwrap();
    assert_eq!(open.len(), 1);
}

// =============================================================================
// Settlement
// =============================================================================

#[tokio::test]
async fn successful_settlement_confirms_and_books_the_slot() {
    let h = TestHarness::new();
    let schedule = h.publish(&[(9, 0, 30)]).await;
    let appointment = h.book(schedule.slots[0].id).await;

    let result = h
        .settlement()
        .handle(h.notice(&appointment, SettlementOutcome::Success))
        .await
        .unwrap();

    assert!(matches!(result, SettlementResult::Confirmed(ref a) if a.status == AppointmentStatus::Confirmed));
    let slot = h.slots.find_slot(appointment.slot_id).await.unwrap().unwrap();
    assert_eq!(slot.state, SlotState::Booked);

    h.wait_for_event("appointment.confirmed", 1).await;
    let confirmed = h.bus.events_of_type("appointment.confirmed");
    assert_eq!(
        confirmed[0].metadata.correlation_id.as_deref(),
        Some(appointment.payment_reference.as_str())
    );
}

#[tokio::test]
async fn redelivered_settlement_changes_nothing() {
    let h = TestHarness::new();
    let schedule = h.publish(&[(9, 0, 30)]).await;
    let appointment = h.book(schedule.slots[0].id).await;
    let settlement = h.settlement();
    let notice = h.notice(&appointment, SettlementOutcome::Success);

    settlement.handle(notice.clone()).await.unwrap();
    let slot_after_first = h.slots.find_slot(appointment.slot_id).await.unwrap().unwrap();

    let again = settlement.handle(notice).await.unwrap();

    assert_eq!(
        again,
        SettlementResult::AlreadyProcessed {
            appointment_id: appointment.id
        }
    );
    let stored = h.appointments.find_by_id(appointment.id).await.unwrap().unwrap();
    assert_eq!(stored.status, AppointmentStatus::Confirmed);
    let slot = h.slots.find_slot(appointment.slot_id).await.unwrap().unwrap();
    assert_eq!(slot, slot_after_first);
    assert_eq!(h.settlements.len(), 1);

    h.wait_for_event("appointment.confirmed", 1).await;
    assert_eq!(h.bus.events_of_type("appointment.confirmed").len(), 1);
}

#[tokio::test]
async fn failed_settlement_cancels_and_frees_the_slot() {
    let h = TestHarness::new();
    let schedule = h.publish(&[(9, 0, 30)]).await;
    let appointment = h.book(schedule.slots[0].id).await;

    let result = h
        .settlement()
        .handle(h.notice(&appointment, SettlementOutcome::Failed))
        .await
        .unwrap();

    let SettlementResult::Cancelled(cancelled) = result else {
        panic!("expected cancellation, got {:?}", result);
    };
    assert_eq!(cancelled.cancellation_reason, Some(CancellationReason::PaymentFailed));
    let slot = h.slots.find_slot(appointment.slot_id).await.unwrap().unwrap();
    assert_eq!(slot.state, SlotState::Available);
}

#[tokio::test]
async fn settlement_with_foreign_metadata_is_rejected() {
    let h = TestHarness::new();
    let schedule = h.publish(&[(9, 0, 30), (10, 0, 30)]).await;
    let appointment = h.book(schedule.slots[0].id).await;

    let mut notice = h.notice(&appointment, SettlementOutcome::Success);
    notice.metadata.slot_id = schedule.slots[1].id;
    let result = h.settlement().handle(notice).await;

    assert!(matches!(result, Err(BookingError::PaymentCallback { .. })));
    let stored = h.appointments.find_by_id(appointment.id).await.unwrap().unwrap();
    assert_eq!(stored.status, AppointmentStatus::Pending);
}

#[tokio::test]
async fn failure_notice_after_confirmation_changes_nothing() {
    let h = TestHarness::new();
    let schedule = h.publish(&[(9, 0, 30)]).await;
    let appointment = h.book(schedule.slots[0].id).await;
    let settlement = h.settlement();
    settlement
        .handle(h.notice(&appointment, SettlementOutcome::Success))
        .await
        .unwrap();
    let slot_before = h.slots.find_slot(appointment.slot_id).await.unwrap().unwrap();

    let late = settlement
        .handle(h.notice(&appointment, SettlementOutcome::Failed))
        .await;

    assert!(matches!(
        late,
        Err(BookingError::InvalidTransition {
            current: AppointmentStatus::Confirmed,
            ..
        })
    ));
    let stored = h.appointments.find_by_id(appointment.id).await.unwrap().unwrap();
    assert_eq!(stored.status, AppointmentStatus::Confirmed);
    assert_eq!(stored.cancellation_reason, None);
    let slot = h.slots.find_slot(appointment.slot_id).await.unwrap().unwrap();
    assert_eq!(slot, slot_before);
    assert_eq!(slot.state, SlotState::Booked);
}

#[tokio::test]
async fn reversed_webhook_for_a_paid_booking_keeps_it_booked() {
    let h = TestHarness::new();
    let schedule = h.publish(&[(9, 0, 30)]).await;
    let appointment = h.book(schedule.slots[0].id).await;
    let webhook = h.webhook();

    let first = webhook
        .handle(h.webhook_command(&appointment, "success"))
        .await
        .unwrap();
    assert!(matches!(first, WebhookResult::Applied(SettlementResult::Confirmed(_))));

    let reversed = webhook
        .handle(h.webhook_command(&appointment, "reversed"))
        .await;

    assert!(matches!(reversed, Err(BookingError::InvalidTransition { .. })));
    let stored = h.appointments.find_by_id(appointment.id).await.unwrap().unwrap();
    assert_eq!(stored.status, AppointmentStatus::Confirmed);
    let slot = h.slots.find_slot(appointment.slot_id).await.unwrap().unwrap();
    assert_eq!(slot.state, SlotState::Booked);
    assert_eq!(slot.holder, Some(appointment.id));
    let open = h.slots.list_available(&appointment.professional_id, None).await.unwrap();
    assert!(open.is_empty());
}

// =============================================================================
// Maintenance
// =============================================================================

#[tokio::test]
async fn sweep_cancels_abandoned_bookings_and_frees_their_slots() {
    let h = TestHarness::new();
    let schedule = h.publish(&[(9, 0, 30)]).await;
    let appointment = h.book(schedule.slots[0].id).await;

    // Past the slot's end (day 1, 09:30) and well past the pending TTL.
    h.clock.advance_secs(24 * 3600);
    let report = h.maintenance().sweep().await;

    assert_eq!(report.expired, 1);
    let stored = h.appointments.find_by_id(appointment.id).await.unwrap().unwrap();
    assert_eq!(stored.status, AppointmentStatus::Cancelled);
    assert_eq!(stored.cancellation_reason, Some(CancellationReason::PaymentTimeout));
    let slot = h.slots.find_slot(appointment.slot_id).await.unwrap().unwrap();
    assert_eq!(slot.state, SlotState::Available);
}

#[tokio::test]
async fn sweep_keeps_future_confirmed_bookings() {
    let h = TestHarness::new();
    let schedule = h.publish(&[(9, 0, 30)]).await;
    let appointment = h.book(schedule.slots[0].id).await;
    h.settlement()
        .handle(h.notice(&appointment, SettlementOutcome::Success))
        .await
        .unwrap();

    // Well past the TTL but before the slot starts.
    h.clock.advance_secs(3 * 3600);
    let report = h.maintenance().sweep().await;

    assert_eq!(report.expired, 0);
    assert_eq!(report.reclaimed, 0);
    let slot = h.slots.find_slot(appointment.slot_id).await.unwrap().unwrap();
    assert_eq!(slot.state, SlotState::Booked);
    let stored = h.appointments.find_by_id(appointment.id).await.unwrap().unwrap();
    assert_eq!(stored.status, AppointmentStatus::Confirmed);
}

#[tokio::test]
async fn settlement_after_expiry_does_not_revive_the_booking() {
    let h = TestHarness::new();
    let schedule = h.publish(&[(9, 0, 30)]).await;
    let appointment = h.book(schedule.slots[0].id).await;

    h.clock.advance_secs(3600);
    h.maintenance().sweep().await;
    let late = h
        .settlement()
        .handle(h.notice(&appointment, SettlementOutcome::Success))
        .await;

    assert!(matches!(late, Err(BookingError::InvalidTransition { .. })));
    let open = h
        .slots
        .list_available(&carebook::domain::foundation::ProfessionalId::new(PROFESSIONAL).unwrap(), None)
        .await
        .unwrap();
    assert_eq!(open.len(), 1);
}
