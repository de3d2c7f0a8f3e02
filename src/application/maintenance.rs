//! ScheduleMaintenance - periodic sweep over appointments and slots.
//!
//! Each sweep runs three passes:
//!
//! 1. **Expire**: pending appointments older than the payment TTL are
//!    cancelled with `payment_timeout`, freeing their slots
//! 2. **Complete**: confirmed appointments whose slot has ended move to
//!    `completed`
//! 3. **Reclaim**: slots still held after their end, with no pending or
//!    confirmed appointment, go back to `available`
//!
//! Every mutation goes through the same compare-and-set primitives as the
//! request path, so a sweep racing a settlement or a booking loses cleanly.
//! Per-item failures are logged and retried on the next tick.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `interval` | 60s | Time between sweeps |
//! | `pending_ttl` | 15min | How long a pending appointment may wait for payment |
//! | `batch_size` | 200 | Max items per pass |
//! | `settlement_retention` | 30 days | Age after which settlement records are pruned |

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::application::handlers::booking::AppointmentLifecycle;
use crate::application::Notifier;
use crate::domain::appointment::{AppointmentEvent, BookingError, CancellationReason};
use crate::domain::foundation::Timestamp;
use crate::ports::{AppointmentRepository, Clock, SettlementStore, SlotStore};

/// How long a held slot must have been over before it is reclaimed. Keeps
/// the sweep clear of a booking that is between reserving and inserting.
const RECLAIM_GRACE_SECS: i64 = 60;

#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    pub interval: Duration,
    pub pending_ttl: Duration,
    pub batch_size: usize,
    pub settlement_retention: Duration,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            pending_ttl: Duration::from_secs(15 * 60),
            batch_size: 200,
            settlement_retention: Duration::from_secs(30 * 24 * 3600),
        }
    }
}

impl MaintenanceConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_pending_ttl(mut self, ttl: Duration) -> Self {
        self.pending_ttl = ttl;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_settlement_retention(mut self, retention: Duration) -> Self {
        self.settlement_retention = retention;
        self
    }
}

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: usize,
    pub completed: usize,
    pub reclaimed: usize,
    pub pruned: u64,
    pub failures: usize,
}

impl SweepReport {
    pub fn is_idle(&self) -> bool {
        self.expired == 0 && self.completed == 0 && self.reclaimed == 0 && self.failures == 0
    }
}

pub struct ScheduleMaintenance {
    appointments: Arc<dyn AppointmentRepository>,
    slots: Arc<dyn SlotStore>,
    settlements: Arc<dyn SettlementStore>,
    lifecycle: Arc<AppointmentLifecycle>,
    notifier: Notifier,
    clock: Arc<dyn Clock>,
    config: MaintenanceConfig,
}

impl ScheduleMaintenance {
    pub fn new(
        appointments: Arc<dyn AppointmentRepository>,
        slots: Arc<dyn SlotStore>,
        settlements: Arc<dyn SettlementStore>,
        lifecycle: Arc<AppointmentLifecycle>,
        notifier: Notifier,
        clock: Arc<dyn Clock>,
        config: MaintenanceConfig,
    ) -> Self {
        Self {
            appointments,
            slots,
            settlements,
            lifecycle,
            notifier,
            clock,
            config,
        }
    }

    /// Sweeps on every tick until `shutdown` flips to `true`.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.interval);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("Schedule maintenance stopping");
                        return;
                    }
                }

                _ = interval.tick() => {
                    let report = self.sweep().await;
                    if report.is_idle() {
                        tracing::trace!("Sweep found nothing to do");
                    } else {
                        tracing::info!(
                            expired = report.expired,
                            completed = report.completed,
                            reclaimed = report.reclaimed,
                            pruned = report.pruned,
                            failures = report.failures,
                            "Sweep finished"
                        );
                    }
                }
            }
        }
    }

    /// Runs all passes once.
    pub async fn sweep(&self) -> SweepReport {
        let now = self.clock.now();
        let mut report = SweepReport::default();

        self.expire_pending(now, &mut report).await;
        self.complete_ended(now, &mut report).await;
        self.reclaim_slots(now, &mut report).await;
        self.prune_settlements(now, &mut report).await;

        report
    }

    async fn expire_pending(&self, now: Timestamp, report: &mut SweepReport) {
        let cutoff = now.minus_secs(secs(self.config.pending_ttl));
        let overdue = match self
            .appointments
            .find_pending_created_before(cutoff, self.config.batch_size)
            .await
        {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!(error = %e, "Could not list overdue appointments");
                report.failures += 1;
                return;
            }
        };

        for appointment in overdue {
            match self
                .lifecycle
                .cancel(&appointment, CancellationReason::PaymentTimeout)
                .await
            {
                Ok(_) => report.expired += 1,
                // Settled or cancelled since it was listed.
                Err(BookingError::InvalidTransition { .. }) => {}
                Err(e) => {
                    tracing::warn!(appointment_id = %appointment.id, error = %e, "Expiry failed");
                    report.failures += 1;
                }
            }
        }
    }

    async fn complete_ended(&self, now: Timestamp, report: &mut SweepReport) {
        let ended = match self
            .appointments
            .find_confirmed_ended_before(now, self.config.batch_size)
            .await
        {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!(error = %e, "Could not list ended appointments");
                report.failures += 1;
                return;
            }
        };

        for appointment in ended {
            match self.lifecycle.complete(&appointment).await {
                Ok(_) => report.completed += 1,
                Err(BookingError::InvalidTransition { .. }) => {}
                Err(e) => {
                    tracing::warn!(appointment_id = %appointment.id, error = %e, "Completion failed");
                    report.failures += 1;
                }
            }
        }
    }

    async fn reclaim_slots(&self, now: Timestamp, report: &mut SweepReport) {
        let held = match self
            .slots
            .list_elapsed_held(now.minus_secs(RECLAIM_GRACE_SECS), self.config.batch_size)
            .await
        {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!(error = %e, "Could not list elapsed slots");
                report.failures += 1;
                return;
            }
        };

        for slot in held {
            let Some(holder) = slot.holder else {
                tracing::error!(slot_id = %slot.id, state = slot.state.as_str(), "Held slot has no holder");
                report.failures += 1;
                continue;
            };

            match self.appointments.find_active_for_slot(slot.id).await {
                Ok(None) => {}
                Ok(Some(_)) => continue,
                Err(e) => {
                    tracing::warn!(slot_id = %slot.id, error = %e, "Could not check slot appointment");
                    report.failures += 1;
                    continue;
                }
            }

            match self.slots.release(slot.id, holder).await {
                Ok(released) => {
                    report.reclaimed += 1;
                    tracing::debug!(slot_id = %released.id, "Reclaimed elapsed slot");
                    self.notifier.emit(AppointmentEvent::SlotReleased {
                        slot_id: released.id,
                        professional_id: released.professional_id,
                        occurred_at: now,
                    });
                }
                Err(e) => {
                    tracing::warn!(slot_id = %slot.id, error = %e, "Reclaim failed");
                    report.failures += 1;
                }
            }
        }
    }

    async fn prune_settlements(&self, now: Timestamp, report: &mut SweepReport) {
        let cutoff = now.minus_secs(secs(self.config.settlement_retention));
        match self.settlements.delete_before(cutoff).await {
            Ok(n) => report.pruned = n,
            Err(e) => {
                tracing::warn!(error = %e, "Could not prune settlement records");
                report.failures += 1;
            }
        }
    }
}

fn secs(d: Duration) -> i64 {
    i64::try_from(d.as_secs()).unwrap_or(i64::MAX)
}
