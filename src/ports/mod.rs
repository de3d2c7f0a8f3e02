//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `SlotStore` - Schedules and the slot compare-and-swap primitives
//! - `AppointmentRepository` - Appointments with status-guarded writes
//! - `SettlementStore` - Idempotency tracking for payment settlements
//!
//! ## External Ports
//!
//! - `PaymentGateway` - Transaction initialization and settlement signals
//! - `EventPublisher` - State-change notifications
//! - `Clock` - Source of "now"

mod appointment_repository;
mod clock;
mod event_publisher;
mod payment_gateway;
mod settlement_store;
mod slot_store;

pub use appointment_repository::AppointmentRepository;
pub use clock::{Clock, SystemClock};
pub use event_publisher::EventPublisher;
pub use payment_gateway::{
    InitializeTransaction, PaymentError, PaymentErrorCode, PaymentGateway, SettlementPayload,
    TransactionHandle, WebhookDelivery,
};
pub use settlement_store::{SaveResult, SettlementStore};
pub use slot_store::SlotStore;
