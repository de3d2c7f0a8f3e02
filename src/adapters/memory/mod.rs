//! In-memory storage adapters.
//!
//! Backing for tests and for running the service without Postgres.

mod appointment_repository;
mod settlement_store;
mod slot_store;

pub use appointment_repository::InMemoryAppointmentRepository;
pub use settlement_store::InMemorySettlementStore;
pub use slot_store::InMemorySlotStore;
