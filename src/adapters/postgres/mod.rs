//! PostgreSQL adapters - Database implementations for storage ports.
//!
//! - `PostgresSlotStore` - Schedules and slot compare-and-swap
//! - `PostgresAppointmentRepository` - Status-guarded appointment writes
//! - `PostgresSettlementStore` - Processed settlement keys
//!
//! Schema lives in `migrations/`; `MIGRATOR` embeds it.

mod appointment_repository;
mod settlement_store;
mod slot_store;

pub use appointment_repository::PostgresAppointmentRepository;
pub use settlement_store::PostgresSettlementStore;
pub use slot_store::PostgresSlotStore;

/// Embedded schema migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
