//! carebook - appointment scheduling and booking for a healthcare marketplace
//!
//! Professionals publish availability as slots; clients book a slot, pay
//! through the payment gateway, and the appointment moves through
//! `pending -> confirmed -> completed` (or `cancelled`).
//!
//! Layout follows hexagonal architecture:
//! - `domain` - slots, schedules, appointments and their state machines
//! - `ports` - storage, gateway, publisher and clock contracts
//! - `adapters` - Postgres, in-memory, Paystack, HTTP and event implementations
//! - `application` - command/query handlers and the maintenance sweep
//! - `config` - environment-driven configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
