//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `memory` - In-process stores for tests and database-less runs
//! - `postgres` - PostgreSQL stores
//! - `paystack` - Payment gateway (live and mock)
//! - `events` - Notification publishers
//! - `http` - REST API
//! - `clock` - Test clock

mod clock;
pub mod events;
pub mod http;
pub mod memory;
pub mod paystack;
pub mod postgres;

pub use clock::FixedClock;
pub use events::{HttpEventPublisher, InMemoryEventBus, TracingEventPublisher};
