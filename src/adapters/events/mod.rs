//! Event publishing adapters.
//!
//! - `InMemoryEventBus` - In-process capture for tests and local runs
//! - `HttpEventPublisher` - Fan-out to a notification relay
//! - `TracingEventPublisher` - Log-only fallback

mod http_publisher;
mod in_memory;
mod tracing_publisher;

pub use http_publisher::{HttpEventPublisher, EVENT_ID_HEADER};
pub use in_memory::InMemoryEventBus;
pub use tracing_publisher::TracingEventPublisher;
