//! Paystack payment gateway adapters.
//!
//! - `PaystackGateway` - production adapter over the Paystack REST API
//! - `MockPaymentGateway` - scriptable gateway for tests and local runs

mod api_types;
mod mock_gateway;
mod paystack_gateway;

pub use mock_gateway::MockPaymentGateway;
pub use paystack_gateway::{PaystackConfig, PaystackGateway, SIGNATURE_HEADER};
