//! Gateway adapters

pub mod paystack;

pub use paystack::{PaystackConfig, PaystackGateway};
