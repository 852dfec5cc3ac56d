//! Payments domain
//!
//! Records manual payments against invoices, initiates online checkout
//! through an external card gateway, and settles gateway transactions
//! exactly once. The gateway reference string is the idempotency key for
//! the whole settlement path: webhooks and manual re-verification may both
//! arrive for the same payment, and only the first settlement credits the
//! invoice.

pub mod adapters;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod ports;
pub mod settlement;
pub mod transaction;

pub use error::PaymentError;
pub use gateway::{
    CheckoutSession, GatewayError, GatewayPaymentStatus, GatewayVerification, InitializePayment,
    PaymentGateway,
};
pub use ledger::{CheckoutReceipt, PaymentLedger, PaymentReceipt};
pub use ports::TransactionStore;
pub use settlement::{SettlementOutcome, SettlementVerifier};
pub use transaction::{PaymentMethod, PaymentTransaction, TransactionStatus};
