//! Fees Domain - Catalog, Invoices, and Access Gating
//!
//! This crate implements the billing side of the fee ledger:
//!
//! - **Fee Catalog**: tenant-scoped fee categories and the per-class,
//!   per-term schedule of amounts. Pure configuration; consumed, not
//!   computed.
//! - **Invoice**: the per-student, per-term billing aggregate. Its status
//!   is always a deterministic function of `amount` vs `amount_paid`.
//! - **Invoice Generator**: the idempotent batch operation that turns the
//!   catalog into invoices for every eligible student.
//! - **Result Gate**: the policy that withholds protected content until the
//!   relevant invoice is fully paid.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_fees::{InvoiceGenerator, GenerationPolicy};
//!
//! let generator = InvoiceGenerator::new(students, catalog, invoices);
//! let summary = generator
//!     .generate(tenant, Term::First, session, GenerationPolicy::default())
//!     .await?;
//! println!("generated {}, already billed {}", summary.generated, summary.already_billed);
//! ```

pub mod catalog;
pub mod error;
pub mod gatekeeper;
pub mod generator;
pub mod invoice;
pub mod ports;

pub use catalog::{FeeCategory, FeeScheduleEntry};
pub use error::FeesError;
pub use gatekeeper::{AccessDecision, ResultGate};
pub use generator::{GenerationPolicy, GenerationSummary, InvoiceGenerator};
pub use invoice::{Invoice, InvoiceStatus};
pub use ports::{FeeCatalog, InsertOutcome, InvoiceStore, StudentDirectory, StudentRecord};
