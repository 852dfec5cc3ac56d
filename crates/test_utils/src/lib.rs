//! Test Utilities Crate
//!
//! Shared test infrastructure for the fee ledger test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built test data for common entities
//! - `memory`: In-memory port adapters for wiring services without a database
//! - `gateway`: A scripted payment gateway double

pub mod fixtures;
pub mod gateway;
pub mod memory;

pub use fixtures::*;
pub use gateway::*;
pub use memory::*;
