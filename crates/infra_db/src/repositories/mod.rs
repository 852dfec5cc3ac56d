//! Repository implementations
//!
//! One module per aggregate. Row structs derive `sqlx::FromRow` and are
//! converted to domain types in one place per module; enum-ish columns
//! (term, status, currency) are stored as their canonical lowercase
//! strings and re-parsed on read, with a parse failure surfacing as a
//! corrupt-row internal error rather than a panic.

pub mod catalog;
pub mod invoices;
pub mod reconciliation;
pub mod transactions;

use core_kernel::{Currency, Money, PortError};
use rust_decimal::Decimal;

/// Maps a stored (amount, currency) pair back to Money
pub(crate) fn money_from_row(amount: Decimal, currency: &str) -> Result<Money, PortError> {
    let currency: Currency = currency
        .parse()
        .map_err(|_| PortError::internal(format!("Corrupt currency code '{currency}'")))?;
    Ok(Money::new(amount, currency))
}

/// Parses a stored canonical string into a domain enum
pub(crate) fn parse_column<T>(column: &str, raw: &str) -> Result<T, PortError>
where
    T: std::str::FromStr,
{
    raw.parse()
        .map_err(|_| PortError::internal(format!("Corrupt {column} value '{raw}'")))
}
