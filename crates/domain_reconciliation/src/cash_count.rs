//! Physical cash count
//!
//! Bursars count cash the way banks bundle it: notes are strapped in
//! bundles of 100, with loose notes on top. One `CashCount` row per
//! denomination; the sheet total is the sum of the per-denomination
//! subtotals.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{CashCountId, Currency, Money, ReconciliationSessionId, TenantId};

use crate::error::ReconciliationError;

/// Notes per strapped bundle
pub const NOTES_PER_BUNDLE: u32 = 100;

/// The count for a single note denomination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashCount {
    pub id: CashCountId,
    pub tenant_id: TenantId,
    pub session_id: ReconciliationSessionId,
    /// Face value of the note in major units, e.g. 1000 for a ₦1000 note
    pub denomination: u32,
    /// Strapped bundles of [`NOTES_PER_BUNDLE`] notes
    pub bundle_count: u32,
    /// Loose notes outside any bundle
    pub loose_count: u32,
}

impl CashCount {
    /// Records a count for one denomination
    pub fn new(
        tenant_id: TenantId,
        session_id: ReconciliationSessionId,
        denomination: u32,
        bundle_count: u32,
        loose_count: u32,
    ) -> Result<Self, ReconciliationError> {
        if denomination == 0 {
            return Err(ReconciliationError::Validation(
                "Denomination must be positive".to_string(),
            ));
        }
        Ok(Self {
            id: CashCountId::new_v7(),
            tenant_id,
            session_id,
            denomination,
            bundle_count,
            loose_count,
        })
    }

    /// Total notes of this denomination
    pub fn note_count(&self) -> u64 {
        u64::from(self.bundle_count) * u64::from(NOTES_PER_BUNDLE) + u64::from(self.loose_count)
    }

    /// Value of this denomination's count
    pub fn subtotal(&self, currency: Currency) -> Money {
        let value = Decimal::from(u64::from(self.denomination) * self.note_count());
        Money::new(value, currency)
    }
}

/// Sums a sheet of per-denomination counts
pub fn sheet_total(counts: &[CashCount], currency: Currency) -> Money {
    counts
        .iter()
        .map(|c| c.subtotal(currency))
        .fold(Money::zero(currency), |acc, sub| acc + sub)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn count(denomination: u32, bundles: u32, loose: u32) -> CashCount {
        CashCount::new(
            TenantId::new(),
            ReconciliationSessionId::new(),
            denomination,
            bundles,
            loose,
        )
        .unwrap()
    }

    #[test]
    fn bundle_arithmetic() {
        // 2 bundles and 3 loose = 203 notes of 1000 = 203,000
        let c = count(1000, 2, 3);
        assert_eq!(c.note_count(), 203);
        assert_eq!(
            c.subtotal(Currency::NGN),
            Money::new(dec!(203000), Currency::NGN)
        );
    }

    #[test]
    fn sheet_total_sums_denominations() {
        let counts = vec![count(1000, 2, 3), count(500, 1, 0)];
        // 203,000 + 50,000
        assert_eq!(
            sheet_total(&counts, Currency::NGN),
            Money::new(dec!(253000), Currency::NGN)
        );
    }

    #[test]
    fn empty_sheet_is_zero() {
        assert!(sheet_total(&[], Currency::NGN).is_zero());
    }

    #[test]
    fn zero_denomination_is_rejected() {
        let err = CashCount::new(
            TenantId::new(),
            ReconciliationSessionId::new(),
            0,
            1,
            0,
        )
        .unwrap_err();
        assert!(matches!(err, ReconciliationError::Validation(_)));
    }
}
