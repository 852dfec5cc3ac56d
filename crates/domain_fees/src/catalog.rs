//! Fee catalog configuration types
//!
//! The catalog maps (class, category, term, session) to an amount. It is
//! maintained by school administrators and consumed by the invoice
//! generator; nothing in this module computes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{
    AcademicSession, ClassroomId, FeeCategoryId, FeeScheduleId, Money, TenantId, Term,
};

/// A named fee category, e.g. "Tuition", "Boarding", "Bus"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeCategory {
    /// Unique identifier
    pub id: FeeCategoryId,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Display name
    pub name: String,
    /// Whether every eligible student is billed for this category.
    /// Optional categories are included only when the generation policy
    /// asks for them.
    pub mandatory: bool,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl FeeCategory {
    /// Creates a mandatory category
    pub fn mandatory(tenant_id: TenantId, name: impl Into<String>) -> Self {
        Self {
            id: FeeCategoryId::new_v7(),
            tenant_id,
            name: name.into(),
            mandatory: true,
            created_at: Utc::now(),
        }
    }

    /// Creates an optional (opt-in) category
    pub fn optional(tenant_id: TenantId, name: impl Into<String>) -> Self {
        Self {
            mandatory: false,
            ..Self::mandatory(tenant_id, name)
        }
    }
}

/// One line of the fee schedule: what a class pays for a category in a term
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeScheduleEntry {
    /// Unique identifier
    pub id: FeeScheduleId,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Class this entry applies to
    pub classroom_id: ClassroomId,
    /// Fee category billed
    pub category_id: FeeCategoryId,
    /// Whether the category is mandatory (denormalized from the category
    /// so the generator can filter without a second lookup)
    pub mandatory: bool,
    /// School term
    pub term: Term,
    /// Academic session
    pub session: AcademicSession,
    /// Amount billed for this entry
    pub amount: Money,
}

impl FeeScheduleEntry {
    /// Creates a schedule entry for a category
    pub fn new(
        category: &FeeCategory,
        classroom_id: ClassroomId,
        term: Term,
        session: AcademicSession,
        amount: Money,
    ) -> Self {
        Self {
            id: FeeScheduleId::new_v7(),
            tenant_id: category.tenant_id,
            classroom_id,
            category_id: category.id,
            mandatory: category.mandatory,
            term,
            session,
            amount,
        }
    }
}
