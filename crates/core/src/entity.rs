//! Entity traits: identity + continuity across state changes, and tenant ownership.

use crate::id::CompanyId;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// Marks records that live inside a single company (the tenant boundary).
///
/// Infrastructure uses this to reject reads and writes that cross companies:
/// a record owned by another company is reported as not found.
pub trait CompanyScoped {
    fn company_id(&self) -> CompanyId;

    fn belongs_to(&self, company_id: CompanyId) -> bool {
        self.company_id() == company_id
    }
}
