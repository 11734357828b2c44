//! Inventory/assignment manager: item and assignment records over the document
//! store, with the rules that keep an item's status in line with its
//! assignments.

pub mod manager;
pub(crate) mod records;

pub use manager::{CreatedItem, InventoryManager, InventorySummary, ItemFilter, ReturnedItem};

use thiserror::Error;

use bizdesk_core::DomainError;

use crate::document_store::StoreError;

/// Error returned by every manager operation.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Business rule rejected the operation (validation, state, not found).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The store failed to read or write.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A stored document could not be mapped to a domain record.
    #[error("failed to decode document: {0}")]
    Decode(String),
}

impl InventoryError {
    pub fn not_found() -> Self {
        Self::Domain(DomainError::not_found())
    }
}
