//! Inventory domain module.
//!
//! This crate contains business rules for company inventory and the
//! assignment/return lifecycle, implemented purely as deterministic domain
//! logic (no IO, no HTTP, no storage).

pub mod assignment;
pub mod category;
pub mod item;

pub use assignment::{
    Assignment, AssignmentStatus, ItemRef, count_active, ensure_distinct_assignees,
    sort_newest_first,
};
pub use category::{Attributes, Category};
pub use item::{InventoryItem, ItemPatch, ItemStatus, NewItem, Patch, UserRef};

/// Trim a free-text note; blank notes are treated as absent.
pub fn normalize_note(note: Option<String>) -> Option<String> {
    note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}
