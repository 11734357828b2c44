//! Document store boundary.
//!
//! Named collections of JSON documents with generated ids, equality queries,
//! field-level patches and atomic write batches. The inventory manager and the
//! membership directory only talk to this trait; backends live next to it.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
pub use r#trait::{
    Direction, Document, DocumentId, DocumentStore, FieldPatch, FieldUpdate, Fields, Filter,
    OrderBy, Query, StoreError, WriteBatch, WriteOp,
};

/// Collection names shared by every backend.
pub mod collections {
    pub const INVENTORY_ITEMS: &str = "inventoryItems";
    pub const ASSIGNMENTS: &str = "assignments";
    pub const USERS: &str = "users";
}
