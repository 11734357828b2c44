//! Infrastructure layer: document store, membership directory, inventory
//! manager and configuration.

pub mod config;
pub mod directory;
pub mod document_store;
pub mod inventory;
