//! Infrastructure wiring: picks the document store backend from configuration
//! and builds the directory and inventory manager on top of it.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use bizdesk_infra::config::{AppConfig, StoreBackend};
use bizdesk_infra::directory::DocumentDirectory;
use bizdesk_infra::document_store::{DocumentStore, InMemoryDocumentStore, PostgresDocumentStore};
use bizdesk_infra::inventory::InventoryManager;

/// Long-lived services shared by every request.
#[derive(Clone)]
pub struct AppServices {
    inventory: InventoryManager,
    directory: DocumentDirectory,
}

impl AppServices {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let directory = DocumentDirectory::new(store.clone());
        let inventory = InventoryManager::new(store, Arc::new(directory.clone()));
        Self {
            inventory,
            directory,
        }
    }

    /// Services over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryDocumentStore::new()))
    }

    pub fn inventory(&self) -> &InventoryManager {
        &self.inventory
    }

    pub fn directory(&self) -> &DocumentDirectory {
        &self.directory
    }
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    match config.store {
        StoreBackend::Memory => {
            info!("using in-memory document store");
            Ok(AppServices::in_memory())
        }
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("database_url is required for the postgres store")?;
            let store = PostgresDocumentStore::connect(url, config.max_connections)
                .await
                .context("failed to connect to postgres")?;
            store
                .ensure_schema()
                .await
                .context("failed to prepare the documents table")?;
            info!(max_connections = config.max_connections, "using postgres document store");
            Ok(AppServices::new(Arc::new(store)))
        }
    }
}
