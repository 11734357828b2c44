use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use super::r#trait::{
    Direction, Document, DocumentId, DocumentStore, Fields, Query, StoreError, WriteBatch, WriteOp,
    compare_json,
};

type Collection = BTreeMap<DocumentId, Fields>;

/// In-memory document store.
///
/// Intended for tests/dev. Not optimized for performance. A batch is applied to
/// staged copies of the collections it touches and swapped in only when every
/// write succeeded, all under one write lock.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|c| c.get(collection).map(|docs| docs.len()).unwrap_or(0))
            .unwrap_or(0)
    }

    fn apply(staged: &mut HashMap<String, Collection>, op: WriteOp) -> Result<(), StoreError> {
        match op {
            WriteOp::Insert {
                collection,
                id,
                fields,
            } => {
                let docs = staged.entry(collection.clone()).or_default();
                if docs.contains_key(&id) {
                    return Err(StoreError::already_exists(&collection, &id));
                }
                docs.insert(id, fields);
            }
            WriteOp::Patch {
                collection,
                id,
                patch,
            } => {
                let fields = staged
                    .get_mut(&collection)
                    .and_then(|docs| docs.get_mut(&id))
                    .ok_or_else(|| StoreError::not_found(&collection, &id))?;
                patch.apply_to(fields);
            }
            WriteOp::Delete { collection, id } => {
                staged
                    .get_mut(&collection)
                    .and_then(|docs| docs.remove(&id))
                    .ok_or_else(|| StoreError::not_found(&collection, &id))?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: &str, id: &DocumentId) -> Result<Option<Document>, StoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document {
                id: id.clone(),
                fields: fields.clone(),
            }))
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        let mut docs: Vec<Document> = collections
            .get(&query.collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, fields)| query.matches(fields))
                    .map(|(id, fields)| Document {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order_by {
            docs.sort_by(|a, b| {
                let ord = compare_json(a.get(&order.field), b.get(&order.field))
                    .then_with(|| a.id.cmp(&b.id));
                match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }

        Ok(docs)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut collections = self
            .collections
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        let mut staged: HashMap<String, Collection> = HashMap::new();
        for op in batch.into_ops() {
            let name = match &op {
                WriteOp::Insert { collection, .. }
                | WriteOp::Patch { collection, .. }
                | WriteOp::Delete { collection, .. } => collection.clone(),
            };
            if !staged.contains_key(&name) {
                let current = collections.get(&name).cloned().unwrap_or_default();
                staged.insert(name, current);
            }
            Self::apply(&mut staged, op)?;
        }

        collections.extend(staged);
        Ok(())
    }
}
