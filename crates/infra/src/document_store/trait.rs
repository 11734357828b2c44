use std::cmp::Ordering;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

/// Field map of a document (a JSON object without its id).
pub type Fields = serde_json::Map<String, JsonValue>;

/// Opaque document identifier, unique within a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh time-ordered id (UUIDv7).
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Uuid> for DocumentId {
    fn from(value: Uuid) -> Self {
        Self(value.to_string())
    }
}

impl core::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub fields: Fields,
}

impl Document {
    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.fields.get(field)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Equality filter on a top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: JsonValue,
}

/// Query over one collection: all filters must match (AND), optional ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
}

impl Query {
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            filters: Vec::new(),
            order_by: None,
        }
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Whether a document's fields satisfy every filter. Missing fields never match.
    pub fn matches(&self, fields: &Fields) -> bool {
        self.filters
            .iter()
            .all(|f| fields.get(&f.field) == Some(&f.value))
    }
}

/// Change to a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Set(JsonValue),
    Remove,
}

/// Field-level patch. Each field appears at most once; later calls win.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldPatch {
    updates: Vec<(String, FieldUpdate)>,
}

impl FieldPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.push(field.into(), FieldUpdate::Set(value.into()));
        self
    }

    pub fn remove(mut self, field: impl Into<String>) -> Self {
        self.push(field.into(), FieldUpdate::Remove);
        self
    }

    fn push(&mut self, field: String, update: FieldUpdate) {
        self.updates.retain(|(f, _)| *f != field);
        self.updates.push((field, update));
    }

    /// Patch that turns `before` into `after`.
    pub fn diff(before: &Fields, after: &Fields) -> Self {
        let mut patch = Self::new();
        for (field, value) in after {
            if before.get(field) != Some(value) {
                patch.push(field.clone(), FieldUpdate::Set(value.clone()));
            }
        }
        for field in before.keys() {
            if !after.contains_key(field) {
                patch.push(field.clone(), FieldUpdate::Remove);
            }
        }
        patch
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn updates(&self) -> &[(String, FieldUpdate)] {
        &self.updates
    }

    pub fn apply_to(&self, fields: &mut Fields) {
        for (field, update) in &self.updates {
            match update {
                FieldUpdate::Set(v) => {
                    fields.insert(field.clone(), v.clone());
                }
                FieldUpdate::Remove => {
                    fields.remove(field);
                }
            }
        }
    }
}

/// One write inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Insert {
        collection: String,
        id: DocumentId,
        fields: Fields,
    },
    Patch {
        collection: String,
        id: DocumentId,
        patch: FieldPatch,
    },
    Delete {
        collection: String,
        id: DocumentId,
    },
}

/// Ordered list of writes committed atomically: all of them apply or none does.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, collection: &str, id: DocumentId, fields: Fields) -> &mut Self {
        self.ops.push(WriteOp::Insert {
            collection: collection.to_string(),
            id,
            fields,
        });
        self
    }

    pub fn patch(&mut self, collection: &str, id: DocumentId, patch: FieldPatch) -> &mut Self {
        self.ops.push(WriteOp::Patch {
            collection: collection.to_string(),
            id,
            patch,
        });
        self
    }

    pub fn delete(&mut self, collection: &str, id: DocumentId) -> &mut Self {
        self.ops.push(WriteOp::Delete {
            collection: collection.to_string(),
            id,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Document store operation error.
///
/// These are **infrastructure errors** (missing records, duplicate ids,
/// backend failures) as opposed to domain errors (validation, invariants).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: DocumentId },

    #[error("document {collection}/{id} already exists")]
    AlreadyExists { collection: String, id: DocumentId },

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(collection: &str, id: &DocumentId) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id: id.clone(),
        }
    }

    pub fn already_exists(collection: &str, id: &DocumentId) -> Self {
        Self::AlreadyExists {
            collection: collection.to_string(),
            id: id.clone(),
        }
    }
}

/// Generic document store client.
///
/// ## Semantics
///
/// - `insert` generates the id; batches carry caller-chosen ids so related
///   documents can reference each other before they exist.
/// - `patch`/`delete` of a missing document is `StoreError::NotFound`.
/// - `commit` applies a whole `WriteBatch` atomically.
/// - `query` returns documents matching every equality filter, ordered by the
///   requested field (ties broken by id). Without ordering, order is by id.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &DocumentId) -> Result<Option<Document>, StoreError>;

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError>;

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;

    async fn insert(&self, collection: &str, fields: Fields) -> Result<DocumentId, StoreError> {
        let id = DocumentId::generate();
        let mut batch = WriteBatch::new();
        batch.insert(collection, id.clone(), fields);
        self.commit(batch).await?;
        Ok(id)
    }

    async fn patch(
        &self,
        collection: &str,
        id: &DocumentId,
        patch: FieldPatch,
    ) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.patch(collection, id.clone(), patch);
        self.commit(batch).await
    }

    async fn delete(&self, collection: &str, id: &DocumentId) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.delete(collection, id.clone());
        self.commit(batch).await
    }
}

/// Total order over JSON values used for `order_by`:
/// null < bool < number < string < array < object.
pub(crate) fn compare_json(a: Option<&JsonValue>, b: Option<&JsonValue>) -> Ordering {
    fn rank(v: Option<&JsonValue>) -> u8 {
        match v {
            None | Some(JsonValue::Null) => 0,
            Some(JsonValue::Bool(_)) => 1,
            Some(JsonValue::Number(_)) => 2,
            Some(JsonValue::String(_)) => 3,
            Some(JsonValue::Array(_)) => 4,
            Some(JsonValue::Object(_)) => 5,
        }
    }

    match (a, b) {
        (Some(JsonValue::Bool(x)), Some(JsonValue::Bool(y))) => x.cmp(y),
        (Some(JsonValue::Number(x)), Some(JsonValue::Number(y))) => {
            match (x.as_i64(), y.as_i64()) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => x
                    .as_f64()
                    .partial_cmp(&y.as_f64())
                    .unwrap_or(Ordering::Equal),
            }
        }
        (Some(JsonValue::String(x)), Some(JsonValue::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(v: JsonValue) -> Fields {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn query_matches_all_filters() {
        let q = Query::collection("assignments")
            .where_eq("status", "active")
            .where_eq("itemId", "i-1");
        assert!(q.matches(&fields(json!({"status": "active", "itemId": "i-1", "x": 1}))));
        assert!(!q.matches(&fields(json!({"status": "returned", "itemId": "i-1"}))));
        assert!(!q.matches(&fields(json!({"status": "active"}))));
    }

    #[test]
    fn diff_sets_changed_and_removes_dropped_fields() {
        let before = fields(json!({"name": "Desk", "notes": "old", "status": "available"}));
        let after = fields(json!({"name": "Desk", "status": "maintenance", "purchasePrice": 100}));
        let patch = FieldPatch::diff(&before, &after);

        let mut applied = before.clone();
        patch.apply_to(&mut applied);
        assert_eq!(applied, after);
        assert_eq!(patch.updates().len(), 3);
    }

    #[test]
    fn later_updates_to_a_field_win() {
        let patch = FieldPatch::new().set("status", "assigned").remove("status");
        assert_eq!(patch.updates(), &[("status".to_string(), FieldUpdate::Remove)]);
    }

    #[test]
    fn numbers_order_numerically() {
        let a = json!(9);
        let b = json!(10);
        assert_eq!(compare_json(Some(&a), Some(&b)), Ordering::Less);
        assert_eq!(compare_json(None, Some(&a)), Ordering::Less);
    }
}
