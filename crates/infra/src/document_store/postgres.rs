//! Postgres-backed document store implementation.
//!
//! All collections share one `documents` table (see `migrations/`), keyed by
//! `(collection, id)` with the document fields in a JSONB column.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `AlreadyExists` |
//! | Database (other) | Any other | `Backend` |
//! | Other | N/A | `Backend` |
//!
//! ## Thread Safety
//!
//! `PostgresDocumentStore` is `Send + Sync`; the SQLx pool handles connection
//! sharing. Every `commit` runs in its own transaction.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction};
use tracing::instrument;

use super::r#trait::{
    Direction, Document, DocumentId, DocumentStore, FieldPatch, FieldUpdate, Fields, Query,
    StoreError, WriteBatch, WriteOp,
};

const SCHEMA: &str = include_str!("../../migrations/0001_documents.sql");

#[derive(Debug, Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the `documents` table and indexes if they do not exist.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    async fn apply(tx: &mut Transaction<'_, Postgres>, op: WriteOp) -> Result<(), StoreError> {
        match op {
            WriteOp::Insert {
                collection,
                id,
                fields,
            } => {
                sqlx::query("INSERT INTO documents (collection, id, fields) VALUES ($1, $2, $3)")
                    .bind(&collection)
                    .bind(id.as_str())
                    .bind(Json(JsonValue::Object(fields)))
                    .execute(&mut **tx)
                    .await
                    .map_err(|e| match map_sqlx_error("insert", e) {
                        StoreError::AlreadyExists { .. } => {
                            StoreError::already_exists(&collection, &id)
                        }
                        other => other,
                    })?;
            }
            WriteOp::Patch {
                collection,
                id,
                patch,
            } => {
                let (set, remove) = split_patch(&patch);
                let result = sqlx::query(
                    r#"
                    UPDATE documents
                    SET fields = (fields || $3) - $4::text[],
                        updated_at = NOW()
                    WHERE collection = $1 AND id = $2
                    "#,
                )
                .bind(&collection)
                .bind(id.as_str())
                .bind(Json(JsonValue::Object(set)))
                .bind(remove)
                .execute(&mut **tx)
                .await
                .map_err(|e| map_sqlx_error("patch", e))?;

                if result.rows_affected() == 0 {
                    return Err(StoreError::not_found(&collection, &id));
                }
            }
            WriteOp::Delete { collection, id } => {
                let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
                    .bind(&collection)
                    .bind(id.as_str())
                    .execute(&mut **tx)
                    .await
                    .map_err(|e| map_sqlx_error("delete", e))?;

                if result.rows_affected() == 0 {
                    return Err(StoreError::not_found(&collection, &id));
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    #[instrument(skip(self, id), fields(id = %id), err)]
    async fn get(&self, collection: &str, id: &DocumentId) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query("SELECT id, fields FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get", e))?;

        row.map(|r| row_to_document(&r)).transpose()
    }

    #[instrument(skip(self, query), fields(collection = %query.collection), err)]
    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT id, fields FROM documents WHERE collection = ");
        qb.push_bind(query.collection.clone());

        if !query.filters.is_empty() {
            // Equality on scalar fields is expressed as containment so the GIN index applies.
            let mut wanted = Fields::new();
            for f in &query.filters {
                wanted.insert(f.field.clone(), f.value.clone());
            }
            qb.push(" AND fields @> ");
            qb.push_bind(Json(JsonValue::Object(wanted)));
        }

        match &query.order_by {
            Some(order) => {
                let (dir, nulls) = match order.direction {
                    Direction::Ascending => ("ASC", "NULLS FIRST"),
                    Direction::Descending => ("DESC", "NULLS LAST"),
                };
                qb.push(" ORDER BY fields -> ");
                qb.push_bind(order.field.clone());
                qb.push(format!(" {dir} {nulls}, id {dir}"));
            }
            None => {
                qb.push(" ORDER BY id ASC");
            }
        }

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("query", e))?;

        rows.iter().map(row_to_document).collect()
    }

    #[instrument(skip(self, batch), fields(ops = batch.len()), err)]
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        for op in batch.into_ops() {
            // Dropping `tx` on error rolls the whole batch back.
            Self::apply(&mut tx, op).await?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }
}

fn split_patch(patch: &FieldPatch) -> (Fields, Vec<String>) {
    let mut set = Fields::new();
    let mut remove = Vec::new();
    for (field, update) in patch.updates() {
        match update {
            FieldUpdate::Set(v) => {
                set.insert(field.clone(), v.clone());
            }
            FieldUpdate::Remove => remove.push(field.clone()),
        }
    }
    (set, remove)
}

fn row_to_document(row: &sqlx::postgres::PgRow) -> Result<Document, StoreError> {
    let id: String = row
        .try_get("id")
        .map_err(|e| StoreError::InvalidDocument(format!("id column: {e}")))?;
    let Json(fields): Json<JsonValue> = row
        .try_get("fields")
        .map_err(|e| StoreError::InvalidDocument(format!("fields column: {e}")))?;

    match fields {
        JsonValue::Object(fields) => Ok(Document {
            id: DocumentId::new(id),
            fields,
        }),
        other => Err(StoreError::InvalidDocument(format!(
            "document {id} is not a JSON object: {other}"
        ))),
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                StoreError::AlreadyExists {
                    collection: String::new(),
                    id: DocumentId::new(String::new()),
                }
            } else {
                StoreError::Backend(format!(
                    "database error in {operation}: {}",
                    db_err.message()
                ))
            }
        }
        other => StoreError::Backend(format!("{operation} failed: {other}")),
    }
}

#[cfg(test)]
mod tests {
    //! Runs only when `DATABASE_URL` points at a scratch Postgres database.

    use super::*;
    use serde_json::json;

    async fn store() -> Option<PostgresDocumentStore> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let store = PostgresDocumentStore::connect(&url, 2).await.ok()?;
        store.ensure_schema().await.ok()?;
        Some(store)
    }

    #[tokio::test]
    async fn batch_is_atomic_and_queries_filter() {
        let Some(store) = store().await else {
            return;
        };
        let company = DocumentId::generate().to_string();

        let mut batch = WriteBatch::new();
        let a = DocumentId::generate();
        batch.insert(
            "assignments",
            a.clone(),
            json!({"companyId": company, "status": "active", "assignedAt": 2})
                .as_object()
                .cloned()
                .unwrap(),
        );
        batch.patch(
            "assignments",
            DocumentId::generate(),
            FieldPatch::new().set("status", "returned"),
        );
        assert!(store.commit(batch).await.is_err());
        assert!(store.get("assignments", &a).await.unwrap().is_none());

        for at in [1, 3] {
            store
                .insert(
                    "assignments",
                    json!({"companyId": company, "status": "active", "assignedAt": at})
                        .as_object()
                        .cloned()
                        .unwrap(),
                )
                .await
                .unwrap();
        }
        let docs = store
            .query(
                &Query::collection("assignments")
                    .where_eq("companyId", company.clone())
                    .where_eq("status", "active")
                    .order_by("assignedAt", Direction::Descending),
            )
            .await
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].get("assignedAt"), Some(&json!(3)));
    }
}
