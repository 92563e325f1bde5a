use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Row, Sqlite};

use crate::core::current_time_millis;
use crate::error::{AppError, AppResult};
use crate::store::{DocId, Document, DocumentStore, NewDocument, StoreTransaction};

/// SQLite implementation of the document store. One `documents` table holds
/// every collection; bodies are JSON text.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(url: &str) -> AppResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect to {}: {}", url, e)))?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// In-memory store for tests. A single pooled connection keeps every
    /// caller on the same memory database.
    pub async fn new_in_memory() -> AppResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to connect to in-memory SQLite: {}", e))
            })?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    async fn initialize(&self) -> AppResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id INTEGER NOT NULL,
                owner INTEGER,
                parent INTEGER,
                data TEXT NOT NULL,
                time_created INTEGER NOT NULL,
                time_updated INTEGER NOT NULL,
                version INTEGER NOT NULL DEFAULT 1,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create documents table: {}", e)))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_documents_owner ON documents(collection, owner)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create owner index: {}", e)))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_documents_parent ON documents(collection, parent)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create parent index: {}", e)))?;

        Ok(())
    }
}

fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> AppResult<Document> {
    let data: String = row.get("data");
    let data: Value = serde_json::from_str(&data)
        .map_err(|e| AppError::Serialization(format!("Corrupt document body: {}", e)))?;

    Ok(Document {
        collection: row.get("collection"),
        id: row.get("id"),
        owner: row.get("owner"),
        parent: row.get("parent"),
        data,
        created_time: row.get("time_created"),
        updated_time: row.get("time_updated"),
        version: row.get::<i64, _>("version") as u64,
    })
}

fn encode_body(data: &Value) -> AppResult<String> {
    serde_json::to_string(data)
        .map_err(|e| AppError::Serialization(format!("Failed to encode document body: {}", e)))
}

fn map_insert_error(collection: &str, id: DocId, e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation => {
            AppError::Conflict(format!(
                "Document {} already exists in {}",
                id, collection
            ))
        }
        _ => AppError::DatabaseError(format!(
            "Failed to insert document {} into {}: {}",
            id, collection, e
        )),
    }
}

const SELECT_COLUMNS: &str =
    "SELECT collection, id, owner, parent, data, time_created, time_updated, version FROM documents";

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn begin(&self) -> AppResult<StoreTransaction> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to begin transaction: {}", e)))?;
        Ok(StoreTransaction::new(tx))
    }

    async fn insert(&self, collection: &str, doc: NewDocument) -> AppResult<Document> {
        let now = current_time_millis();
        let body = encode_body(&doc.data)?;

        sqlx::query(
            "INSERT INTO documents (collection, id, owner, parent, data, time_created, time_updated) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(collection)
        .bind(doc.id)
        .bind(doc.owner)
        .bind(doc.parent)
        .bind(body)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(collection, doc.id, e))?;

        Ok(Document {
            collection: collection.to_string(),
            id: doc.id,
            owner: doc.owner,
            parent: doc.parent,
            data: doc.data,
            created_time: now,
            updated_time: now,
            version: 1,
        })
    }

    async fn get(&self, collection: &str, id: DocId) -> AppResult<Option<Document>> {
        let row = sqlx::query(&format!("{} WHERE collection = ? AND id = ?", SELECT_COLUMNS))
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to get document {}: {}", id, e))
            })?;

        row.as_ref().map(row_to_document).transpose()
    }

    async fn list(&self, collection: &str) -> AppResult<Vec<Document>> {
        let rows = sqlx::query(&format!(
            "{} WHERE collection = ? ORDER BY time_created, id",
            SELECT_COLUMNS
        ))
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(format!("Failed to list collection {}: {}", collection, e))
        })?;

        rows.iter().map(row_to_document).collect()
    }

    async fn find_by_owner(&self, collection: &str, owner: i64) -> AppResult<Vec<Document>> {
        let rows = sqlx::query(&format!(
            "{} WHERE collection = ? AND owner = ? ORDER BY time_created, id",
            SELECT_COLUMNS
        ))
        .bind(collection)
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(format!("Failed to query {} by owner: {}", collection, e))
        })?;

        rows.iter().map(row_to_document).collect()
    }

    async fn find_by_owners(&self, collection: &str, owners: &[i64]) -> AppResult<Vec<Document>> {
        if owners.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "{} WHERE collection = ",
            SELECT_COLUMNS
        ));
        qb.push_bind(collection);
        qb.push(" AND owner IN (");
        let mut separated = qb.separated(",");
        for owner in owners {
            separated.push_bind(*owner);
        }
        qb.push(") ORDER BY time_created, id");

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to query {} by owners: {}", collection, e))
            })?;

        rows.iter().map(row_to_document).collect()
    }

    async fn find_by_parent(&self, collection: &str, parent: i64) -> AppResult<Vec<Document>> {
        let rows = sqlx::query(&format!(
            "{} WHERE collection = ? AND parent = ? ORDER BY time_created, id",
            SELECT_COLUMNS
        ))
        .bind(collection)
        .bind(parent)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(format!("Failed to query {} by parent: {}", collection, e))
        })?;

        rows.iter().map(row_to_document).collect()
    }

    async fn update(&self, collection: &str, id: DocId, data: Value) -> AppResult<()> {
        let now = current_time_millis();
        let body = encode_body(&data)?;

        let result = sqlx::query(
            "UPDATE documents SET data = ?, time_updated = ?, version = version + 1 \
             WHERE collection = ? AND id = ?",
        )
        .bind(body)
        .bind(now)
        .bind(collection)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to update document {}: {}", id, e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Document {} not found in {}",
                id, collection
            )));
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: DocId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to delete document {}: {}", id, e))
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_owner(&self, collection: &str, owner: i64) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND owner = ?")
            .bind(collection)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!(
                    "Failed to delete {} by owner {}: {}",
                    collection, owner, e
                ))
            })?;
        Ok(result.rows_affected())
    }

    async fn get_tx(
        &self,
        tx: &mut StoreTransaction,
        collection: &str,
        id: DocId,
    ) -> AppResult<Option<Document>> {
        let row = sqlx::query(&format!("{} WHERE collection = ? AND id = ?", SELECT_COLUMNS))
            .bind(collection)
            .bind(id)
            .fetch_optional(tx.conn())
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!(
                    "Failed to get document {} in transaction: {}",
                    id, e
                ))
            })?;

        row.as_ref().map(row_to_document).transpose()
    }

    async fn insert_tx(
        &self,
        tx: &mut StoreTransaction,
        collection: &str,
        doc: NewDocument,
    ) -> AppResult<Document> {
        let now = current_time_millis();
        let body = encode_body(&doc.data)?;

        sqlx::query(
            "INSERT INTO documents (collection, id, owner, parent, data, time_created, time_updated) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(collection)
        .bind(doc.id)
        .bind(doc.owner)
        .bind(doc.parent)
        .bind(body)
        .bind(now)
        .bind(now)
        .execute(tx.conn())
        .await
        .map_err(|e| map_insert_error(collection, doc.id, e))?;

        Ok(Document {
            collection: collection.to_string(),
            id: doc.id,
            owner: doc.owner,
            parent: doc.parent,
            data: doc.data,
            created_time: now,
            updated_time: now,
            version: 1,
        })
    }

    async fn update_tx(
        &self,
        tx: &mut StoreTransaction,
        collection: &str,
        id: DocId,
        data: Value,
    ) -> AppResult<()> {
        let now = current_time_millis();
        let body = encode_body(&data)?;

        let result = sqlx::query(
            "UPDATE documents SET data = ?, time_updated = ?, version = version + 1 \
             WHERE collection = ? AND id = ?",
        )
        .bind(body)
        .bind(now)
        .bind(collection)
        .bind(id)
        .execute(tx.conn())
        .await
        .map_err(|e| {
            AppError::DatabaseError(format!(
                "Failed to update document {} in transaction: {}",
                id, e
            ))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Document {} not found in {}",
                id, collection
            )));
        }
        Ok(())
    }
}
