// Document store - persistence interface for JSON documents.
//
// Documents live in named collections and are keyed by a 64-bit id. The
// `owner` and `parent` columns are indexed reference fields used for the
// by-author and by-post lookups; everything else lives in the JSON body.
// A single-document write is atomic; multi-document units go through
// `StoreTransaction`.

pub mod sqlite;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sqlx::Sqlite;

use crate::error::{AppError, AppResult};

pub use sqlite::SqliteStore;

pub type DocId = i64;

/// A stored document together with its bookkeeping columns.
#[derive(Debug, Clone)]
pub struct Document {
    pub collection: String,
    pub id: DocId,
    pub owner: Option<i64>,
    pub parent: Option<i64>,
    pub data: Value,
    pub created_time: i64,
    pub updated_time: i64,
    pub version: u64,
}

impl Document {
    /// Deserialize the JSON body into a typed model.
    pub fn decode<T: DeserializeOwned>(&self) -> AppResult<T> {
        serde_json::from_value(self.data.clone())
            .map_err(|e| AppError::Serialization(format!("Failed to decode document: {}", e)))
    }
}

/// Serialize a model into a document body.
pub fn encode<T: Serialize>(value: &T) -> AppResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| AppError::Serialization(format!("Failed to encode document: {}", e)))
}

/// Fields for a document about to be inserted.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub id: DocId,
    pub owner: Option<i64>,
    pub parent: Option<i64>,
    pub data: Value,
}

impl NewDocument {
    pub fn new(id: DocId, data: Value) -> Self {
        Self {
            id,
            owner: None,
            parent: None,
            data,
        }
    }

    pub fn owned_by(mut self, owner: i64) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn child_of(mut self, parent: i64) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// An open store transaction. Writes issued through the `_tx` methods become
/// visible to other readers only on commit.
pub struct StoreTransaction {
    tx: sqlx::Transaction<'static, Sqlite>,
}

impl StoreTransaction {
    pub(crate) fn new(tx: sqlx::Transaction<'static, Sqlite>) -> Self {
        Self { tx }
    }

    pub(crate) fn conn(&mut self) -> &mut sqlx::SqliteConnection {
        &mut self.tx
    }

    pub async fn commit(self) -> AppResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit transaction: {}", e)))
    }

    pub async fn rollback(self) -> AppResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to roll back transaction: {}", e)))
    }
}

/// Persistence contract consumed by the services.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn begin(&self) -> AppResult<StoreTransaction>;

    /// Insert a new document. Fails with `Conflict` if the (collection, id)
    /// pair already exists.
    async fn insert(&self, collection: &str, doc: NewDocument) -> AppResult<Document>;
    async fn get(&self, collection: &str, id: DocId) -> AppResult<Option<Document>>;
    async fn list(&self, collection: &str) -> AppResult<Vec<Document>>;
    async fn find_by_owner(&self, collection: &str, owner: i64) -> AppResult<Vec<Document>>;
    /// Batched `$in`-style lookup by the indexed owner column.
    async fn find_by_owners(&self, collection: &str, owners: &[i64]) -> AppResult<Vec<Document>>;
    async fn find_by_parent(&self, collection: &str, parent: i64) -> AppResult<Vec<Document>>;
    /// Replace a document body. Fails with `NotFound` if the document is
    /// missing; bumps the version counter.
    async fn update(&self, collection: &str, id: DocId, data: Value) -> AppResult<()>;
    async fn delete(&self, collection: &str, id: DocId) -> AppResult<bool>;
    async fn delete_by_owner(&self, collection: &str, owner: i64) -> AppResult<u64>;

    // Transactional variants for multi-document units
    async fn get_tx(
        &self,
        tx: &mut StoreTransaction,
        collection: &str,
        id: DocId,
    ) -> AppResult<Option<Document>>;
    async fn insert_tx(
        &self,
        tx: &mut StoreTransaction,
        collection: &str,
        doc: NewDocument,
    ) -> AppResult<Document>;
    async fn update_tx(
        &self,
        tx: &mut StoreTransaction,
        collection: &str,
        id: DocId,
        data: Value,
    ) -> AppResult<()>;
}
