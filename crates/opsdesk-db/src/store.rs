//! Backend selection for the document store.

use serde_json::Value;
use uuid::Uuid;

use crate::collection::{Collection, Document};
use crate::error::DbError;
use crate::memory::MemoryStore;
use crate::postgres::PostgresStore;
use crate::query::{Filter, FindOptions, GroupCount};

/// The document store used by the API, dispatching to one backend.
#[derive(Debug, Clone)]
pub enum DocumentStore {
    /// In-process store.
    Memory(MemoryStore),
    /// `PostgreSQL`-backed store.
    Postgres(PostgresStore),
}

impl DocumentStore {
    /// A fresh, empty in-memory store.
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    /// Typed access to the collection holding `T`.
    pub const fn collection<T: Document>(&self) -> Collection<'_, T> {
        Collection::new(self)
    }

    /// Name of the active backend, as reported by status endpoints.
    pub const fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Postgres(_) => "postgres",
        }
    }

    /// Check that the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the database cannot be reached.
    pub async fn ping(&self) -> Result<(), DbError> {
        match self {
            Self::Memory(_) => Ok(()),
            Self::Postgres(pg) => pg.ping().await,
        }
    }

    /// Close backend connections, if any.
    pub async fn close(&self) {
        if let Self::Postgres(pg) = self {
            pg.close().await;
        }
    }

    /// Insert a raw document.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Duplicate`] if the id exists, or a backend error.
    pub async fn insert(&self, collection: &str, id: Uuid, body: Value) -> Result<(), DbError> {
        match self {
            Self::Memory(m) => m.insert(collection, id, body).await,
            Self::Postgres(pg) => pg.insert(collection, id, body).await,
        }
    }

    /// Fetch a raw document by id.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    pub async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Value>, DbError> {
        match self {
            Self::Memory(m) => Ok(m.get(collection, id).await),
            Self::Postgres(pg) => pg.get(collection, id).await,
        }
    }

    /// Replace a raw document. Returns `false` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    pub async fn replace(&self, collection: &str, id: Uuid, body: Value) -> Result<bool, DbError> {
        match self {
            Self::Memory(m) => Ok(m.replace(collection, id, body).await),
            Self::Postgres(pg) => pg.replace(collection, id, body).await,
        }
    }

    /// Delete a raw document. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    pub async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, DbError> {
        match self {
            Self::Memory(m) => Ok(m.delete(collection, id).await),
            Self::Postgres(pg) => pg.delete(collection, id).await,
        }
    }

    /// Find raw documents.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    pub async fn find(
        &self,
        collection: &str,
        options: &FindOptions,
    ) -> Result<Vec<Value>, DbError> {
        match self {
            Self::Memory(m) => Ok(m.find(collection, options).await),
            Self::Postgres(pg) => pg.find(collection, options).await,
        }
    }

    /// Count raw documents.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    pub async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, DbError> {
        match self {
            Self::Memory(m) => Ok(m.count(collection, filter).await),
            Self::Postgres(pg) => pg.count(collection, filter).await,
        }
    }

    /// Grouped count of raw documents.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    pub async fn group_count(
        &self,
        collection: &str,
        filter: &Filter,
        field: &str,
    ) -> Result<Vec<GroupCount>, DbError> {
        match self {
            Self::Memory(m) => Ok(m.group_count(collection, filter, field).await),
            Self::Postgres(pg) => pg.group_count(collection, filter, field).await,
        }
    }
}

impl From<MemoryStore> for DocumentStore {
    fn from(store: MemoryStore) -> Self {
        Self::Memory(store)
    }
}

impl From<PostgresStore> for DocumentStore {
    fn from(store: PostgresStore) -> Self {
        Self::Postgres(store)
    }
}
