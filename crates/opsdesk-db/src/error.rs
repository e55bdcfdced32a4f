//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`sqlx`] and [`serde_json`] errors with additional context about which
//! operation failed.

use uuid::Uuid;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A document could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A document with the same id already exists in the collection.
    #[error("Duplicate document {id} in collection {collection}")]
    Duplicate {
        /// Collection name.
        collection: String,
        /// Conflicting document id.
        id: Uuid,
    },

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
