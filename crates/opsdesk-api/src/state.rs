//! Shared application state for the API server.
//!
//! [`AppState`] is wrapped in an `Arc` and handed to every handler through
//! Axum's `State` extractor. It owns the document store handle and the
//! credential machinery; nothing in it is mutated after startup.

use chrono::{DateTime, Utc};
use opsdesk_core::config::{AppConfig, PaginationConfig};
use opsdesk_core::{AuthError, PasswordHasher, TokenIssuer};
use opsdesk_db::DocumentStore;

/// Shared state for all API handlers.
#[derive(Debug)]
pub struct AppState {
    /// Document store (in-memory or `PostgreSQL`).
    pub store: DocumentStore,
    /// Bearer token issuer and verifier.
    pub tokens: TokenIssuer,
    /// Password hasher.
    pub passwords: PasswordHasher,
    /// Paging limits for list endpoints.
    pub pagination: PaginationConfig,
    /// When the process started serving.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Assemble state from its parts.
    pub fn new(
        store: DocumentStore,
        tokens: TokenIssuer,
        passwords: PasswordHasher,
        pagination: PaginationConfig,
    ) -> Self {
        Self {
            store,
            tokens,
            passwords,
            pagination,
            started_at: Utc::now(),
        }
    }

    /// Build state for `store` from the loaded configuration.
    pub fn from_config(store: DocumentStore, config: &AppConfig) -> Result<Self, AuthError> {
        Ok(Self::new(
            store,
            TokenIssuer::from_config(&config.auth),
            PasswordHasher::from_config(&config.auth)?,
            config.pagination,
        ))
    }
}
