//! Error types for the server binary.
//!
//! [`AppError`] is the top-level error type that wraps all possible
//! failure modes during startup and while serving.

/// Top-level error for the server binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: opsdesk_core::ConfigError,
    },

    /// Connecting to or migrating the document store failed.
    #[error("database error: {source}")]
    Database {
        /// The underlying store error.
        #[from]
        source: opsdesk_db::DbError,
    },

    /// Password hashing or token setup failed.
    #[error("auth error: {source}")]
    Auth {
        /// The underlying auth error.
        #[from]
        source: opsdesk_core::AuthError,
    },

    /// The HTTP listener failed.
    #[error("api error: {source}")]
    Api {
        /// The underlying server error.
        #[from]
        source: opsdesk_api::ServerError,
    },
}
