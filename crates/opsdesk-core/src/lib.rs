//! Business rules for the Opsdesk backend.
//!
//! Everything here is synchronous and free of I/O: the API layer loads
//! documents, asks these modules what should happen, and writes the result.
//!
//! # Modules
//!
//! - [`config`] -- Layered configuration (YAML file, environment)
//! - [`auth`] -- Argon2id password hashing and HS256 bearer tokens
//! - [`pagination`] -- Page normalization and `totalPages`
//! - [`inventory`] -- Stock adjustments and the reorder-point alert rule
//! - [`lifecycle`] -- Completion and milestone timestamps
//! - [`access`] -- Ownership rules for tasks and projects
//! - [`graph`] -- Milestone dependency cycle detection
//! - [`analytics`] -- Report reshaping and valuation
//! - [`numbering`] -- Purchase order and tracking numbers

pub mod access;
pub mod analytics;
pub mod auth;
pub mod config;
pub mod graph;
pub mod inventory;
pub mod lifecycle;
pub mod numbering;
pub mod pagination;

pub use access::Actor;
pub use auth::{AuthError, Claims, PasswordHasher, TokenIssuer};
pub use config::{AppConfig, ConfigError, DatabaseBackend};
pub use graph::GraphError;
pub use inventory::StockError;
pub use pagination::{PageRequest, Pagination};
