//! Document store for the Opsdesk backend.
//!
//! Every entity is persisted as a JSON document in a named collection. Two
//! interchangeable backends implement the same query model:
//!
//! ```text
//! Handlers
//!     |
//!     +-- Collection<T> (typed) --> DocumentStore
//!                                      |-- Memory   (MemoryStore, tests / local dev)
//!                                      +-- Postgres (PostgresStore, `documents` JSONB table)
//! ```
//!
//! # Modules
//!
//! - [`query`] -- Filters, sorts, and pagination shared by both backends
//! - [`memory`] -- In-process backend
//! - [`postgres`] -- `PostgreSQL` connection pool, migrations, and SQL compilation
//! - [`store`] -- Backend dispatch
//! - [`collection`] -- The [`Document`] trait and typed collections
//! - [`error`] -- Shared error types

pub mod collection;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

// Re-export primary types for convenience.
pub use collection::{Collection, Document};
pub use error::DbError;
pub use memory::MemoryStore;
pub use postgres::{PostgresConfig, PostgresStore};
pub use query::{
    CompareOp, Condition, Direction, Filter, FindOptions, GroupCount, Scalar, ScalarKind, Sort,
};
pub use store::DocumentStore;
