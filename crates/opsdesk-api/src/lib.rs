//! REST API for the Opsdesk business operations backend.
//!
//! This crate provides an Axum HTTP server exposing every resource under
//! `/api`:
//!
//! - **Auth** -- registration, login, profile and password changes
//! - **Work** -- tasks, projects (with statistics), milestones
//! - **Relationships** -- customers and suppliers
//! - **Stock** -- inventory items, stock adjustments, inventory alerts
//! - **Logistics** -- shipments and purchase orders
//! - **Reporting** -- activity log and analytics
//! - **System** -- public health probe and admin status report
//!
//! # Responses
//!
//! Every response body is an [`Envelope`]:
//! `{success, data?, count?, total?, pagination?, message?}`. Errors are
//! rendered by [`ApiError`] as `{success: false, message, errors?}` with
//! the matching status code.
//!
//! # Side effects
//!
//! Mutating handlers append an `Activity` through [`activity::record`];
//! stock writes may raise inventory alerts.

pub mod activity;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use envelope::Envelope;
pub use error::ApiError;
pub use router::build_router;
pub use server::{shutdown_signal, start_server, ServerConfig, ServerError};
pub use state::AppState;
