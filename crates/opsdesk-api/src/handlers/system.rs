//! Liveness, system status, and the catch-all for unknown routes.
//!
//! Both probes answer `200` even when the database is unreachable: the
//! failed component is reported in the body and every other component is
//! still listed.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::extract::AuthUser;
use crate::handlers::ADMINS;
use crate::state::AppState;

/// Result of probing one dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// The probe succeeded.
    Healthy,
    /// The probe failed.
    Unhealthy,
}

/// `GET /api/health` body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    /// Always `ok` while the process serves requests.
    pub status: &'static str,
    /// Database probe result.
    pub database: ComponentStatus,
    /// Time of the probe.
    pub timestamp: DateTime<Utc>,
}

/// `GET /api/system/status` body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    /// The API process itself.
    pub api: ApiStatus,
    /// The document store.
    pub database: DatabaseStatus,
    /// Time of the probe.
    pub timestamp: DateTime<Utc>,
}

/// API section of [`SystemStatus`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStatus {
    /// Always healthy while the process serves requests.
    pub status: ComponentStatus,
    /// Crate version.
    pub version: &'static str,
    /// When the process started serving.
    pub started_at: DateTime<Utc>,
    /// Seconds since `started_at`.
    pub uptime_seconds: i64,
}

/// Database section of [`SystemStatus`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStatus {
    /// Backend name (`memory` or `postgres`).
    pub backend: &'static str,
    /// Probe result.
    pub status: ComponentStatus,
    /// Probe error, when it failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Probe the store, reporting a failure instead of propagating it.
async fn probe_database(state: &AppState) -> DatabaseStatus {
    let backend = state.store.backend_name();
    match state.store.ping().await {
        Ok(()) => DatabaseStatus {
            backend,
            status: ComponentStatus::Healthy,
            error: None,
        },
        Err(e) => {
            tracing::warn!(backend, error = %e, "Database health probe failed");
            DatabaseStatus {
                backend,
                status: ComponentStatus::Unhealthy,
                error: Some(e.to_string()),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------------------

/// Public liveness probe.
pub async fn health(State(state): State<Arc<AppState>>) -> Envelope<Health> {
    let database = probe_database(&state).await;
    Envelope::data(Health {
        status: "ok",
        database: database.status,
        timestamp: Utc::now(),
    })
}

// ---------------------------------------------------------------------------
// GET /api/system/status
// ---------------------------------------------------------------------------

/// Component status report. Admins only.
pub async fn system_status(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Envelope<SystemStatus>, ApiError> {
    auth.require_role(ADMINS)?;

    let now = Utc::now();
    let database = probe_database(&state).await;
    Ok(Envelope::data(SystemStatus {
        api: ApiStatus {
            status: ComponentStatus::Healthy,
            version: env!("CARGO_PKG_VERSION"),
            started_at: state.started_at,
            uptime_seconds: now.signed_duration_since(state.started_at).num_seconds(),
        },
        database,
        timestamp: now,
    }))
}

// ---------------------------------------------------------------------------
// Fallback
// ---------------------------------------------------------------------------

/// `404` envelope for routes that do not exist.
pub async fn not_found(uri: Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": format!("Route {} not found", uri.path()),
        })),
    )
        .into_response()
}
