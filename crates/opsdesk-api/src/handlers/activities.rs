//! Activity log endpoint.

use std::sync::Arc;

use axum::extract::State;
use opsdesk_core::PageRequest;
use opsdesk_db::{Filter, ScalarKind};
use opsdesk_types::{Activity, ActivityAction, EntityType, UserId};
use serde::Deserialize;
use uuid::Uuid;

use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::extract::{ApiQuery, AuthUser};
use crate::handlers::{find_page, parse_sort};
use crate::state::AppState;

const SORT_FIELDS: &[(&str, ScalarKind)] = &[("createdAt", ScalarKind::Timestamp)];

/// Query parameters for `GET /api/activities`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitiesQuery {
    /// Filter by acting user. Ignored for employees, who only see their own.
    pub user: Option<UserId>,
    /// Filter by kind of document.
    pub entity_type: Option<EntityType>,
    /// Filter by document id.
    pub entity_id: Option<Uuid>,
    /// Filter by action.
    pub action: Option<ActivityAction>,
    /// Sort field, `-` prefix for descending.
    pub sort: Option<String>,
    /// Page number.
    pub page: Option<u64>,
    /// Page size.
    pub limit: Option<u64>,
}

// ---------------------------------------------------------------------------
// GET /api/activities
// ---------------------------------------------------------------------------

/// List activities, newest first. Admins and managers see every user's
/// activity; everyone else sees only their own.
pub async fn list_activities(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<ActivitiesQuery>,
) -> Result<Envelope<Vec<Activity>>, ApiError> {
    let user = if auth.actor().sees_everything() {
        query.user
    } else {
        Some(auth.id())
    };
    let filter = Filter::new()
        .eq_opt("user", user)
        .eq_opt("entityType", query.entity_type)
        .eq_opt("entityId", query.entity_id)
        .eq_opt("action", query.action);
    let sort = parse_sort(query.sort.as_deref(), SORT_FIELDS)?;
    let page = PageRequest::new(query.page, query.limit, &state.pagination);

    find_page(&state.store, filter, sort, &page).await
}
