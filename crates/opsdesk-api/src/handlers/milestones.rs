//! Project milestone endpoints.
//!
//! A milestone may depend on other milestones of the same project. The
//! dependency lists form a directed graph that must stay acyclic, and a
//! milestone other milestones depend on cannot be deleted.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use opsdesk_core::graph::validate_dependencies;
use opsdesk_core::lifecycle::completion_stamp;
use opsdesk_core::PageRequest;
use opsdesk_db::{Filter, ScalarKind};
use opsdesk_types::{
    ActivityAction, EntityType, Milestone, MilestoneId, MilestoneStatus, Project, ProjectId,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::activity::{self, Entry};
use crate::envelope::{Created, Envelope};
use crate::error::ApiError;
use crate::extract::{ApiQuery, AuthUser, ValidatedJson};
use crate::handlers::{clean, find_page, load, parse_id, parse_sort, MANAGERS};
use crate::state::AppState;

const SORT_FIELDS: &[(&str, ScalarKind)] = &[
    ("createdAt", ScalarKind::Timestamp),
    ("dueDate", ScalarKind::Timestamp),
    ("title", ScalarKind::Text),
    ("status", ScalarKind::Text),
];

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/milestones`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestonesQuery {
    /// Filter by project.
    pub project: Option<ProjectId>,
    /// Filter by status.
    pub status: Option<MilestoneStatus>,
    /// Sort field, `-` prefix for descending.
    pub sort: Option<String>,
    /// Page number.
    pub page: Option<u64>,
    /// Page size.
    pub limit: Option<u64>,
}

/// Body of `POST /api/milestones`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMilestoneRequest {
    /// Owning project.
    pub project: ProjectId,
    /// Title.
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "Please add a title"))]
    pub title: String,
    /// Description.
    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,
    /// Due date.
    pub due_date: Option<DateTime<Utc>>,
    /// Status, `pending` when absent.
    pub status: Option<MilestoneStatus>,
    /// Milestones of the same project that must be reached first.
    #[serde(default)]
    pub dependencies: Vec<MilestoneId>,
}

/// Body of `PUT /api/milestones/:id`. Absent fields are left unchanged; the
/// owning project cannot be changed.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMilestoneRequest {
    /// Title.
    #[validate(length(min = 1, max = 200, message = "Title cannot be empty"))]
    pub title: Option<String>,
    /// Description.
    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,
    /// Due date.
    pub due_date: Option<DateTime<Utc>>,
    /// Status.
    pub status: Option<MilestoneStatus>,
    /// Dependencies (replaces the list).
    pub dependencies: Option<Vec<MilestoneId>>,
}

/// Drop repeated ids, keeping first occurrences in order.
fn dedup(ids: Vec<MilestoneId>) -> Vec<MilestoneId> {
    let mut unique = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    unique
}

/// Check that every dependency is a milestone of `project` and that the
/// graph stays acyclic once `milestone` depends on them.
async fn check_dependencies(
    state: &AppState,
    project: ProjectId,
    milestone: MilestoneId,
    dependencies: &[MilestoneId],
) -> Result<(), ApiError> {
    if dependencies.is_empty() {
        return Ok(());
    }

    let siblings = state
        .store
        .collection::<Milestone>()
        .find_all(Filter::new().eq("project", project))
        .await?;
    let edges: BTreeMap<MilestoneId, Vec<MilestoneId>> = siblings
        .into_iter()
        .filter(|m| m.id != milestone)
        .map(|m| (m.id, m.dependencies))
        .collect();

    if let Some(stranger) = dependencies
        .iter()
        .find(|dep| **dep != milestone && !edges.contains_key(*dep))
    {
        return Err(ApiError::BadRequest(format!(
            "Dependency {stranger} is not a milestone of this project"
        )));
    }

    validate_dependencies(milestone, dependencies, &edges)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// GET /api/milestones
// ---------------------------------------------------------------------------

/// List milestones.
pub async fn list_milestones(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    ApiQuery(query): ApiQuery<MilestonesQuery>,
) -> Result<Envelope<Vec<Milestone>>, ApiError> {
    let filter = Filter::new()
        .eq_opt("project", query.project)
        .eq_opt("status", query.status);
    let sort = parse_sort(query.sort.as_deref(), SORT_FIELDS)?;
    let page = PageRequest::new(query.page, query.limit, &state.pagination);

    find_page(&state.store, filter, sort, &page).await
}

// ---------------------------------------------------------------------------
// GET /api/milestones/:id
// ---------------------------------------------------------------------------

/// Fetch one milestone.
pub async fn get_milestone(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Envelope<Milestone>, ApiError> {
    let id: MilestoneId = parse_id("milestone", &id)?;
    Ok(Envelope::data(load(&state.store, "Milestone", id).await?))
}

// ---------------------------------------------------------------------------
// POST /api/milestones
// ---------------------------------------------------------------------------

/// Create a milestone in an existing project.
pub async fn create_milestone(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(body): ValidatedJson<CreateMilestoneRequest>,
) -> Result<Created<Milestone>, ApiError> {
    let project: Project = load(&state.store, "Project", body.project).await?;

    let id = MilestoneId::new();
    let dependencies = dedup(body.dependencies);
    check_dependencies(&state, project.id, id, &dependencies).await?;

    let now = Utc::now();
    let status = body.status.unwrap_or(MilestoneStatus::Pending);
    let milestone = Milestone {
        id,
        project: project.id,
        title: body.title.trim().to_owned(),
        description: clean(body.description),
        due_date: body.due_date,
        status,
        dependencies,
        completed_at: completion_stamp(None, status == MilestoneStatus::Completed, now),
        created_by: auth.id(),
        created_at: now,
        updated_at: now,
    };
    state
        .store
        .collection::<Milestone>()
        .insert(&milestone)
        .await?;

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::Create,
            EntityType::Milestone,
            milestone.id,
            format!(
                "Created milestone \"{}\" in project \"{}\"",
                milestone.title, project.name
            ),
        ),
    )
    .await?;

    Ok(Envelope::data(milestone).created())
}

// ---------------------------------------------------------------------------
// PUT /api/milestones/:id
// ---------------------------------------------------------------------------

/// Update a milestone.
pub async fn update_milestone(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateMilestoneRequest>,
) -> Result<Envelope<Milestone>, ApiError> {
    let id: MilestoneId = parse_id("milestone", &id)?;
    let mut milestone: Milestone = load(&state.store, "Milestone", id).await?;

    if let Some(dependencies) = body.dependencies.map(dedup) {
        check_dependencies(&state, milestone.project, id, &dependencies).await?;
        milestone.dependencies = dependencies;
    }

    let previous_status = milestone.status;
    if let Some(title) = body.title {
        milestone.title = title.trim().to_owned();
    }
    if body.description.is_some() {
        milestone.description = clean(body.description);
    }
    if body.due_date.is_some() {
        milestone.due_date = body.due_date;
    }
    if let Some(status) = body.status {
        milestone.status = status;
    }

    let now = Utc::now();
    milestone.completed_at = completion_stamp(
        milestone.completed_at,
        milestone.status == MilestoneStatus::Completed,
        now,
    );
    milestone.updated_at = now;
    state
        .store
        .collection::<Milestone>()
        .replace(&milestone)
        .await?;

    let entry = if milestone.status == previous_status {
        Entry::new(
            auth.id(),
            ActivityAction::Update,
            EntityType::Milestone,
            id,
            format!("Updated milestone \"{}\"", milestone.title),
        )
    } else {
        Entry::new(
            auth.id(),
            ActivityAction::StatusChange,
            EntityType::Milestone,
            id,
            format!(
                "Milestone \"{}\" moved from {previous_status} to {}",
                milestone.title, milestone.status
            ),
        )
        .metadata(json!({ "from": previous_status, "to": milestone.status }))
    };
    activity::record(&state.store, entry).await?;

    Ok(Envelope::data(milestone))
}

// ---------------------------------------------------------------------------
// DELETE /api/milestones/:id
// ---------------------------------------------------------------------------

/// Delete a milestone nothing depends on. Admins and managers only.
pub async fn delete_milestone(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Envelope<()>, ApiError> {
    auth.require_role(MANAGERS)?;
    let id: MilestoneId = parse_id("milestone", &id)?;
    let milestone: Milestone = load(&state.store, "Milestone", id).await?;

    let dependents = Filter::new().array_contains("dependencies", id);
    if state
        .store
        .collection::<Milestone>()
        .exists(&dependents)
        .await?
    {
        return Err(ApiError::BadRequest(String::from(
            "Cannot delete milestone: other milestones depend on it",
        )));
    }

    state.store.collection::<Milestone>().delete(id).await?;

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::Delete,
            EntityType::Milestone,
            id,
            format!("Deleted milestone \"{}\"", milestone.title),
        ),
    )
    .await?;

    Ok(Envelope::message("Milestone deleted"))
}
