//! Project endpoints, including the per-project statistics report.

use std::sync::Arc;

use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use opsdesk_core::access::can_manage_project;
use opsdesk_core::analytics::{completion_rate, StatusBreakdown};
use opsdesk_core::lifecycle::completion_stamp;
use opsdesk_core::PageRequest;
use opsdesk_db::{CompareOp, Filter, GroupCount, Scalar, ScalarKind};
use opsdesk_types::{
    ActivityAction, Customer, CustomerId, EntityType, Milestone, MilestoneStatus, Priority,
    Project, ProjectId, ProjectStatus, Task, TaskStatus, User, UserId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::activity::{self, Entry};
use crate::envelope::{Created, Envelope};
use crate::error::ApiError;
use crate::extract::{ApiQuery, AuthUser, ValidatedJson};
use crate::handlers::{
    clean, ensure_exists, find_page, load, parse_id, parse_sort, ADMINS, MANAGERS,
};
use crate::state::AppState;

const SORT_FIELDS: &[(&str, ScalarKind)] = &[
    ("createdAt", ScalarKind::Timestamp),
    ("name", ScalarKind::Text),
    ("startDate", ScalarKind::Timestamp),
    ("endDate", ScalarKind::Timestamp),
    ("progress", ScalarKind::Integer),
    ("budget", ScalarKind::Decimal),
];

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/projects`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectsQuery {
    /// Filter by status.
    pub status: Option<ProjectStatus>,
    /// Filter by priority.
    pub priority: Option<Priority>,
    /// Filter by manager.
    pub manager: Option<UserId>,
    /// Filter by customer.
    pub customer: Option<CustomerId>,
    /// Projects the user is a team member of.
    pub member: Option<UserId>,
    /// Substring of name or description.
    pub search: Option<String>,
    /// Sort field, `-` prefix for descending.
    pub sort: Option<String>,
    /// Page number.
    pub page: Option<u64>,
    /// Page size.
    pub limit: Option<u64>,
}

/// Body of `POST /api/projects`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    /// Project name.
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "Please add a project name"))]
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Status, `planning` when absent.
    pub status: Option<ProjectStatus>,
    /// Priority, `medium` when absent.
    pub priority: Option<Priority>,
    /// Manager, the caller when absent.
    pub manager: Option<UserId>,
    /// Team members.
    #[serde(default)]
    pub team_members: Vec<UserId>,
    /// Customer.
    pub customer: Option<CustomerId>,
    /// Planned start.
    pub start_date: Option<DateTime<Utc>>,
    /// Planned end.
    pub end_date: Option<DateTime<Utc>>,
    /// Budget.
    pub budget: Option<Decimal>,
    /// Completion percentage.
    #[validate(range(max = 100, message = "Progress must be between 0 and 100"))]
    pub progress: Option<u8>,
}

/// Body of `PUT /api/projects/:id`. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    /// Project name.
    #[validate(length(min = 1, max = 200, message = "Project name cannot be empty"))]
    pub name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Status.
    pub status: Option<ProjectStatus>,
    /// Priority.
    pub priority: Option<Priority>,
    /// Manager.
    pub manager: Option<UserId>,
    /// Team members (replaces the list).
    pub team_members: Option<Vec<UserId>>,
    /// Customer.
    pub customer: Option<CustomerId>,
    /// Planned start.
    pub start_date: Option<DateTime<Utc>>,
    /// Planned end.
    pub end_date: Option<DateTime<Utc>>,
    /// Budget.
    pub budget: Option<Decimal>,
    /// Completion percentage.
    #[validate(range(max = 100, message = "Progress must be between 0 and 100"))]
    pub progress: Option<u8>,
}

/// Report returned by `GET /api/projects/:id/stats`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    /// The project.
    pub project: ProjectId,
    /// Stored progress percentage.
    pub progress: u8,
    /// Share of the project's tasks that are completed.
    pub task_completion_rate: Decimal,
    /// Open tasks past their due date.
    pub overdue_tasks: u64,
    /// Task counts by status.
    pub tasks: StatusBreakdown,
    /// Milestone counts by status.
    pub milestones: StatusBreakdown,
}

async fn check_references(
    state: &AppState,
    manager: Option<UserId>,
    members: &[UserId],
    customer: Option<CustomerId>,
) -> Result<(), ApiError> {
    ensure_exists::<User, _>(&state.store, "User", manager).await?;
    for member in members {
        ensure_exists::<User, _>(&state.store, "User", Some(*member)).await?;
    }
    ensure_exists::<Customer, _>(&state.store, "Customer", customer).await
}

fn check_dates(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    budget: Option<Decimal>,
) -> Result<(), ApiError> {
    if matches!((start, end), (Some(start), Some(end)) if end < start) {
        return Err(ApiError::BadRequest(String::from(
            "End date cannot be before start date",
        )));
    }
    if budget.is_some_and(|b| b.is_sign_negative()) {
        return Err(ApiError::BadRequest(String::from("Budget cannot be negative")));
    }
    Ok(())
}

fn dedup(mut members: Vec<UserId>) -> Vec<UserId> {
    members.sort_unstable();
    members.dedup();
    members
}

fn breakdown(known: &[&str], counts: Vec<GroupCount>) -> StatusBreakdown {
    StatusBreakdown::from_counts(known, counts.into_iter().map(|g| (g.key, g.count)))
}

// ---------------------------------------------------------------------------
// GET /api/projects
// ---------------------------------------------------------------------------

/// List projects.
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    ApiQuery(query): ApiQuery<ProjectsQuery>,
) -> Result<Envelope<Vec<Project>>, ApiError> {
    let mut filter = Filter::new()
        .eq_opt("status", query.status)
        .eq_opt("priority", query.priority)
        .eq_opt("manager", query.manager)
        .eq_opt("customer", query.customer)
        .search(&["name", "description"], query.search.as_deref());
    if let Some(member) = query.member {
        filter = filter.array_contains("teamMembers", member);
    }
    let sort = parse_sort(query.sort.as_deref(), SORT_FIELDS)?;
    let page = PageRequest::new(query.page, query.limit, &state.pagination);

    find_page(&state.store, filter, sort, &page).await
}

// ---------------------------------------------------------------------------
// GET /api/projects/:id
// ---------------------------------------------------------------------------

/// Fetch one project.
pub async fn get_project(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Envelope<Project>, ApiError> {
    let id: ProjectId = parse_id("project", &id)?;
    Ok(Envelope::data(load(&state.store, "Project", id).await?))
}

// ---------------------------------------------------------------------------
// POST /api/projects
// ---------------------------------------------------------------------------

/// Create a project. Admins and managers only.
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(body): ValidatedJson<CreateProjectRequest>,
) -> Result<Created<Project>, ApiError> {
    auth.require_role(MANAGERS)?;
    check_dates(body.start_date, body.end_date, body.budget)?;
    let members = dedup(body.team_members);
    check_references(&state, body.manager, &members, body.customer).await?;

    let now = Utc::now();
    let status = body.status.unwrap_or(ProjectStatus::Planning);
    let project = Project {
        id: ProjectId::new(),
        name: body.name.trim().to_owned(),
        description: clean(body.description),
        status,
        priority: body.priority.unwrap_or(Priority::Medium),
        manager: body.manager.unwrap_or_else(|| auth.id()),
        team_members: members,
        customer: body.customer,
        start_date: body.start_date,
        end_date: body.end_date,
        budget: body.budget,
        progress: body.progress.unwrap_or(0),
        completed_at: completion_stamp(None, status == ProjectStatus::Completed, now),
        created_by: auth.id(),
        created_at: now,
        updated_at: now,
    };
    state.store.collection::<Project>().insert(&project).await?;

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::Create,
            EntityType::Project,
            project.id,
            format!("Created project \"{}\"", project.name),
        ),
    )
    .await?;

    Ok(Envelope::data(project).created())
}

// ---------------------------------------------------------------------------
// PUT /api/projects/:id
// ---------------------------------------------------------------------------

/// Update a project. Admins and the project's manager only.
pub async fn update_project(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateProjectRequest>,
) -> Result<Envelope<Project>, ApiError> {
    let id: ProjectId = parse_id("project", &id)?;
    let mut project: Project = load(&state.store, "Project", id).await?;
    if !can_manage_project(&auth.actor(), &project) {
        return Err(ApiError::forbidden("update this project"));
    }

    let members = body.team_members.map(dedup);
    check_references(
        &state,
        body.manager,
        members.as_deref().unwrap_or_default(),
        body.customer,
    )
    .await?;

    let previous_status = project.status;
    if let Some(name) = body.name {
        project.name = name.trim().to_owned();
    }
    if body.description.is_some() {
        project.description = clean(body.description);
    }
    if let Some(status) = body.status {
        project.status = status;
    }
    if let Some(priority) = body.priority {
        project.priority = priority;
    }
    if let Some(manager) = body.manager {
        project.manager = manager;
    }
    if let Some(members) = members {
        project.team_members = members;
    }
    if body.customer.is_some() {
        project.customer = body.customer;
    }
    if body.start_date.is_some() {
        project.start_date = body.start_date;
    }
    if body.end_date.is_some() {
        project.end_date = body.end_date;
    }
    if body.budget.is_some() {
        project.budget = body.budget;
    }
    if let Some(progress) = body.progress {
        project.progress = progress;
    }
    check_dates(project.start_date, project.end_date, project.budget)?;

    let now = Utc::now();
    project.completed_at = completion_stamp(
        project.completed_at,
        project.status == ProjectStatus::Completed,
        now,
    );
    project.updated_at = now;
    state.store.collection::<Project>().replace(&project).await?;

    let entry = if project.status == previous_status {
        Entry::new(
            auth.id(),
            ActivityAction::Update,
            EntityType::Project,
            id,
            format!("Updated project \"{}\"", project.name),
        )
    } else {
        Entry::new(
            auth.id(),
            ActivityAction::StatusChange,
            EntityType::Project,
            id,
            format!(
                "Project \"{}\" moved from {previous_status} to {}",
                project.name, project.status
            ),
        )
        .metadata(json!({ "from": previous_status, "to": project.status }))
    };
    activity::record(&state.store, entry).await?;

    Ok(Envelope::data(project))
}

// ---------------------------------------------------------------------------
// DELETE /api/projects/:id
// ---------------------------------------------------------------------------

/// Delete a project that no task or milestone references. Admins only.
pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Envelope<()>, ApiError> {
    auth.require_role(ADMINS)?;
    let id: ProjectId = parse_id("project", &id)?;
    let project: Project = load(&state.store, "Project", id).await?;

    let referenced = Filter::new().eq("project", id);
    let has_tasks = state.store.collection::<Task>().exists(&referenced).await?;
    let has_milestones = state
        .store
        .collection::<Milestone>()
        .exists(&referenced)
        .await?;
    if has_tasks || has_milestones {
        return Err(ApiError::BadRequest(String::from(
            "Cannot delete project with existing tasks or milestones",
        )));
    }

    state.store.collection::<Project>().delete(id).await?;

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::Delete,
            EntityType::Project,
            id,
            format!("Deleted project \"{}\"", project.name),
        ),
    )
    .await?;

    Ok(Envelope::message("Project deleted"))
}

// ---------------------------------------------------------------------------
// GET /api/projects/:id/stats
// ---------------------------------------------------------------------------

/// Task and milestone statistics for one project.
pub async fn project_stats(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Envelope<ProjectStats>, ApiError> {
    let id: ProjectId = parse_id("project", &id)?;
    let project: Project = load(&state.store, "Project", id).await?;

    let in_project = Filter::new().eq("project", id);
    let task_counts = state
        .store
        .collection::<Task>()
        .group_count(&in_project, "status")
        .await?;
    let milestone_counts = state
        .store
        .collection::<Milestone>()
        .group_count(&in_project, "status")
        .await?;
    let overdue = in_project
        .clone()
        .compare("dueDate", CompareOp::Lt, Scalar::Timestamp(Utc::now()))
        .not_in("status", [TaskStatus::Completed, TaskStatus::Cancelled]);
    let overdue_tasks = state.store.collection::<Task>().count(&overdue).await?;

    let task_statuses: Vec<&str> = TaskStatus::ALL.iter().map(|s| s.as_str()).collect();
    let milestone_statuses: Vec<&str> = MilestoneStatus::ALL.iter().map(|s| s.as_str()).collect();
    let tasks = breakdown(&task_statuses, task_counts);
    let milestones = breakdown(&milestone_statuses, milestone_counts);

    Ok(Envelope::data(ProjectStats {
        project: id,
        progress: project.progress,
        task_completion_rate: completion_rate(
            tasks.get(TaskStatus::Completed.as_str()),
            tasks.total,
        ),
        overdue_tasks,
        tasks,
        milestones,
    }))
}
