//! Task endpoints.
//!
//! Any authenticated user can list, read, and create tasks. Updates are
//! limited to admins, the creator, and the assignee; deletes to admins and
//! the creator.

use std::sync::Arc;

use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use opsdesk_core::access::{can_delete_task, can_update_task};
use opsdesk_core::lifecycle::completion_stamp;
use opsdesk_core::PageRequest;
use opsdesk_db::{CompareOp, Filter, Scalar, ScalarKind};
use opsdesk_types::{
    ActivityAction, EntityType, Priority, Project, ProjectId, Task, TaskId, TaskStatus, User,
    UserId,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::activity::{self, Entry};
use crate::envelope::{Created, Envelope};
use crate::error::ApiError;
use crate::extract::{ApiQuery, AuthUser, ValidatedJson};
use crate::handlers::{clean, ensure_exists, find_page, load, parse_id, parse_sort};
use crate::state::AppState;

const SORT_FIELDS: &[(&str, ScalarKind)] = &[
    ("createdAt", ScalarKind::Timestamp),
    ("updatedAt", ScalarKind::Timestamp),
    ("dueDate", ScalarKind::Timestamp),
    ("title", ScalarKind::Text),
    ("status", ScalarKind::Text),
];

/// Statuses that end a task's work.
const CLOSED: &[TaskStatus] = &[TaskStatus::Completed, TaskStatus::Cancelled];

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/tasks`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TasksQuery {
    /// Filter by status.
    pub status: Option<TaskStatus>,
    /// Filter by priority.
    pub priority: Option<Priority>,
    /// Filter by assignee.
    pub assigned_to: Option<UserId>,
    /// Filter by project.
    pub project: Option<ProjectId>,
    /// Substring of title or description.
    pub search: Option<String>,
    /// Only open tasks past their due date.
    pub overdue: Option<bool>,
    /// Sort field, `-` prefix for descending.
    pub sort: Option<String>,
    /// Page number.
    pub page: Option<u64>,
    /// Page size.
    pub limit: Option<u64>,
}

/// Body of `POST /api/tasks`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    /// Title.
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "Please add a title"))]
    pub title: String,
    /// Description.
    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,
    /// Status, `todo` when absent.
    pub status: Option<TaskStatus>,
    /// Priority, `medium` when absent.
    pub priority: Option<Priority>,
    /// Owning project.
    pub project: Option<ProjectId>,
    /// Assignee.
    pub assigned_to: Option<UserId>,
    /// Due date.
    pub due_date: Option<DateTime<Utc>>,
    /// Estimated hours.
    pub estimated_hours: Option<Decimal>,
    /// Labels.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Body of `PUT /api/tasks/:id`. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    /// Title.
    #[validate(length(min = 1, max = 200, message = "Title cannot be empty"))]
    pub title: Option<String>,
    /// Description.
    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,
    /// Status.
    pub status: Option<TaskStatus>,
    /// Priority.
    pub priority: Option<Priority>,
    /// Owning project.
    pub project: Option<ProjectId>,
    /// Assignee.
    pub assigned_to: Option<UserId>,
    /// Due date.
    pub due_date: Option<DateTime<Utc>>,
    /// Estimated hours.
    pub estimated_hours: Option<Decimal>,
    /// Labels (replaces the list).
    pub tags: Option<Vec<String>>,
}

fn check_hours(hours: Option<Decimal>) -> Result<(), ApiError> {
    if hours.is_some_and(|h| h.is_sign_negative()) {
        return Err(ApiError::BadRequest(String::from(
            "Estimated hours cannot be negative",
        )));
    }
    Ok(())
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter().filter_map(|t| clean(Some(t))).collect()
}

// ---------------------------------------------------------------------------
// GET /api/tasks
// ---------------------------------------------------------------------------

/// List tasks.
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    ApiQuery(query): ApiQuery<TasksQuery>,
) -> Result<Envelope<Vec<Task>>, ApiError> {
    let mut filter = Filter::new()
        .eq_opt("status", query.status)
        .eq_opt("priority", query.priority)
        .eq_opt("assignedTo", query.assigned_to)
        .eq_opt("project", query.project)
        .search(&["title", "description"], query.search.as_deref());
    if query.overdue == Some(true) {
        filter = filter
            .compare("dueDate", CompareOp::Lt, Scalar::Timestamp(Utc::now()))
            .not_in("status", CLOSED.iter().copied());
    }
    let sort = parse_sort(query.sort.as_deref(), SORT_FIELDS)?;
    let page = PageRequest::new(query.page, query.limit, &state.pagination);

    find_page(&state.store, filter, sort, &page).await
}

// ---------------------------------------------------------------------------
// GET /api/tasks/:id
// ---------------------------------------------------------------------------

/// Fetch one task.
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Envelope<Task>, ApiError> {
    let id: TaskId = parse_id("task", &id)?;
    Ok(Envelope::data(load(&state.store, "Task", id).await?))
}

// ---------------------------------------------------------------------------
// POST /api/tasks
// ---------------------------------------------------------------------------

/// Create a task owned by the caller.
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(body): ValidatedJson<CreateTaskRequest>,
) -> Result<Created<Task>, ApiError> {
    check_hours(body.estimated_hours)?;
    ensure_exists::<User, _>(&state.store, "User", body.assigned_to).await?;
    ensure_exists::<Project, _>(&state.store, "Project", body.project).await?;

    let now = Utc::now();
    let status = body.status.unwrap_or(TaskStatus::Todo);
    let task = Task {
        id: TaskId::new(),
        title: body.title.trim().to_owned(),
        description: clean(body.description),
        status,
        priority: body.priority.unwrap_or(Priority::Medium),
        project: body.project,
        assigned_to: body.assigned_to,
        created_by: auth.id(),
        due_date: body.due_date,
        completed_at: completion_stamp(None, status == TaskStatus::Completed, now),
        estimated_hours: body.estimated_hours,
        tags: clean_tags(body.tags),
        created_at: now,
        updated_at: now,
    };
    state.store.collection::<Task>().insert(&task).await?;

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::Create,
            EntityType::Task,
            task.id,
            format!("Created task \"{}\"", task.title),
        ),
    )
    .await?;

    Ok(Envelope::data(task).created())
}

// ---------------------------------------------------------------------------
// PUT /api/tasks/:id
// ---------------------------------------------------------------------------

/// Update a task.
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateTaskRequest>,
) -> Result<Envelope<Task>, ApiError> {
    let id: TaskId = parse_id("task", &id)?;
    let mut task: Task = load(&state.store, "Task", id).await?;
    if !can_update_task(&auth.actor(), &task) {
        return Err(ApiError::forbidden("update this task"));
    }

    check_hours(body.estimated_hours)?;
    ensure_exists::<User, _>(&state.store, "User", body.assigned_to).await?;
    ensure_exists::<Project, _>(&state.store, "Project", body.project).await?;

    let previous_status = task.status;
    if let Some(title) = body.title {
        task.title = title.trim().to_owned();
    }
    if body.description.is_some() {
        task.description = clean(body.description);
    }
    if let Some(status) = body.status {
        task.status = status;
    }
    if let Some(priority) = body.priority {
        task.priority = priority;
    }
    if body.project.is_some() {
        task.project = body.project;
    }
    if body.assigned_to.is_some() {
        task.assigned_to = body.assigned_to;
    }
    if body.due_date.is_some() {
        task.due_date = body.due_date;
    }
    if body.estimated_hours.is_some() {
        task.estimated_hours = body.estimated_hours;
    }
    if let Some(tags) = body.tags {
        task.tags = clean_tags(tags);
    }

    let now = Utc::now();
    task.completed_at = completion_stamp(
        task.completed_at,
        task.status == TaskStatus::Completed,
        now,
    );
    task.updated_at = now;
    state.store.collection::<Task>().replace(&task).await?;

    let entry = if task.status == previous_status {
        Entry::new(
            auth.id(),
            ActivityAction::Update,
            EntityType::Task,
            id,
            format!("Updated task \"{}\"", task.title),
        )
    } else {
        Entry::new(
            auth.id(),
            ActivityAction::StatusChange,
            EntityType::Task,
            id,
            format!(
                "Task \"{}\" moved from {previous_status} to {}",
                task.title, task.status
            ),
        )
        .metadata(json!({ "from": previous_status, "to": task.status }))
    };
    activity::record(&state.store, entry).await?;

    Ok(Envelope::data(task))
}

// ---------------------------------------------------------------------------
// DELETE /api/tasks/:id
// ---------------------------------------------------------------------------

/// Delete a task.
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Envelope<()>, ApiError> {
    let id: TaskId = parse_id("task", &id)?;
    let task: Task = load(&state.store, "Task", id).await?;
    if !can_delete_task(&auth.actor(), &task) {
        return Err(ApiError::forbidden("delete this task"));
    }

    state.store.collection::<Task>().delete(id).await?;

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::Delete,
            EntityType::Task,
            id,
            format!("Deleted task \"{}\"", task.title),
        ),
    )
    .await?;

    Ok(Envelope::message("Task deleted"))
}
