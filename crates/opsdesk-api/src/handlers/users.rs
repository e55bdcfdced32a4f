//! User administration. Every route requires the `admin` role.

use std::sync::Arc;

use axum::extract::{Path, State};
use chrono::Utc;
use opsdesk_core::PageRequest;
use opsdesk_db::{Filter, ScalarKind};
use opsdesk_types::{ActivityAction, EntityType, Role, User, UserId, UserRecord};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::activity::{self, Entry};
use crate::envelope::{Created, Envelope};
use crate::error::ApiError;
use crate::extract::{ApiQuery, AuthUser, ValidatedJson};
use crate::handlers::auth::{ensure_email_free, normalize_email};
use crate::handlers::{clean, find_page, load, parse_id, parse_sort, ADMINS};
use crate::state::AppState;

const SORT_FIELDS: &[(&str, ScalarKind)] = &[
    ("createdAt", ScalarKind::Timestamp),
    ("name", ScalarKind::Text),
    ("email", ScalarKind::Text),
    ("lastLogin", ScalarKind::Timestamp),
];

/// Query parameters for `GET /api/users`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersQuery {
    /// Filter by role.
    pub role: Option<Role>,
    /// Filter by active flag.
    pub is_active: Option<bool>,
    /// Substring of name or email.
    pub search: Option<String>,
    /// Sort field, `-` prefix for descending.
    pub sort: Option<String>,
    /// Page number.
    pub page: Option<u64>,
    /// Page size.
    pub limit: Option<u64>,
}

/// Body of `POST /api/users`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    /// Display name.
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Please add a name"))]
    pub name: String,
    /// Login email.
    #[serde(default)]
    #[validate(email(message = "Please add a valid email"))]
    pub email: String,
    /// Initial password.
    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    /// Role, `employee` when absent.
    pub role: Option<Role>,
    /// Department.
    pub department: Option<String>,
    /// Active flag, `true` when absent.
    pub is_active: Option<bool>,
}

/// Body of `PUT /api/users/:id`. Passwords are changed by their owner only.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    /// Display name.
    #[validate(length(min = 1, max = 100, message = "Name cannot be empty"))]
    pub name: Option<String>,
    /// Login email.
    #[validate(email(message = "Please add a valid email"))]
    pub email: Option<String>,
    /// Role.
    pub role: Option<Role>,
    /// Department.
    pub department: Option<String>,
    /// Active flag.
    pub is_active: Option<bool>,
}

// ---------------------------------------------------------------------------
// GET /api/users
// ---------------------------------------------------------------------------

/// List users.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<UsersQuery>,
) -> Result<Envelope<Vec<User>>, ApiError> {
    auth.require_role(ADMINS)?;

    let filter = Filter::new()
        .eq_opt("role", query.role)
        .eq_opt("isActive", query.is_active)
        .search(&["name", "email"], query.search.as_deref());
    let sort = parse_sort(query.sort.as_deref(), SORT_FIELDS)?;
    let page = PageRequest::new(query.page, query.limit, &state.pagination);

    find_page(&state.store, filter, sort, &page).await
}

// ---------------------------------------------------------------------------
// GET /api/users/:id
// ---------------------------------------------------------------------------

/// Fetch one user.
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Envelope<User>, ApiError> {
    auth.require_role(ADMINS)?;
    let id: UserId = parse_id("user", &id)?;
    Ok(Envelope::data(load(&state.store, "User", id).await?))
}

// ---------------------------------------------------------------------------
// POST /api/users
// ---------------------------------------------------------------------------

/// Create a user with any role.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(body): ValidatedJson<CreateUserRequest>,
) -> Result<Created<User>, ApiError> {
    auth.require_role(ADMINS)?;

    let email = normalize_email(&body.email);
    ensure_email_free(&state, &email, None).await?;

    let now = Utc::now();
    let record = UserRecord {
        user: User {
            id: UserId::new(),
            name: body.name.trim().to_owned(),
            email,
            role: body.role.unwrap_or(Role::Employee),
            department: clean(body.department),
            is_active: body.is_active.unwrap_or(true),
            last_login: None,
            created_at: now,
            updated_at: now,
        },
        password_hash: state.passwords.hash(&body.password)?,
    };
    state.store.collection::<UserRecord>().insert(&record).await?;

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::Create,
            EntityType::User,
            record.user.id,
            format!("Created user {}", record.user.email),
        )
        .metadata(json!({ "role": record.user.role })),
    )
    .await?;

    Ok(Envelope::data(record.user).created())
}

// ---------------------------------------------------------------------------
// PUT /api/users/:id
// ---------------------------------------------------------------------------

/// Update a user's profile, role, or active flag.
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateUserRequest>,
) -> Result<Envelope<User>, ApiError> {
    auth.require_role(ADMINS)?;
    let id: UserId = parse_id("user", &id)?;
    let mut record: UserRecord = load(&state.store, "User", id).await?;

    let new_email = body
        .email
        .as_deref()
        .map(normalize_email)
        .filter(|email| *email != record.user.email);
    if let Some(email) = new_email {
        ensure_email_free(&state, &email, Some(id)).await?;
        record.user.email = email;
    }
    if let Some(name) = body.name {
        record.user.name = name.trim().to_owned();
    }
    if let Some(role) = body.role {
        record.user.role = role;
    }
    if body.department.is_some() {
        record.user.department = clean(body.department);
    }
    if let Some(active) = body.is_active {
        record.user.is_active = active;
    }
    record.user.updated_at = Utc::now();
    state.store.collection::<UserRecord>().replace(&record).await?;

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::Update,
            EntityType::User,
            id,
            format!("Updated user {}", record.user.email),
        ),
    )
    .await?;

    Ok(Envelope::data(record.user))
}

// ---------------------------------------------------------------------------
// DELETE /api/users/:id
// ---------------------------------------------------------------------------

/// Delete a user. Admins cannot delete themselves.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Envelope<()>, ApiError> {
    auth.require_role(ADMINS)?;
    let id: UserId = parse_id("user", &id)?;
    if id == auth.id() {
        return Err(ApiError::BadRequest(String::from(
            "You cannot delete your own account",
        )));
    }

    let user: User = load(&state.store, "User", id).await?;
    state.store.collection::<User>().delete(id).await?;

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::Delete,
            EntityType::User,
            id,
            format!("Deleted user {}", user.email),
        ),
    )
    .await?;

    Ok(Envelope::message("User deleted"))
}
