//! Registration, login, and the caller's own account.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/auth/register` | Create an employee account, returns a token |
//! | `POST` | `/api/auth/login` | Exchange credentials for a token |
//! | `GET` | `/api/auth/me` | The authenticated user |
//! | `PUT` | `/api/auth/details` | Update own name, email, department |
//! | `PUT` | `/api/auth/password` | Change own password, returns a new token |

use std::sync::Arc;

use axum::extract::State;
use chrono::Utc;
use opsdesk_db::Filter;
use opsdesk_types::{ActivityAction, EntityType, Role, User, UserId, UserRecord};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::activity::{self, Entry};
use crate::envelope::{Created, Envelope};
use crate::error::ApiError;
use crate::extract::{AuthUser, ValidatedJson};
use crate::handlers::{already_exists, clean, load};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /api/auth/register`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Display name.
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Please add a name"))]
    pub name: String,
    /// Login email.
    #[serde(default)]
    #[validate(email(message = "Please add a valid email"))]
    pub email: String,
    /// Plain-text password.
    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    /// Department.
    pub department: Option<String>,
}

/// Body of `POST /api/auth/login`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Login email.
    #[serde(default)]
    #[validate(email(message = "Please add a valid email"))]
    pub email: String,
    /// Plain-text password.
    #[serde(default)]
    #[validate(length(min = 1, message = "Please add a password"))]
    pub password: String,
}

/// Body of `PUT /api/auth/details`.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDetailsRequest {
    /// New display name.
    #[validate(length(min = 1, max = 100, message = "Name cannot be empty"))]
    pub name: Option<String>,
    /// New login email.
    #[validate(email(message = "Please add a valid email"))]
    pub email: Option<String>,
    /// New department.
    pub department: Option<String>,
}

/// Body of `PUT /api/auth/password`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    /// Current password.
    #[serde(default)]
    #[validate(length(min = 1, message = "Please add your current password"))]
    pub current_password: String,
    /// Replacement password.
    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: String,
}

/// A token with the user it was issued for.
#[derive(Debug, Serialize)]
pub struct AuthPayload {
    /// Bearer token.
    pub token: String,
    /// The authenticated user.
    pub user: User,
}

/// Lowercased, trimmed email used for storage and lookups.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Fail with `400` if another user already has `email`.
pub(crate) async fn ensure_email_free(
    state: &AppState,
    email: &str,
    except: Option<UserId>,
) -> Result<(), ApiError> {
    let mut filter = Filter::new().eq("email", email);
    if let Some(id) = except {
        filter = filter.ne("id", id);
    }
    if state.store.collection::<User>().exists(&filter).await? {
        return Err(already_exists("User"));
    }
    Ok(())
}

fn payload(state: &AppState, user: User) -> Result<AuthPayload, ApiError> {
    let token = state.tokens.issue(user.id, user.role, Utc::now())?;
    Ok(AuthPayload { token, user })
}

// ---------------------------------------------------------------------------
// POST /api/auth/register
// ---------------------------------------------------------------------------

/// Create an employee account and log it in.
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> Result<Created<AuthPayload>, ApiError> {
    let email = normalize_email(&body.email);
    ensure_email_free(&state, &email, None).await?;

    let now = Utc::now();
    let record = UserRecord {
        user: User {
            id: UserId::new(),
            name: body.name.trim().to_owned(),
            email,
            role: Role::Employee,
            department: clean(body.department),
            is_active: true,
            last_login: Some(now),
            created_at: now,
            updated_at: now,
        },
        password_hash: state.passwords.hash(&body.password)?,
    };
    state.store.collection::<UserRecord>().insert(&record).await?;

    tracing::info!(user_id = %record.user.id, "User registered");
    activity::record(
        &state.store,
        Entry::new(
            record.user.id,
            ActivityAction::Create,
            EntityType::User,
            record.user.id,
            format!("{} registered", record.user.name),
        ),
    )
    .await?;

    Ok(Envelope::data(payload(&state, record.user)?).created())
}

// ---------------------------------------------------------------------------
// POST /api/auth/login
// ---------------------------------------------------------------------------

/// Check credentials and issue a token.
///
/// Unknown emails, wrong passwords, and deactivated accounts all answer
/// with the same `401`.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> Result<Envelope<AuthPayload>, ApiError> {
    let invalid = || ApiError::Unauthorized(String::from("Invalid credentials"));
    let users = state.store.collection::<UserRecord>();

    let mut record = users
        .find_one(Filter::new().eq("email", normalize_email(&body.email)))
        .await?
        .filter(|record| record.user.is_active)
        .ok_or_else(invalid)?;

    if !state.passwords.verify(&body.password, &record.password_hash)? {
        return Err(invalid());
    }

    let now = Utc::now();
    record.user.last_login = Some(now);
    record.user.updated_at = now;
    users.replace(&record).await?;

    activity::record(
        &state.store,
        Entry::new(
            record.user.id,
            ActivityAction::Login,
            EntityType::User,
            record.user.id,
            format!("{} logged in", record.user.name),
        ),
    )
    .await?;

    Ok(Envelope::data(payload(&state, record.user)?))
}

// ---------------------------------------------------------------------------
// GET /api/auth/me
// ---------------------------------------------------------------------------

/// The authenticated user.
pub async fn me(AuthUser(user): AuthUser) -> Envelope<User> {
    Envelope::data(user)
}

// ---------------------------------------------------------------------------
// PUT /api/auth/details
// ---------------------------------------------------------------------------

/// Update the caller's own profile fields.
pub async fn update_details(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(body): ValidatedJson<UpdateDetailsRequest>,
) -> Result<Envelope<User>, ApiError> {
    let mut record: UserRecord = load(&state.store, "User", auth.id()).await?;

    let new_email = body
        .email
        .as_deref()
        .map(normalize_email)
        .filter(|email| *email != record.user.email);
    if let Some(email) = new_email {
        ensure_email_free(&state, &email, Some(record.user.id)).await?;
        record.user.email = email;
    }
    if let Some(name) = body.name {
        record.user.name = name.trim().to_owned();
    }
    if body.department.is_some() {
        record.user.department = clean(body.department);
    }
    record.user.updated_at = Utc::now();
    state.store.collection::<UserRecord>().replace(&record).await?;

    activity::record(
        &state.store,
        Entry::new(
            record.user.id,
            ActivityAction::Update,
            EntityType::User,
            record.user.id,
            "Updated account details",
        ),
    )
    .await?;

    Ok(Envelope::data(record.user))
}

// ---------------------------------------------------------------------------
// PUT /api/auth/password
// ---------------------------------------------------------------------------

/// Change the caller's password after checking the current one.
pub async fn update_password(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(body): ValidatedJson<UpdatePasswordRequest>,
) -> Result<Envelope<AuthPayload>, ApiError> {
    let mut record: UserRecord = load(&state.store, "User", auth.id()).await?;

    if !state
        .passwords
        .verify(&body.current_password, &record.password_hash)?
    {
        return Err(ApiError::Unauthorized(String::from("Password is incorrect")));
    }

    record.password_hash = state.passwords.hash(&body.new_password)?;
    record.user.updated_at = Utc::now();
    state.store.collection::<UserRecord>().replace(&record).await?;

    activity::record(
        &state.store,
        Entry::new(
            record.user.id,
            ActivityAction::Update,
            EntityType::User,
            record.user.id,
            "Changed password",
        ),
    )
    .await?;

    Ok(Envelope::data(payload(&state, record.user)?).with_message("Password updated"))
}
