//! Request extractors: the authenticated caller, validated JSON bodies,
//! and query strings with envelope-shaped rejections.

use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Json;
use opsdesk_core::Actor;
use opsdesk_types::{Role, User, UserId};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::ApiError;
use crate::state::AppState;

/// The user behind the request's bearer token.
///
/// The token only identifies the user; the account is reloaded on every
/// request so role changes and deactivation take effect immediately.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    /// Caller id.
    pub const fn id(&self) -> UserId {
        self.0.id
    }

    /// Caller as seen by the access rules.
    pub const fn actor(&self) -> Actor {
        Actor::new(self.0.id, self.0.role)
    }

    /// Fail with `403` unless the caller has one of `roles`.
    pub fn require_role(&self, roles: &[Role]) -> Result<(), ApiError> {
        if self.actor().has_role(roles) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "User role {} is not authorized to access this route",
                self.0.role
            )))
        }
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(not_authorized)?;

        let claims = state.tokens.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            not_authorized()
        })?;

        let user = state
            .store
            .collection::<User>()
            .get(claims.sub)
            .await?
            .filter(|user| user.is_active)
            .ok_or_else(not_authorized)?;

        Ok(Self(user))
    }
}

fn not_authorized() -> ApiError {
    ApiError::Unauthorized(String::from("Not authorized to access this route"))
}

/// A JSON body that has passed its `validator` rules.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Query string parameters; malformed values are a `400`.
#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}
