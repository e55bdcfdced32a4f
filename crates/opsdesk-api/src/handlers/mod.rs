//! REST API endpoint handlers, one module per resource.
//!
//! Every handler follows the same shape: authenticate, validate the
//! request, run one or a few store operations, record an activity for
//! mutations, and answer with an [`Envelope`].
//!
//! # Endpoints
//!
//! | Prefix | Module |
//! |--------|--------|
//! | `/api/auth` | [`auth`] |
//! | `/api/users` | [`users`] |
//! | `/api/tasks` | [`tasks`] |
//! | `/api/projects` | [`projects`] |
//! | `/api/milestones` | [`milestones`] |
//! | `/api/customers` | [`customers`] |
//! | `/api/suppliers` | [`suppliers`] |
//! | `/api/inventory` | [`inventory`] |
//! | `/api/inventory-alerts` | [`alerts`] |
//! | `/api/shipments` | [`shipments`] |
//! | `/api/purchase-orders` | [`purchase_orders`] |
//! | `/api/activities` | [`activities`] |
//! | `/api/analytics` | [`analytics`] |
//! | `/api/health`, `/api/system` | [`system`] |

pub mod activities;
pub mod alerts;
pub mod analytics;
pub mod auth;
pub mod customers;
pub mod inventory;
pub mod milestones;
pub mod projects;
pub mod purchase_orders;
pub mod shipments;
pub mod suppliers;
pub mod system;
pub mod tasks;
pub mod users;

use core::fmt::Display;
use core::str::FromStr;

use opsdesk_core::PageRequest;
use opsdesk_db::{Document, DocumentStore, Filter, FindOptions, ScalarKind, Sort};
use opsdesk_types::Role;
use uuid::Uuid;

use crate::envelope::Envelope;
use crate::error::ApiError;

/// Roles allowed to manage shared records.
pub(crate) const MANAGERS: &[Role] = &[Role::Admin, Role::Manager];

/// Roles allowed to run admin-only operations.
pub(crate) const ADMINS: &[Role] = &[Role::Admin];

/// Parse a path segment into a typed id.
pub(crate) fn parse_id<T>(kind: &str, raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = uuid::Error>,
{
    raw.parse()
        .map_err(|e: uuid::Error| ApiError::BadRequest(format!("Invalid {kind} id '{raw}': {e}")))
}

/// Load one document or fail with `404`.
pub(crate) async fn load<T, I>(store: &DocumentStore, kind: &str, id: I) -> Result<T, ApiError>
where
    T: Document,
    I: Into<Uuid> + Display + Copy,
{
    store
        .collection::<T>()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found(kind, id))
}

/// Fail with `404` unless the referenced document exists.
pub(crate) async fn ensure_exists<T, I>(
    store: &DocumentStore,
    kind: &str,
    id: Option<I>,
) -> Result<(), ApiError>
where
    T: Document,
    I: Into<Uuid> + Display + Copy,
{
    if let Some(id) = id {
        load::<T, I>(store, kind, id).await?;
    }
    Ok(())
}

/// One page of `T` matching `filter`.
pub(crate) async fn find_page<T: Document>(
    store: &DocumentStore,
    filter: Filter,
    sort: Sort,
    page: &PageRequest,
) -> Result<Envelope<Vec<T>>, ApiError> {
    let collection = store.collection::<T>();
    let total = collection.count(&filter).await?;
    let options = FindOptions::new(filter)
        .sort(sort)
        .skip(page.skip())
        .limit(page.limit);
    let items = collection.find(&options).await?;
    Ok(Envelope::page(items, total, page))
}

/// Parse a `sort` parameter (`field` or `-field`) against a whitelist.
///
/// No parameter means newest first.
pub(crate) fn parse_sort(
    raw: Option<&str>,
    allowed: &[(&str, ScalarKind)],
) -> Result<Sort, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(Sort::newest_first());
    };
    let (field, descending) = raw.strip_prefix('-').map_or((raw, false), |f| (f, true));
    let kind = allowed
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, kind)| *kind)
        .ok_or_else(|| ApiError::BadRequest(format!("Cannot sort by '{field}'")))?;
    Ok(if descending {
        Sort::desc(field, kind)
    } else {
        Sort::asc(field, kind)
    })
}

/// `400` for a value that collides with an existing unique field.
pub(crate) fn already_exists(what: impl Display) -> ApiError {
    ApiError::BadRequest(format!("{what} already exists"))
}

/// Trim free text, dropping it when empty.
pub(crate) fn clean(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_owned()).filter(|t| !t.is_empty())
}
