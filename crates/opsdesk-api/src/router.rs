//! Axum router construction for the Opsdesk API.
//!
//! Assembles every resource's routes under `/api` into a single
//! [`Router`] with CORS and request tracing enabled.

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{
    activities, alerts, analytics, auth, customers, inventory, milestones, projects,
    purchase_orders, shipments, suppliers, system, tasks, users,
};
use crate::state::AppState;

/// Build the complete Axum router for the API server.
///
/// Only `POST /api/auth/register`, `POST /api/auth/login` and
/// `GET /api/health` are reachable without a bearer token. Unknown paths
/// answer with a `404` envelope.
///
/// CORS allows any origin so browser front ends on other hosts can call
/// the API.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/details", put(auth::update_details))
        .route("/api/auth/password", put(auth::update_password))
        // Users
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route(
            "/api/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        // Tasks
        .route("/api/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/api/tasks/{id}",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        // Projects
        .route(
            "/api/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/api/projects/{id}",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        .route("/api/projects/{id}/stats", get(projects::project_stats))
        // Milestones
        .route(
            "/api/milestones",
            get(milestones::list_milestones).post(milestones::create_milestone),
        )
        .route(
            "/api/milestones/{id}",
            get(milestones::get_milestone)
                .put(milestones::update_milestone)
                .delete(milestones::delete_milestone),
        )
        // Customers
        .route(
            "/api/customers",
            get(customers::list_customers).post(customers::create_customer),
        )
        .route(
            "/api/customers/{id}",
            get(customers::get_customer)
                .put(customers::update_customer)
                .delete(customers::delete_customer),
        )
        // Suppliers
        .route(
            "/api/suppliers",
            get(suppliers::list_suppliers).post(suppliers::create_supplier),
        )
        .route(
            "/api/suppliers/{id}",
            get(suppliers::get_supplier)
                .put(suppliers::update_supplier)
                .delete(suppliers::delete_supplier),
        )
        // Inventory
        .route(
            "/api/inventory",
            get(inventory::list_items).post(inventory::create_item),
        )
        .route(
            "/api/inventory/{id}",
            get(inventory::get_item)
                .put(inventory::update_item)
                .delete(inventory::delete_item),
        )
        .route("/api/inventory/{id}/adjust", post(inventory::adjust_stock))
        // Inventory alerts
        .route("/api/inventory-alerts", get(alerts::list_alerts))
        .route(
            "/api/inventory-alerts/{id}",
            get(alerts::get_alert).delete(alerts::delete_alert),
        )
        .route(
            "/api/inventory-alerts/{id}/resolve",
            put(alerts::resolve_alert),
        )
        // Shipments
        .route(
            "/api/shipments",
            get(shipments::list_shipments).post(shipments::create_shipment),
        )
        .route(
            "/api/shipments/track/{tracking_number}",
            get(shipments::track_shipment),
        )
        .route(
            "/api/shipments/{id}",
            get(shipments::get_shipment)
                .put(shipments::update_shipment)
                .delete(shipments::delete_shipment),
        )
        // Purchase orders
        .route(
            "/api/purchase-orders",
            get(purchase_orders::list_purchase_orders)
                .post(purchase_orders::create_purchase_order),
        )
        .route(
            "/api/purchase-orders/{id}",
            get(purchase_orders::get_purchase_order)
                .put(purchase_orders::update_purchase_order)
                .delete(purchase_orders::delete_purchase_order),
        )
        .route(
            "/api/purchase-orders/{id}/approve",
            put(purchase_orders::approve_purchase_order),
        )
        .route(
            "/api/purchase-orders/{id}/order",
            put(purchase_orders::place_purchase_order),
        )
        .route(
            "/api/purchase-orders/{id}/receive",
            put(purchase_orders::receive_purchase_order),
        )
        .route(
            "/api/purchase-orders/{id}/cancel",
            put(purchase_orders::cancel_purchase_order),
        )
        // Activity log
        .route("/api/activities", get(activities::list_activities))
        // Analytics
        .route("/api/analytics/dashboard", get(analytics::dashboard))
        .route("/api/analytics/tasks", get(analytics::task_report))
        .route("/api/analytics/inventory", get(analytics::inventory_report))
        .route("/api/analytics/projects", get(analytics::project_report))
        .route(
            "/api/analytics/purchase-orders",
            get(analytics::purchasing_report),
        )
        .route("/api/analytics/shipments", get(analytics::shipment_report))
        // System
        .route("/api/health", get(system::health))
        .route("/api/system/status", get(system::system_status))
        .fallback(system::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
