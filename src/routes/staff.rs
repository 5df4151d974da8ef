use crate::{
    AppState,
    auth::{PROVIDER_ONLY, STAFF, require_roles},
    handlers::{dashboard, grievances},
};
use axum::{
    Router,
    extract::Request,
    middleware::{self, Next},
    routing::{get, put},
};

/// Staff Router Module
///
/// Grievance triage for administrators and providers. A citizen is refused with 403
/// before the update body is even parsed.
pub fn staff_routes() -> Router<AppState> {
    Router::new()
        // PUT /api/grievances/{id}
        // Status, priority and assignment changes.
        .route("/grievances/{id}", put(grievances::update_grievance))
        .route_layer(middleware::from_fn(|request: Request, next: Next| {
            require_roles(STAFF, request, next)
        }))
}

/// Provider-only views.
pub fn provider_routes() -> Router<AppState> {
    Router::new()
        // GET /api/dashboard/provider-stats
        .route(
            "/dashboard/provider-stats",
            get(dashboard::get_provider_stats),
        )
        .route_layer(middleware::from_fn(|request: Request, next: Next| {
            require_roles(PROVIDER_ONLY, request, next)
        }))
}
