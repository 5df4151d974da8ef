use crate::{
    AppState,
    auth::{CITIZEN_ONLY, require_roles},
    handlers::grievances,
};
use axum::{
    Router,
    extract::Request,
    middleware::{self, Next},
    routing::post,
};

/// Citizen Router Module
///
/// Filing a grievance is reserved for citizens so that every grievance's owner is a
/// citizen. The role check runs before the body is read.
pub fn citizen_routes() -> Router<AppState> {
    Router::new()
        // POST /api/grievances
        .route("/grievances", post(grievances::create_grievance))
        .route_layer(middleware::from_fn(|request: Request, next: Next| {
            require_roles(CITIZEN_ONLY, request, next)
        }))
}
