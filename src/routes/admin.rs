use crate::{
    AppState,
    auth::{ADMIN_ONLY, require_roles},
    handlers::{announcements, dashboard},
};
use axum::{
    Router,
    extract::Request,
    middleware::{self, Next},
    routing::{get, post, put},
};

/// Admin Router Module
///
/// Announcement publishing and the system-wide dashboard. The whole router sits behind
/// `require_roles(ADMIN_ONLY)`, which runs after authentication and before any extractor.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // POST /api/announcements
        .route("/announcements", post(announcements::create_announcement))
        // PUT/DELETE /api/announcements/{id}
        .route(
            "/announcements/{id}",
            put(announcements::update_announcement).delete(announcements::delete_announcement),
        )
        // GET /api/dashboard/stats
        // Totals, counts by status and by service, most recent grievances.
        .route("/dashboard/stats", get(dashboard::get_admin_stats))
        .route_layer(middleware::from_fn(|request: Request, next: Next| {
            require_roles(ADMIN_ONLY, request, next)
        }))
}
