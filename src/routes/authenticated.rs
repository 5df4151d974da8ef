use crate::{
    AppState,
    handlers::{announcements, auth, catalog, citizens, dashboard, grievances},
};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Routes open to every verified principal. Handlers that need per-role behaviour (the
/// citizen-only view of the grievance list, ownership on a single grievance, the audience
/// filter on announcements) apply it themselves from the `AuthUser` they receive.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Session ---
        .route("/auth/profile", get(auth::profile))
        .route("/auth/verify", get(auth::verify))
        // --- Grievances ---
        // Citizens only ever see their own rows here.
        .route("/grievances", get(grievances::list_grievances))
        .route("/grievances/{id}", get(grievances::get_grievance))
        // --- Announcements ---
        .route("/announcements", get(announcements::list_announcements))
        .route("/announcements/{id}", get(announcements::get_announcement))
        // --- Reference data ---
        .route("/services", get(catalog::list_services))
        .route("/services/{id}", get(catalog::get_service))
        .route("/zones", get(catalog::list_zones))
        .route("/zones/{id}", get(catalog::get_zone))
        // --- Profile & dashboard ---
        .route("/citizens/me/profile", get(citizens::get_my_profile))
        .route("/dashboard/citizen-stats", get(dashboard::get_citizen_stats))
}
