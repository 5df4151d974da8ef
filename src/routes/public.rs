use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a token. Mounted at the root, outside `/api`.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /
        // Service banner with the running version.
        .route("/", get(handlers::root))
        // GET /health
        // Liveness probe; never touches the database.
        .route("/health", get(handlers::health))
}

/// Credential exchange. Nested under `/api`.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        // POST /api/auth/register
        .route("/auth/register", post(handlers::auth::register))
        // POST /api/auth/login
        // Issues the bearer token every other `/api` route expects.
        .route("/auth/login", post(handlers::auth::login))
}
