use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{AppState, error::ApiError};

pub mod announcements;
pub mod auth;
pub mod catalog;
pub mod citizens;
pub mod dashboard;
pub mod grievances;

/// HealthResponse
///
/// Liveness payload for load balancers and uptime checks.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Banner {
    pub message: String,
    pub version: String,
}

/// health
///
/// [Public Route] Answers without touching the database.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "system"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp: Utc::now(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service banner", body = Banner)),
    tag = "system"
)]
pub async fn root() -> Json<Banner> {
    Json(Banner {
        message: "Civic Grievance Portal API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Fallback for every path no router matched.
pub async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
