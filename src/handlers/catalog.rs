use axum::{Json, extract::State};

use crate::{
    error::{ApiError, ErrorBody},
    models::{ServiceEnvelope, ServiceList, ZoneEnvelope, ZoneList},
    repository::RepositoryState,
    validation::ValidatedPath,
};

// Read-only reference data: municipal services and zones.

#[utoipa::path(
    get,
    path = "/api/services",
    responses((status = 200, description = "All services", body = ServiceList)),
    security(("bearer_auth" = [])),
    tag = "catalog"
)]
pub async fn list_services(
    State(repo): State<RepositoryState>,
) -> Result<Json<ServiceList>, ApiError> {
    let services = repo.list_services().await?;
    Ok(Json(ServiceList { services }))
}

#[utoipa::path(
    get,
    path = "/api/services/{id}",
    params(("id" = i32, Path, description = "Service id")),
    responses(
        (status = 200, description = "Service", body = ServiceEnvelope),
        (status = 404, description = "Not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "catalog"
)]
pub async fn get_service(
    State(repo): State<RepositoryState>,
    ValidatedPath(id): ValidatedPath<i32>,
) -> Result<Json<ServiceEnvelope>, ApiError> {
    let service = repo
        .get_service(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Service not found"))?;
    Ok(Json(ServiceEnvelope { service }))
}

#[utoipa::path(
    get,
    path = "/api/zones",
    responses((status = 200, description = "All zones", body = ZoneList)),
    security(("bearer_auth" = [])),
    tag = "catalog"
)]
pub async fn list_zones(State(repo): State<RepositoryState>) -> Result<Json<ZoneList>, ApiError> {
    let zones = repo.list_zones().await?;
    Ok(Json(ZoneList { zones }))
}

#[utoipa::path(
    get,
    path = "/api/zones/{id}",
    params(("id" = i32, Path, description = "Zone id")),
    responses(
        (status = 200, description = "Zone", body = ZoneEnvelope),
        (status = 404, description = "Not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "catalog"
)]
pub async fn get_zone(
    State(repo): State<RepositoryState>,
    ValidatedPath(id): ValidatedPath<i32>,
) -> Result<Json<ZoneEnvelope>, ApiError> {
    let zone = repo
        .get_zone(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Zone not found"))?;
    Ok(Json(ZoneEnvelope { zone }))
}
