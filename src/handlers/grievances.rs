use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ErrorBody},
    models::{
        CreateGrievanceRequest, Grievance, GrievanceList, GrievanceListQuery, Pagination, Role,
        UpdateGrievanceRequest,
    },
    repository::GrievanceFilter,
    validation::{ValidatedJson, ValidatedPath, ValidatedQuery},
};

/// list_grievances
///
/// [Authenticated Route] One page of grievance summaries. Citizens are always restricted to
/// their own grievances; staff see everything the filters match.
#[utoipa::path(
    get,
    path = "/api/grievances",
    params(GrievanceListQuery),
    responses(
        (status = 200, description = "Grievance page", body = GrievanceList),
        (status = 400, description = "Query validation error", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "grievances"
)]
pub async fn list_grievances(
    user: AuthUser,
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<GrievanceListQuery>,
) -> Result<Json<GrievanceList>, ApiError> {
    let owner = user.is(Role::Citizen).then_some(user.id);
    let filter = GrievanceFilter::new(&query, owner);

    let (grievances, total) = state.repo.list_grievances(&filter).await?;

    Ok(Json(GrievanceList {
        grievances,
        pagination: Pagination::new(query.page, query.limit, total),
    }))
}

/// get_grievance
///
/// [Authenticated Route] The full grievance row. A citizen asking for someone else's
/// grievance gets 403, not 404.
#[utoipa::path(
    get,
    path = "/api/grievances/{id}",
    params(("id" = i32, Path, description = "Grievance id")),
    responses(
        (status = 200, description = "Grievance", body = Grievance),
        (status = 403, description = "Not the owner", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "grievances"
)]
pub async fn get_grievance(
    user: AuthUser,
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<i32>,
) -> Result<Json<Grievance>, ApiError> {
    let grievance = state
        .repo
        .get_grievance(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Grievance not found"))?;

    if user.is(Role::Citizen) && grievance.citizen_id != user.id {
        tracing::warn!(grievance_id = id, citizen_id = user.id, "grievance read by non-owner");
        return Err(ApiError::forbidden("Access denied"));
    }

    Ok(Json(grievance))
}

/// create_grievance
///
/// [Citizen Route] Files a grievance owned by the caller. The owner always comes from the
/// token, never from the body.
#[utoipa::path(
    post,
    path = "/api/grievances",
    request_body = CreateGrievanceRequest,
    responses(
        (status = 201, description = "Grievance filed", body = Grievance),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 403, description = "Not a citizen", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "grievances"
)]
pub async fn create_grievance(
    user: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateGrievanceRequest>,
) -> Result<(StatusCode, Json<Grievance>), ApiError> {
    if let Some(service_id) = payload.service_id
        && state.repo.get_service(service_id).await?.is_none()
    {
        return Err(ApiError::validation(
            "Validation error",
            vec!["service_id must reference an existing service".to_string()],
        ));
    }

    let grievance = state.repo.create_grievance(user.id, payload).await?;

    tracing::info!(
        grievance_id = grievance.grievance_id,
        citizen_id = user.id,
        "grievance filed"
    );

    Ok((StatusCode::CREATED, Json(grievance)))
}

/// update_grievance
///
/// [Staff Route] Triage: change status, priority or the assigned provider. Absent fields
/// are left unchanged. The assignee must be a principal with the provider role.
#[utoipa::path(
    put,
    path = "/api/grievances/{id}",
    params(("id" = i32, Path, description = "Grievance id")),
    request_body = UpdateGrievanceRequest,
    responses(
        (status = 200, description = "Updated grievance", body = Grievance),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 403, description = "Not staff", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "grievances"
)]
pub async fn update_grievance(
    user: AuthUser,
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<i32>,
    ValidatedJson(payload): ValidatedJson<UpdateGrievanceRequest>,
) -> Result<Json<Grievance>, ApiError> {
    if let Some(provider_id) = payload.assigned_provider_id {
        let assignee = state.repo.get_citizen(provider_id).await?;
        if assignee.is_none_or(|p| p.role != Role::Provider) {
            return Err(ApiError::validation(
                "Validation error",
                vec!["assigned_provider_id must reference a service provider".to_string()],
            ));
        }
    }

    let grievance = state
        .repo
        .update_grievance(id, payload)
        .await?
        .ok_or_else(|| ApiError::not_found("Grievance not found"))?;

    tracing::info!(
        grievance_id = id,
        updated_by = user.id,
        status = %grievance.status,
        "grievance updated"
    );

    Ok(Json(grievance))
}
