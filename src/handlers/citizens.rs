use axum::{Json, extract::State};

use crate::{
    auth::AuthUser,
    error::{ApiError, ErrorBody},
    models::CitizenProfile,
    repository::RepositoryState,
};

/// get_my_profile
///
/// [Authenticated Route] The caller's record together with the vehicles they own and the
/// houses they reside in, each house with its zone resolved.
#[utoipa::path(
    get,
    path = "/api/citizens/me/profile",
    responses(
        (status = 200, description = "Citizen profile", body = CitizenProfile),
        (status = 404, description = "Citizen not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "citizens"
)]
pub async fn get_my_profile(
    user: AuthUser,
    State(repo): State<RepositoryState>,
) -> Result<Json<CitizenProfile>, ApiError> {
    let citizen = repo
        .get_citizen(user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Citizen not found"))?;

    let vehicles = repo.get_vehicles(user.id).await?;
    let residences = repo.get_residences(user.id).await?;

    Ok(Json(CitizenProfile {
        citizen,
        vehicles,
        residences,
    }))
}
