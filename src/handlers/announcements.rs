use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ErrorBody},
    models::{
        Announcement, AnnouncementEnvelope, Audience, CreateAnnouncementRequest, Role,
        UpdateAnnouncementRequest,
    },
    validation::{ValidatedJson, ValidatedPath},
};

/// list_announcements
///
/// [Authenticated Route] Live announcements addressed to the caller's role, newest first.
#[utoipa::path(
    get,
    path = "/api/announcements",
    responses((status = 200, description = "Announcements", body = [Announcement])),
    security(("bearer_auth" = [])),
    tag = "announcements"
)]
pub async fn list_announcements(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Announcement>>, ApiError> {
    let announcements = state
        .repo
        .list_announcements(Audience::visible_to(user.role))
        .await?;
    Ok(Json(announcements))
}

/// get_announcement
///
/// [Authenticated Route] Administrators can read any announcement. Everyone else only sees
/// live ones addressed to them; anything else is reported as missing.
#[utoipa::path(
    get,
    path = "/api/announcements/{id}",
    params(("id" = i32, Path, description = "Announcement id")),
    responses(
        (status = 200, description = "Announcement", body = AnnouncementEnvelope),
        (status = 404, description = "Not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "announcements"
)]
pub async fn get_announcement(
    user: AuthUser,
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<i32>,
) -> Result<Json<AnnouncementEnvelope>, ApiError> {
    let announcement = state
        .repo
        .get_announcement(id)
        .await?
        .filter(|a| {
            user.is(Role::Admin)
                || (a.is_live(Utc::now())
                    && Audience::visible_to(user.role).contains(&a.target_audience))
        })
        .ok_or_else(|| ApiError::not_found("Announcement not found"))?;

    Ok(Json(AnnouncementEnvelope { announcement }))
}

#[utoipa::path(
    post,
    path = "/api/announcements",
    request_body = CreateAnnouncementRequest,
    responses(
        (status = 201, description = "Published", body = AnnouncementEnvelope),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 403, description = "Not an administrator", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "announcements"
)]
pub async fn create_announcement(
    user: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateAnnouncementRequest>,
) -> Result<(StatusCode, Json<AnnouncementEnvelope>), ApiError> {
    let announcement = state.repo.create_announcement(user.id, payload).await?;

    tracing::info!(
        announcement_id = announcement.announcement_id,
        audience = %announcement.target_audience,
        "announcement published"
    );

    Ok((
        StatusCode::CREATED,
        Json(AnnouncementEnvelope { announcement }),
    ))
}

#[utoipa::path(
    put,
    path = "/api/announcements/{id}",
    params(("id" = i32, Path, description = "Announcement id")),
    request_body = UpdateAnnouncementRequest,
    responses(
        (status = 200, description = "Updated", body = AnnouncementEnvelope),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 403, description = "Not an administrator", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "announcements"
)]
pub async fn update_announcement(
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<i32>,
    ValidatedJson(payload): ValidatedJson<UpdateAnnouncementRequest>,
) -> Result<Json<AnnouncementEnvelope>, ApiError> {
    let announcement = state
        .repo
        .update_announcement(id, payload)
        .await?
        .ok_or_else(|| ApiError::not_found("Announcement not found"))?;

    tracing::info!(announcement_id = id, "announcement updated");

    Ok(Json(AnnouncementEnvelope { announcement }))
}

/// delete_announcement
///
/// [Admin Route] Removes an announcement outright.
#[utoipa::path(
    delete,
    path = "/api/announcements/{id}",
    params(("id" = i32, Path, description = "Announcement id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not an administrator", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "announcements"
)]
pub async fn delete_announcement(
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<i32>,
) -> Result<StatusCode, ApiError> {
    if state.repo.delete_announcement(id).await? {
        tracing::info!(announcement_id = id, "announcement deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Announcement not found"))
    }
}
