use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ErrorBody},
    models::{
        LoginRequest, LoginResponse, NewCitizen, ProfileResponse, RegisterRequest,
        RegisterResponse, VerifyResponse,
    },
    password::{hash_password, verify_password},
    repository::RepositoryError,
    validation::ValidatedJson,
};

const DUPLICATE_EMAIL: &str = "User with this email already exists";
const BAD_CREDENTIALS: &str = "Invalid credentials";

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// register
///
/// [Public Route] Creates a principal and returns its public record. The digest is computed
/// on the blocking pool and never leaves the server.
///
/// A duplicate email is a 409 whether it is caught by the lookup or, under a concurrent
/// registration, by the unique index.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = RegisterResponse),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let email = normalize_email(&payload.email);

    if state.repo.find_citizen_by_email(&email).await?.is_some() {
        return Err(ApiError::conflict(DUPLICATE_EMAIL));
    }

    let password_hash = hash_password(payload.password, state.config.bcrypt_cost)
        .await
        .map_err(ApiError::internal)?;

    let user = state
        .repo
        .create_citizen(NewCitizen {
            email,
            password_hash,
            first_name: payload.first_name.trim().to_string(),
            last_name: payload.last_name.trim().to_string(),
            role: payload.role.unwrap_or_default(),
        })
        .await
        .map_err(|e| match e {
            RepositoryError::UniqueViolation(_) => ApiError::conflict(DUPLICATE_EMAIL),
            other => other.into(),
        })?;

    tracing::info!(citizen_id = user.citizen_id, role = %user.role, "registered principal");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            user,
        }),
    ))
}

/// login
///
/// [Public Route] Exchanges email and password for a signed token. An unknown email and a
/// wrong password are indistinguishable to the client.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = normalize_email(&payload.email);

    let Some(credentials) = state.repo.find_citizen_by_email(&email).await? else {
        tracing::debug!("login attempt for unknown email");
        return Err(ApiError::unauthenticated(BAD_CREDENTIALS));
    };

    let matches = verify_password(payload.password, credentials.password_hash)
        .await
        .map_err(ApiError::internal)?;
    if !matches {
        tracing::debug!(citizen_id = credentials.citizen.citizen_id, "wrong password");
        return Err(ApiError::unauthenticated(BAD_CREDENTIALS));
    }

    let user = credentials.citizen;
    let token = state.tokens.issue(&user).map_err(ApiError::internal)?;

    tracing::info!(citizen_id = user.citizen_id, "issued access token");

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token,
        user,
    }))
}

/// profile
///
/// [Authenticated Route] The caller's current record, looked up by the token subject.
#[utoipa::path(
    get,
    path = "/api/auth/profile",
    responses(
        (status = 200, description = "Current user", body = ProfileResponse),
        (status = 404, description = "User no longer exists", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn profile(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = state
        .repo
        .get_citizen(user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(ProfileResponse { user }))
}

/// verify
///
/// [Authenticated Route] Reaching the handler means the token verified; echo its identity.
#[utoipa::path(
    get,
    path = "/api/auth/verify",
    responses((status = 200, description = "Token is valid", body = VerifyResponse)),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn verify(user: AuthUser) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        valid: true,
        user: user.into(),
    })
}
