use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    error::ApiError,
    models::{Citizen, Role, TokenIdentity},
};

// --- Role allow-lists used with `require_roles` ---

pub const ADMIN_ONLY: &[Role] = &[Role::Admin];
pub const STAFF: &[Role] = &[Role::Admin, Role::Provider];
pub const CITIZEN_ONLY: &[Role] = &[Role::Citizen];
pub const PROVIDER_ONLY: &[Role] = &[Role::Provider];

/// TokenClaims
///
/// The signed JWT payload exactly as it travels on the wire. `sub` is the principal's id
/// rendered as a string, per the JWT registered claim.
#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    sub: String,
    role: Role,
    email: String,
    iat: i64,
    exp: i64,
}

/// Claims
///
/// The verified identity of a request. Produced only by `TokenService::verify`, stored in
/// the request extensions by `authenticate`, and the sole input to every role or ownership
/// decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub sub: i32,
    pub role: Role,
    pub email: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// VerificationError
///
/// Why a presented token was refused. Both cases are rendered identically to the client.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum VerificationError {
    #[error("token has expired")]
    Expired,
    #[error("token is malformed or its signature is invalid")]
    Malformed,
}

/// TokenService
///
/// HS256 issuer and verifier built once from the configured secret and lifetime. Holds no
/// per-token state: there is no revocation list and no replay protection.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact; a token is dead the second after `exp`.
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: Duration::seconds(ttl_secs),
        }
    }

    /// Issues a token for `principal` valid from now.
    pub fn issue(&self, principal: &Citizen) -> jsonwebtoken::errors::Result<String> {
        self.issue_at(principal, Utc::now())
    }

    /// issue_at
    ///
    /// Issues a token as if signed at `issued_at`. Used directly by tests to mint tokens
    /// that are already expired.
    pub fn issue_at(
        &self,
        principal: &Citizen,
        issued_at: DateTime<Utc>,
    ) -> jsonwebtoken::errors::Result<String> {
        let claims = TokenClaims {
            sub: principal.citizen_id.to_string(),
            role: principal.role,
            email: principal.email.clone(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// verify
    ///
    /// Checks signature, algorithm and expiry, then decodes the payload. An expired token is
    /// reported as `Expired` even if it is otherwise well-formed; every other defect
    /// (bad signature, unknown role, non-numeric subject) is `Malformed`.
    pub fn verify(&self, token: &str) -> Result<Claims, VerificationError> {
        let data = decode::<TokenClaims>(token, &self.decoding, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => VerificationError::Expired,
                _ => VerificationError::Malformed,
            },
        )?;
        let raw = data.claims;

        let sub = raw
            .sub
            .parse::<i32>()
            .map_err(|_| VerificationError::Malformed)?;
        let issued_at =
            DateTime::from_timestamp(raw.iat, 0).ok_or(VerificationError::Malformed)?;
        let expires_at =
            DateTime::from_timestamp(raw.exp, 0).ok_or(VerificationError::Malformed)?;

        Ok(Claims {
            sub,
            role: raw.role,
            email: raw.email,
            issued_at,
            expires_at,
        })
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`. Any other scheme counts as
/// no token at all.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// authenticate
///
/// Middleware guarding every protected router. A request without a bearer token is
/// rejected with 401 before any handler or repository runs; a present but invalid or
/// expired token is rejected with 403. On success the verified `Claims` are placed in the
/// request extensions for `AuthUser` and `require_roles` to read.
pub async fn authenticate(
    State(tokens): State<TokenService>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| ApiError::unauthenticated("Access token required"))?;

    let claims = tokens.verify(token).map_err(|reason| {
        tracing::debug!(%reason, "rejected bearer token");
        ApiError::forbidden("Invalid or expired token")
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// authorize
///
/// The pure role check. No claims means the request never passed the authenticator.
pub fn authorize(claims: Option<&Claims>, allowed: &[Role]) -> Result<(), ApiError> {
    let claims = claims.ok_or_else(|| ApiError::unauthenticated("Authentication required"))?;
    if allowed.contains(&claims.role) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Insufficient permissions"))
    }
}

/// require_roles
///
/// Middleware form of `authorize`, attached with `route_layer` so it runs before any body
/// extraction: a caller with the wrong role gets 403 whatever the payload looks like.
pub async fn require_roles(
    allowed: &'static [Role],
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(request.extensions().get::<Claims>(), allowed)?;
    Ok(next.run(request).await)
}

/// AuthUser
///
/// The resolved identity handed to handlers. Built from the `Claims` the authenticator
/// already verified, so extracting it never touches the token or the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i32,
    pub role: Role,
    pub email: String,
}

impl AuthUser {
    pub fn is(&self, role: Role) -> bool {
        self.role == role
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
            email: claims.email,
        }
    }
}

impl From<AuthUser> for TokenIdentity {
    fn from(user: AuthUser) -> Self {
        Self {
            id: user.id,
            role: user.role,
            email: user.email,
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Rejection: `Unauthenticated` (401) when the route was mounted without `authenticate`.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser::from)
            .ok_or_else(|| ApiError::unauthenticated("Authentication required"))
    }
}
