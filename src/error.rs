use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::repository::RepositoryError;

/// ApiError
///
/// Every failure a handler, extractor or middleware can return. Each variant maps to one
/// HTTP status and renders the shared `{ "error": ..., "details"?: [...] }` envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No credential was presented (401).
    #[error("{0}")]
    Unauthenticated(String),

    /// A credential was presented but is invalid, expired, or lacks the needed role or
    /// ownership (403).
    #[error("{0}")]
    Forbidden(String),

    /// One message per violated field (400).
    #[error("{error}")]
    Validation {
        error: &'static str,
        details: Vec<String>,
    },

    #[error("{0}")]
    NotFound(String),

    /// Duplicate of a unique field, e.g. an already registered email (409).
    #[error("{0}")]
    Conflict(String),

    /// Collaborator failure. The source is logged but never rendered in production.
    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl ApiError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn validation(error: &'static str, details: Vec<String>) -> Self {
        Self::Validation { error, details }
    }

    pub fn internal<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self::Internal(err.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UniqueViolation(field) => {
                ApiError::conflict(format!("A record with this {field} already exists"))
            }
            other => ApiError::internal(other),
        }
    }
}

/// ErrorBody
///
/// The JSON error envelope returned by every failing route.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

/// InternalDetail
///
/// Response extension carrying the underlying cause of a 500. Only the development-mode
/// layer (`expose_internal_details`) ever copies it into a body.
#[derive(Debug, Clone)]
pub struct InternalDetail(pub String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Validation { error, details } => (
                status,
                Json(ErrorBody {
                    error: error.to_string(),
                    details: Some(details),
                }),
            )
                .into_response(),
            ApiError::Internal(source) => {
                tracing::error!(error = ?source, "request failed with an internal error");
                let mut response = (
                    status,
                    Json(ErrorBody {
                        error: "Internal server error".to_string(),
                        details: None,
                    }),
                )
                    .into_response();
                response
                    .extensions_mut()
                    .insert(InternalDetail(format!("{source:#}")));
                response
            }
            other => (
                status,
                Json(ErrorBody {
                    error: other.to_string(),
                    details: None,
                }),
            )
                .into_response(),
        }
    }
}

/// expose_internal_details
///
/// Response mapper installed only when `APP_ENV=local`: rewrites a 500 body to include
/// the cause recorded in `InternalDetail`.
pub async fn expose_internal_details(response: Response) -> Response {
    let Some(InternalDetail(detail)) = response.extensions().get::<InternalDetail>().cloned()
    else {
        return response;
    };

    (
        response.status(),
        Json(ErrorBody {
            error: "Internal server error".to_string(),
            details: Some(vec![detail]),
        }),
    )
        .into_response()
}
