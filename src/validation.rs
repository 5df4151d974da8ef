use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts, Path, Query, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::error::ApiError;

const BODY_ERROR: &str = "Validation error";
const QUERY_ERROR: &str = "Query validation error";

/// messages
///
/// Flattens every field violation into one message each, ordered by field name so the
/// response is stable regardless of hash ordering.
pub fn messages(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|(a, _), (b, _)| a.cmp(b));

    fields
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                error
                    .message
                    .as_ref()
                    .map(|msg| msg.to_string())
                    .unwrap_or_else(|| format!("{field} is invalid"))
            })
        })
        .collect()
}

fn json_rejection_message(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            "Missing 'Content-Type: application/json' header".to_string()
        }
        JsonRejection::JsonSyntaxError(_) => "Request body is not valid JSON".to_string(),
        // Wrong types and unknown enum values; serde's text names the field and the
        // accepted variants.
        other => other.body_text(),
    }
}

/// ValidatedJson
///
/// JSON body extractor that runs the `validator` rules after deserializing. Any failure
/// is a 400 `{"error": "Validation error", "details": [...]}` and the handler never runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                ApiError::validation(BODY_ERROR, vec![json_rejection_message(&rejection)])
            })?;

        value
            .validate()
            .map_err(|errors| ApiError::validation(BODY_ERROR, messages(&errors)))?;

        Ok(ValidatedJson(value))
    }
}

/// ValidatedQuery
///
/// Query-string counterpart of `ValidatedJson`. Numbers arrive as text and are coerced by
/// the deserializer; omitted parameters take their serde defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: QueryRejection| {
                ApiError::validation(QUERY_ERROR, vec![rejection.body_text()])
            })?;

        value
            .validate()
            .map_err(|errors| ApiError::validation(QUERY_ERROR, messages(&errors)))?;

        Ok(ValidatedQuery(value))
    }
}

/// ValidatedPath
///
/// Path parameter extractor. An id that does not parse (or overflows) is reported in the
/// usual error envelope instead of axum's plain-text rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: PathRejection| {
                tracing::debug!(%rejection, "path parameter rejected");
                ApiError::validation(BODY_ERROR, vec![rejection.body_text()])
            })?;

        Ok(ValidatedPath(value))
    }
}
