//! Request Boundary
//!
//! Shared decode → validate → respond plumbing for the JSON endpoints.
//! A payload type only ever reaches a handler as the output of successful
//! validation, and collaborator failures are collapsed to generic messages
//! before they cross the boundary — the root cause is logged, never echoed.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

/// A single field-level violation, reported in wire (camelCase) form
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

/// Errors produced at the request boundary
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request body is not syntactically valid JSON
    #[error("decode error: {0}")]
    Decode(String),

    /// Payload failed schema validation
    #[error("validation failed")]
    Validation(Vec<Violation>),

    /// External collaborator call failed
    #[error("collaborator error: {cause}")]
    Collaborator { cause: String, public: String },

    /// Request rejected before reaching a collaborator
    #[error("bad request: {0}")]
    BadRequest(&'static str),

    /// Anything not anticipated
    #[error("unexpected error: {0}")]
    Unexpected(String),

    /// Collaborator not configured
    #[error("unavailable: {0}")]
    Unavailable(&'static str),
}

impl ApiError {
    /// Collaborator failure: `cause` is logged, `public` goes to the client
    pub fn collaborator(cause: impl Into<String>, public: impl Into<String>) -> Self {
        ApiError::Collaborator {
            cause: cause.into(),
            public: public.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(violations) => {
                tracing::warn!(?violations, "Request failed validation");
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": "Invalid request payload",
                        "details": violations,
                    })),
                )
                    .into_response()
            }

            ApiError::Decode(cause) => {
                tracing::warn!(%cause, "Failed to decode request body");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Malformed request body" })),
                )
                    .into_response()
            }

            ApiError::Collaborator { cause, public } => {
                tracing::error!(%cause, "Collaborator call failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": public })),
                )
                    .into_response()
            }

            ApiError::BadRequest(message) => {
                tracing::warn!(%message, "Rejected request");
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }

            ApiError::Unexpected(cause) => {
                tracing::error!(%cause, "Unexpected error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "An error occurred processing your request." })),
                )
                    .into_response()
            }

            ApiError::Unavailable(message) => {
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "error": message })),
                )
                    .into_response()
            }
        }
    }
}

/// JSON extractor enforcing the decode → validate pipeline
///
/// A syntactically malformed body is a decode failure; a missing or
/// mistyped field is a violation naming the offending field, like any
/// other schema violation.
#[derive(Clone, Debug)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        let value: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))?;

        let payload: T = serde_path_to_error::deserialize(value)
            .map_err(|e| ApiError::Validation(vec![data_violation(&e)]))?;

        payload
            .validate()
            .map_err(|e| ApiError::Validation(collect_violations(&e)))?;

        Ok(Self(payload))
    }
}

/// Violation for a structurally invalid (missing/mistyped) field
fn data_violation(err: &serde_path_to_error::Error<serde_json::Error>) -> Violation {
    let message = err.inner().to_string();
    let path = err.path().to_string();

    // Missing fields surface at the struct level with an empty path; the
    // field name is only present in serde's message.
    let path = if path == "." {
        field_from_message(&message).unwrap_or_default()
    } else {
        path
    };

    Violation { path, message }
}

/// Extract the field name from messages like "missing field `amount`"
fn field_from_message(message: &str) -> Option<String> {
    let start = message.find('`')? + 1;
    let end = message[start..].find('`')? + start;
    Some(message[start..end].to_string())
}

/// Flatten `ValidationErrors` into sorted wire-form violations
fn collect_violations(errors: &ValidationErrors) -> Vec<Violation> {
    let mut violations: Vec<Violation> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, field_errors)| {
            let path = wire_path(field);
            field_errors.iter().map(move |e| Violation {
                path: path.clone(),
                message: e
                    .message
                    .as_ref()
                    .map_or_else(|| e.code.to_string(), ToString::to_string),
            })
        })
        .collect();

    violations.sort_by(|a, b| a.path.cmp(&b.path));
    violations
}

/// Rust fields are snake_case; the API speaks camelCase
fn wire_path(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for c in field.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}
