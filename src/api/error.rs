use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use super::validation::ValidationErrors;
use crate::services::{AuthError, GeodataError};

#[derive(Debug)]
pub enum ApiError {
    /// 404 with an empty body.
    NotFound(String),

    /// 409 with the field messages as body.
    Validation(ValidationErrors),

    /// 409 with an empty JSON object.
    Conflict(String),

    BadRequest(String),

    Unauthorized(String),

    DatabaseError(String),

    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Validation(errors) => {
                let fields: Vec<&str> = errors.keys().map(String::as_str).collect();
                write!(f, "Validation failed for: {}", fields.join(", "))
            }
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::NotFound(msg) => {
                tracing::debug!("Not found: {}", msg);
                return StatusCode::NOT_FOUND.into_response();
            }
            ApiError::Validation(errors) => {
                return (StatusCode::CONFLICT, Json(errors)).into_response();
            }
            ApiError::Conflict(msg) => {
                tracing::debug!("Conflict: {}", msg);
                return (StatusCode::CONFLICT, Json(serde_json::json!({}))).into_response();
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ApiResponse::<()>::error(error_message);
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<GeodataError> for ApiError {
    fn from(err: GeodataError) -> Self {
        match err {
            GeodataError::NotFound(_) | GeodataError::SearchNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            GeodataError::UnknownService(_) => {
                ApiError::field_error("datatype", "The selected datatype is invalid.")
            }
            GeodataError::ParseFailed(url) => {
                ApiError::Conflict(format!("Unreadable metadata at {url}"))
            }
            GeodataError::SaveFailed(what) => ApiError::Conflict(format!("Could not store {what}")),
            GeodataError::Database(msg) => ApiError::DatabaseError(msg),
            GeodataError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::Unauthorized(err.to_string()),
            AuthError::NameTaken => {
                ApiError::field_error("name", "The name has already been taken.")
            }
            AuthError::Validation(msg) => ApiError::BadRequest(msg),
            AuthError::Database(msg) => ApiError::DatabaseError(msg),
            AuthError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl ApiError {
    /// A validation conflict for a single field.
    pub fn field_error(field: &str, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        ApiError::Validation(errors)
    }

    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        ApiError::NotFound(format!("{} {} not found", resource, id))
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::InternalError(msg.into())
    }
}
