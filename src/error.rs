use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Duplicate registration: {0}")]
    DuplicateRegistration(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Gateway error ({status}): {message}")]
    Gateway { status: u16, message: String },

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Database(ref msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Database error occurred" }),
                )
            }
            AppError::NotFound(ref msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::DuplicateRegistration(ref msg) => {
                (StatusCode::BAD_REQUEST, json!({ "error": msg }))
            }
            AppError::InvalidSignature(ref msg) => {
                tracing::warn!("Rejected webhook: {}", msg);
                (StatusCode::UNAUTHORIZED, json!({ "error": msg }))
            }
            AppError::Gateway { status, ref message } => {
                tracing::error!("Gateway error ({}): {}", status, message);
                (
                    StatusCode::BAD_GATEWAY,
                    json!({ "error": message, "gateway_status": status }),
                )
            }
            AppError::Cache(ref msg) => {
                tracing::error!("Cache error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Cache error occurred" }),
                )
            }
            AppError::Validation(ref msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, json!({ "error": msg }))
            }
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::Cache(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16()).unwrap_or(502);
        AppError::Gateway {
            status,
            message: err.to_string(),
        }
    }
}
