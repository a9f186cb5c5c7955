use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use uuid::Uuid;

use crate::shared::types::ApiResponse;

/// When set, internal and database errors carry their underlying message
/// in the response body. Only enabled for `APP_ENV=development`.
static EXPOSE_INTERNAL_ERRORS: AtomicBool = AtomicBool::new(false);

pub fn expose_internal_errors(enabled: bool) {
    EXPOSE_INTERNAL_ERRORS.store(enabled, Ordering::Relaxed);
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Products not found: {0:?}")]
    ProductsNotFound(Vec<Uuid>),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl AppError {
    /// Machine-readable error code sent alongside the message
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) | AppError::Internal(_) => "internal_error",
            AppError::NotFound(_) | AppError::ProductsNotFound(_) => "not_found",
            AppError::Validation(_) => "validation_error",
            AppError::BadRequest(_) => "bad_request",
            AppError::Auth(_) | AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::Conflict(_) => "conflict",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) | AppError::ProductsNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    /// Message and optional details as they appear in the response body
    fn public_parts(&self, expose_internal: bool) -> (String, Option<Vec<String>>) {
        match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                if expose_internal {
                    (format!("Database error occurred: {}", e), None)
                } else {
                    ("Database error occurred".to_string(), None)
                }
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                if expose_internal {
                    (format!("Internal server error: {}", msg), None)
                } else {
                    ("Internal server error".to_string(), None)
                }
            }
            AppError::Validation(msg) => (msg.clone(), Some(vec![msg.clone()])),
            AppError::ProductsNotFound(ids) => (
                format!("{} product(s) not found", ids.len()),
                Some(ids.iter().map(Uuid::to_string).collect()),
            ),
            AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Auth(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::Conflict(msg) => (msg.clone(), None),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, errors) = self.public_parts(EXPOSE_INTERNAL_ERRORS.load(Ordering::Relaxed));

        let body = Json(ApiResponse::<()>::error(
            Some(message),
            Some(self.code().to_string()),
            errors,
        ));

        (status, body).into_response()
    }
}

/// Convert database error to a more specific AppError with user-friendly messages
pub fn handle_db_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        // Unique constraint violation (PostgreSQL error code 23505)
        if db_err.code() == Some(std::borrow::Cow::Borrowed("23505")) {
            if let Some(constraint) = db_err.constraint() {
                if constraint.contains("slug") {
                    return AppError::Conflict(
                        "A category with this slug already exists".to_string(),
                    );
                }
            }
            return AppError::Conflict("Record already exists".to_string());
        }

        // Foreign key violation (PostgreSQL error code 23503)
        if db_err.code() == Some(std::borrow::Cow::Borrowed("23503")) {
            return AppError::BadRequest("Referenced record does not exist".to_string());
        }
    }

    AppError::Database(e)
}

pub type Result<T> = std::result::Result<T, AppError>;
