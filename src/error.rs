//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::store::StoreError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Too many failed login attempts")]
    LoginLocked { retry_after_secs: i64 },

    #[error("Anti-forgery token missing or invalid")]
    CsrfMismatch,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Version conflict: concurrent modification detected")]
    VersionConflict,

    // Domain errors
    #[error(transparent)]
    Domain(#[from] crate::domain::DomainError),

    // Server errors (5xx)
    #[error("Storage error: {0}")]
    Store(StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConcurrencyConflict { .. } => AppError::VersionConflict,
            other => AppError::Store(other),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }

            // 401 Unauthorized
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated", None),
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "invalid_credentials", None)
            }

            // 403 Forbidden
            AppError::CsrfMismatch => (StatusCode::FORBIDDEN, "csrf_mismatch", None),
            AppError::PermissionDenied => (StatusCode::FORBIDDEN, "permission_denied", None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", Some(msg.clone())),

            // 409 Conflict
            AppError::VersionConflict => (StatusCode::CONFLICT, "version_conflict", None),

            // 429 Too Many Requests
            AppError::LoginLocked { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                "login_locked",
                Some(format!("retry after {} seconds", retry_after_secs)),
            ),

            // Domain errors - map to appropriate HTTP status
            AppError::Domain(ref domain_err) => {
                use crate::domain::DomainError;
                let details = Some(domain_err.to_string());
                match domain_err {
                    DomainError::InsufficientBalance { .. } => {
                        (StatusCode::BAD_REQUEST, "insufficient_balance", details)
                    }
                    DomainError::OutOfStock(_) => (StatusCode::CONFLICT, "out_of_stock", details),
                    DomainError::ProductUnavailable(_) => {
                        (StatusCode::CONFLICT, "product_unavailable", details)
                    }
                    DomainError::ProductNotFound(_) => {
                        (StatusCode::NOT_FOUND, "product_not_found", details)
                    }
                    DomainError::UserNotFound(_) => {
                        (StatusCode::NOT_FOUND, "user_not_found", details)
                    }
                    DomainError::UserInactive => (StatusCode::FORBIDDEN, "user_inactive", None),
                    DomainError::PromoNotFound(_) => {
                        (StatusCode::NOT_FOUND, "promo_not_found", details)
                    }
                    DomainError::PromoAlreadyExists(_) => {
                        (StatusCode::CONFLICT, "promo_already_exists", details)
                    }
                    DomainError::WithdrawalNotFound(_) => {
                        (StatusCode::NOT_FOUND, "withdrawal_not_found", details)
                    }
                    DomainError::WithdrawalAlreadySettled(_) => {
                        (StatusCode::CONFLICT, "withdrawal_already_settled", details)
                    }
                    DomainError::InvalidCard(_) => {
                        (StatusCode::BAD_REQUEST, "invalid_card", details)
                    }
                    DomainError::UsernameTaken(_) => {
                        (StatusCode::CONFLICT, "username_taken", details)
                    }
                    DomainError::EmailTaken(_) => (StatusCode::CONFLICT, "email_taken", details),
                    DomainError::Validation(_) => {
                        (StatusCode::BAD_REQUEST, "validation_failed", details)
                    }
                    DomainError::InvalidAmount(_) => {
                        (StatusCode::BAD_REQUEST, "invalid_amount", details)
                    }
                    DomainError::PermissionDenied(_) => {
                        (StatusCode::FORBIDDEN, "permission_denied", details)
                    }
                }
            }

            // 500 Internal Server Error
            AppError::Store(e) => {
                tracing::error!("Storage error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
