//! Unified error handling for the admin API.
//!
//! Every failure leaves the service as the same JSON envelope:
//!
//! ```json
//! { "success": false, "message": "...", "kind": "invalid_transition" }
//! ```

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use larder_core::EmailError;
use larder_core::catalog::CatalogError;
use larder_core::coupon::CouponError;
use larder_core::listing::ListError;
use larder_core::order::LifecycleError;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;

/// Application-level error type for the admin API.
#[derive(Debug, Error)]
pub enum AppError {
    /// No credential, or one that does not verify.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Credential verified but has expired.
    #[error("Session expired")]
    SessionExpired,

    /// Authenticated but lacking the required role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Order status change not allowed from the current status.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Coupon code not in the catalog.
    #[error("Unknown coupon: {0}")]
    UnknownCoupon(String),

    /// Request input failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A concurrent write won, or a uniqueness rule was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The store could not answer.
    #[error("Query failed: {0}")]
    QueryFailed(#[source] RepositoryError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error body sent to clients.
#[derive(Debug, Serialize)]
struct ErrorEnvelope<'a> {
    success: bool,
    message: String,
    kind: &'a str,
}

impl AppError {
    /// Stable machine-readable name for the error.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "unauthenticated",
            Self::SessionExpired => "session_expired",
            Self::Forbidden(_) => "forbidden",
            Self::InvalidTransition(_) => "invalid_transition",
            Self::UnknownCoupon(_) => "unknown_coupon",
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::QueryFailed(_) => "query_failed",
            Self::Internal(_) => "internal",
        }
    }

    /// HTTP status for the error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) | Self::SessionExpired => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::InvalidTransition(_) | Self::UnknownCoupon(_) | Self::Validation(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::QueryFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn is_server_error(&self) -> bool {
        matches!(self, Self::QueryFailed(_) | Self::Internal(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                kind = self.kind(),
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::QueryFailed(_) => "The store is temporarily unavailable".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            Self::Unauthenticated(msg)
            | Self::Forbidden(msg)
            | Self::InvalidTransition(msg)
            | Self::Validation(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg) => msg.clone(),
            Self::UnknownCoupon(code) => format!("Coupon {code} does not exist"),
            Self::SessionExpired => "Your session has expired, please sign in again".to_string(),
        };

        let body = ErrorEnvelope {
            success: false,
            message,
            kind: self.kind(),
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("Resource not found".to_string()),
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            RepositoryError::DataCorruption(msg) => Self::Internal(msg),
            err @ RepositoryError::Database(_) => Self::QueryFailed(err),
        }
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::InvalidTransition { .. } => Self::InvalidTransition(err.to_string()),
            LifecycleError::UnknownItem(_) => Self::NotFound(err.to_string()),
            _ => Self::Validation(err.to_string()),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<CouponError> for AppError {
    fn from(err: CouponError) -> Self {
        match err {
            CouponError::UnknownCoupon(code) => Self::UnknownCoupon(code),
        }
    }
}

impl From<ListError> for AppError {
    fn from(err: ListError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<EmailError> for AppError {
    fn from(err: EmailError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Expired => Self::SessionExpired,
            AuthError::Forbidden { .. } => Self::Forbidden(err.to_string()),
            AuthError::Signing(msg) => Self::Internal(msg),
            _ => Self::Unauthenticated(err.to_string()),
        }
    }
}

/// Set the Sentry user context from the authenticated user.
pub fn set_sentry_user(user_id: i32, username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: Some(username.to_string()),
            ..Default::default()
        }));
    });
}
