//! Unified error handling for admin.
//!
//! Error bodies are `{"error": "..."}`. Server errors are reported to Sentry
//! and never shown to the client in detail.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use threadline_core::db::{CancelError, StatusUpdateError};

use crate::db::RepositoryError;
use crate::models::ReceiptError;

/// Application-level error type for the admin API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Staff cancellation failed.
    #[error(transparent)]
    Cancel(#[from] CancelError),

    /// Order status change rejected.
    #[error(transparent)]
    StatusUpdate(#[from] StatusUpdateError),

    /// Lot receipt rejected before reaching the database.
    #[error(transparent)]
    Receipt(#[from] ReceiptError),

    /// Session store failure.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

const fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => repository_status(err),
            Self::Cancel(err) => match err {
                CancelError::NotFound => StatusCode::NOT_FOUND,
                CancelError::NotCancellable { .. } => StatusCode::CONFLICT,
                CancelError::MissingLot(_) => StatusCode::INTERNAL_SERVER_ERROR,
                CancelError::Repository(repo) => repository_status(repo),
            },
            Self::StatusUpdate(err) => match err {
                StatusUpdateError::NotFound => StatusCode::NOT_FOUND,
                StatusUpdateError::Transition(_) => StatusCode::CONFLICT,
                StatusUpdateError::RequiresCancellation => StatusCode::BAD_REQUEST,
                StatusUpdateError::Repository(repo) => repository_status(repo),
            },
            Self::Receipt(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the client.
    fn public_message(&self, status: StatusCode) -> String {
        if status.is_server_error() {
            return "Internal server error".to_string();
        }
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(msg)) => msg.clone(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::Unauthorized(msg) | Self::Forbidden(msg) | Self::BadRequest(msg) => msg.clone(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        let body = ErrorBody {
            error: self.public_message(status),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a staff ID.
pub fn set_sentry_user(staff_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(staff_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
mod tests {
    use threadline_core::OrderStatus;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Lot".to_string());
        assert_eq!(err.to_string(), "Not found: Lot");

        let err = AppError::BadRequest("quantity must be positive".to_string());
        assert_eq!(err.to_string(), "Bad request: quantity must be positive");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("x".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("x".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("x".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Internal("x".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_conflict_message_is_shown() {
        let err = AppError::Database(RepositoryError::Conflict(
            "Lot is referenced by existing orders".to_string(),
        ));
        let status = err.status();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            err.public_message(status),
            "Lot is referenced by existing orders"
        );
    }

    #[test]
    fn test_status_update_errors() {
        assert_eq!(
            get_status(AppError::StatusUpdate(
                StatusUpdateError::RequiresCancellation
            )),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::StatusUpdate(StatusUpdateError::NotFound)),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_cancel_of_paid_order_conflicts() {
        assert_eq!(
            get_status(AppError::Cancel(CancelError::NotCancellable {
                status: OrderStatus::Paid
            })),
            StatusCode::CONFLICT
        );
    }
}
