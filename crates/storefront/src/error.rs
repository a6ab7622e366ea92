//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`; error bodies are `{"error": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use threadline_core::cart::CartError;
use threadline_core::db::{CancelError, CheckoutError};
use threadline_core::inventory::StockError;
use threadline_core::order::ContactError;
use threadline_core::DiscountError;

use crate::db::RepositoryError;
use crate::services::payments::PaymentError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Checkout commit failed.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// Cancellation failed.
    #[error(transparent)]
    Cancel(#[from] CancelError),

    /// Cart mutation rejected.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Informational stock check failed.
    #[error(transparent)]
    Stock(#[from] StockError),

    /// Discount code rejected.
    #[error(transparent)]
    Discount(#[from] DiscountError),

    /// Contact details rejected.
    #[error(transparent)]
    Contact(#[from] ContactError),

    /// Payment gateway failure or decline.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// Session store failure.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

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

const fn stock_status(err: &StockError) -> StatusCode {
    match err {
        StockError::EmptyCart => StatusCode::BAD_REQUEST,
        StockError::ProductNotFound { .. } | StockError::Insufficient { .. } => {
            StatusCode::CONFLICT
        }
    }
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
            Self::Checkout(err) => match err {
                CheckoutError::Stock(stock) => stock_status(stock),
                CheckoutError::Discount(_) => StatusCode::BAD_REQUEST,
                CheckoutError::Shortfall { .. } | CheckoutError::AmountMismatch { .. } => {
                    StatusCode::CONFLICT
                }
                CheckoutError::Repository(repo) => repository_status(repo),
            },
            Self::Cancel(err) => match err {
                CancelError::NotFound => StatusCode::NOT_FOUND,
                CancelError::NotCancellable { .. } => StatusCode::CONFLICT,
                CancelError::MissingLot(_) => StatusCode::INTERNAL_SERVER_ERROR,
                CancelError::Repository(repo) => repository_status(repo),
            },
            Self::Cart(err) => match err {
                CartError::InvalidQuantity => StatusCode::BAD_REQUEST,
                CartError::ExceedsAvailable { .. } => StatusCode::CONFLICT,
                CartError::LineNotFound => StatusCode::NOT_FOUND,
            },
            Self::Stock(err) => stock_status(err),
            Self::Discount(_) | Self::Contact(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Payment(err) => match err {
                PaymentError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
                PaymentError::Http(_) | PaymentError::Api { .. } => StatusCode::BAD_GATEWAY,
                PaymentError::Declined(_) => StatusCode::PAYMENT_REQUIRED,
                PaymentError::InvalidSignature | PaymentError::InvalidAmount => {
                    StatusCode::BAD_REQUEST
                }
                PaymentError::AmountMismatch => StatusCode::CONFLICT,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the client.
    fn public_message(&self, status: StatusCode) -> String {
        if status.is_server_error() {
            // Don't expose internal error details to clients
            return match status {
                StatusCode::BAD_GATEWAY => "Payment service error".to_string(),
                StatusCode::SERVICE_UNAVAILABLE => self.to_string(),
                _ => "Internal server error".to_string(),
            };
        }
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::Unauthorized(msg) | Self::BadRequest(msg) => msg.clone(),
            Self::Checkout(CheckoutError::Shortfall { .. }) => {
                "Stock changed while your order was being placed. Please try again.".to_string()
            }
            Self::Checkout(CheckoutError::AmountMismatch { .. })
            | Self::Payment(PaymentError::AmountMismatch) => {
                "Your cart changed after payment. Please contact us to complete your order."
                    .to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
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

/// Set the Sentry user context from a customer ID.
///
/// Call this when a signed-in customer places or cancels an order.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use threadline_core::inventory::StockTarget;
    use threadline_core::{OrderStatus, VariantId};

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_stock_errors_are_client_errors() {
        assert_eq!(
            get_status(AppError::Checkout(StockError::EmptyCart.into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Stock(StockError::Insufficient {
                label: "'Tee' (M/Black)".to_string(),
                available: 3,
                requested: 5,
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::Shortfall {
                target: StockTarget::Variant(VariantId::new(1)),
                missing: 1,
            })),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_cancel_errors() {
        assert_eq!(
            get_status(AppError::Cancel(CancelError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Cancel(CancelError::NotCancellable {
                status: OrderStatus::Paid
            })),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_cart_errors() {
        assert_eq!(
            get_status(AppError::Cart(CartError::InvalidQuantity)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Cart(CartError::LineNotFound)),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_payment_errors() {
        assert_eq!(
            get_status(AppError::Payment(PaymentError::NotConfigured("PayPal"))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(AppError::Payment(PaymentError::Declined(
                "Payment cancelled by customer".to_string()
            ))),
            StatusCode::PAYMENT_REQUIRED
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::Internal("pool exhausted at 10.0.0.3".to_string());
        let status = err.status();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(status), "Internal server error");
    }

    #[test]
    fn test_shortfall_details_are_hidden() {
        let err = AppError::Checkout(CheckoutError::Shortfall {
            target: StockTarget::Variant(VariantId::new(4)),
            missing: 2,
        });
        let status = err.status();
        assert_eq!(status, StatusCode::CONFLICT);
        let message = err.public_message(status);
        assert!(!message.contains("variant 4"));
        assert!(message.contains("try again"));
    }

    #[test]
    fn test_amount_mismatch_is_conflict() {
        let err = AppError::Checkout(CheckoutError::AmountMismatch {
            expected: rust_decimal::Decimal::from(350_000),
            actual: rust_decimal::Decimal::from(1_750_000),
        });
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert!(!err.public_message(err.status()).contains("1750000"));
        assert_eq!(
            get_status(AppError::Payment(PaymentError::AmountMismatch)),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_insufficient_stock_message_is_shown() {
        let err = AppError::Stock(StockError::Insufficient {
            label: "'Tee' (M/Black)".to_string(),
            available: 3,
            requested: 5,
        });
        let message = err.public_message(err.status());
        assert_eq!(message, "Product 'Tee' (M/Black) only has 3 left in stock");
    }
}
