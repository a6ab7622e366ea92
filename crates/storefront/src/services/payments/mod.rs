//! Payment gateway clients.
//!
//! Gateways only decide whether money moved. A successful return hands a
//! payment reference to the checkout commit, which is idempotent on it.

pub mod paypal;
pub mod vnpay;

use thiserror::Error;

pub use paypal::PaypalClient;

/// Errors from talking to a payment gateway.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The gateway is not configured for this deployment.
    #[error("{0} payments are not configured")]
    NotConfigured(&'static str),

    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway answered with an error status or an unexpected body.
    #[error("{gateway} API error: {message}")]
    Api {
        gateway: &'static str,
        message: String,
    },

    /// The gateway reported the payment as not completed.
    #[error("{0}")]
    Declined(String),

    /// A return request failed signature verification.
    #[error("invalid payment signature")]
    InvalidSignature,

    /// The amount cannot be expressed in the gateway's currency.
    #[error("invalid payment amount")]
    InvalidAmount,

    /// The gateway charged a different amount than the checkout total.
    #[error("amount paid does not match the order total")]
    AmountMismatch,
}
