//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::{StorefrontConfig, VnpayConfig};
use crate::services::payments::{PaymentError, PaypalClient};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    paypal: Option<PaypalClient>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let paypal = config.paypal.clone().map(PaypalClient::new);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                paypal,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// PayPal client.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::NotConfigured` when PayPal is not set up.
    pub fn paypal(&self) -> Result<&PaypalClient, PaymentError> {
        self.inner
            .paypal
            .as_ref()
            .ok_or(PaymentError::NotConfigured("PayPal"))
    }

    /// VNPay merchant configuration.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::NotConfigured` when VNPay is not set up.
    pub fn vnpay(&self) -> Result<&VnpayConfig, PaymentError> {
        self.inner
            .config
            .vnpay
            .as_ref()
            .ok_or(PaymentError::NotConfigured("VNPay"))
    }
}
