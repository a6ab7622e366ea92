//! PayPal Orders v2 client.
//!
//! Every call fetches a fresh client-credentials token; checkout volume does
//! not justify caching it.

use std::sync::Arc;

use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use threadline_core::{CurrencyCode, Price};
use tracing::{debug, instrument};

use super::PaymentError;
use crate::config::PaypalConfig;

const GATEWAY: &str = "PayPal";

/// Prefix of the payment reference stored on PayPal orders.
pub const REFERENCE_PREFIX: &str = "PAYPAL-";

/// Payment reference for a captured PayPal order.
#[must_use]
pub fn payment_reference(paypal_order_id: &str) -> String {
    format!("{REFERENCE_PREFIX}{paypal_order_id}")
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    intent: &'static str,
    purchase_units: [PurchaseUnit<'a>; 1],
    application_context: ApplicationContext<'a>,
}

#[derive(Debug, Serialize)]
struct PurchaseUnit<'a> {
    amount: Amount,
    description: &'a str,
}

#[derive(Debug, Serialize)]
struct Amount {
    currency_code: &'static str,
    value: String,
}

#[derive(Debug, Serialize)]
struct ApplicationContext<'a> {
    return_url: &'a str,
    cancel_url: &'a str,
    user_action: &'static str,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    status: String,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
    rel: String,
}

/// A PayPal order awaiting buyer approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedOrder {
    pub id: String,
    /// Where to send the buyer to approve the payment.
    pub approval_url: String,
}

/// Result of a capture call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub id: String,
    pub status: String,
}

impl Capture {
    /// Whether the funds were captured.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == "COMPLETED"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// PayPal REST client.
#[derive(Clone)]
pub struct PaypalClient {
    inner: Arc<PaypalClientInner>,
}

struct PaypalClientInner {
    client: reqwest::Client,
    config: PaypalConfig,
}

impl std::fmt::Debug for PaypalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaypalClient")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl PaypalClient {
    /// Create a new PayPal client.
    #[must_use]
    pub fn new(config: PaypalConfig) -> Self {
        Self {
            inner: Arc::new(PaypalClientInner {
                client: reqwest::Client::new(),
                config,
            }),
        }
    }

    /// Convert a dong total to the dollar amount charged through PayPal.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidAmount` if the converted amount is not
    /// positive.
    pub fn charge_amount(&self, total: Price) -> Result<Price, PaymentError> {
        let usd = total
            .to_usd(self.inner.config.vnd_per_usd)
            .ok_or(PaymentError::InvalidAmount)?;
        if usd.amount.is_sign_negative() || usd.amount.is_zero() {
            return Err(PaymentError::InvalidAmount);
        }
        Ok(usd)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.config.api_base)
    }

    async fn access_token(&self) -> Result<String, PaymentError> {
        let response = self
            .inner
            .client
            .post(self.url("/v1/oauth2/token"))
            .basic_auth(
                &self.inner.config.client_id,
                Some(self.inner.config.client_secret.expose_secret()),
            )
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PaymentError::Api {
                gateway: GATEWAY,
                message: format!("token request failed ({status}): {text}"),
            });
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    /// Create an order for `amount` (must be in dollars).
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidAmount` for a non-dollar amount,
    /// `PaymentError::Api` if PayPal rejects the order or returns no approval
    /// link, and `PaymentError::Http` for transport failures.
    #[instrument(skip(self), fields(amount = %amount))]
    pub async fn create_order(
        &self,
        amount: Price,
        description: &str,
        return_url: &str,
        cancel_url: &str,
    ) -> Result<CreatedOrder, PaymentError> {
        if amount.currency_code != CurrencyCode::USD {
            return Err(PaymentError::InvalidAmount);
        }

        let token = self.access_token().await?;
        let body = CreateOrderRequest {
            intent: "CAPTURE",
            purchase_units: [PurchaseUnit {
                amount: Amount {
                    currency_code: CurrencyCode::USD.as_str(),
                    value: amount.gateway_amount(),
                },
                description,
            }],
            application_context: ApplicationContext {
                return_url,
                cancel_url,
                user_action: "PAY_NOW",
            },
        };

        let response = self
            .inner
            .client
            .post(self.url("/v2/checkout/orders"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PaymentError::Api {
                gateway: GATEWAY,
                message: format!("create order failed ({status}): {text}"),
            });
        }

        let order: OrderResponse = response.json().await?;
        let approval_url = approval_link(&order.links).ok_or_else(|| PaymentError::Api {
            gateway: GATEWAY,
            message: format!("order {} has no approval link", order.id),
        })?;

        debug!(paypal_order_id = %order.id, status = %order.status, "PayPal order created");

        Ok(CreatedOrder {
            id: order.id,
            approval_url,
        })
    }

    /// Capture an approved order.
    ///
    /// A non-completed capture is returned as-is; the caller decides whether
    /// to treat it as a decline.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Api` if PayPal rejects the capture, and
    /// `PaymentError::Http` for transport failures.
    #[instrument(skip(self))]
    pub async fn capture_order(&self, paypal_order_id: &str) -> Result<Capture, PaymentError> {
        let token = self.access_token().await?;

        let response = self
            .inner
            .client
            .post(self.url(&format!("/v2/checkout/orders/{paypal_order_id}/capture")))
            .bearer_auth(token)
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({}))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PaymentError::Api {
                gateway: GATEWAY,
                message: format!("capture failed ({status}): {text}"),
            });
        }

        let order: OrderResponse = response.json().await?;
        Ok(Capture {
            id: order.id,
            status: order.status,
        })
    }
}

/// The link the buyer follows to approve an order.
fn approval_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_str(), "approve" | "payer-action"))
        .map(|l| l.href.clone())
}
