//! Payment gateway route handlers.
//!
//! Starting a gateway payment stores the contact details and discount code
//! in the session, then hands the customer a URL to redirect to. The return
//! handler commits the cart with the gateway's reference. A replayed return
//! finds the order placed the first time.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use threadline_core::{PaymentMethod, Price};

use super::checkout::{CheckoutForm, GatewayPayment, OrderPlaced, commit, price_cart};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::OptionalAuth;
use crate::models::{CheckoutInfo, session_keys};
use crate::services::SessionCart;
use crate::services::payments::{PaymentError, paypal, vnpay};
use crate::state::AppState;

/// Where to send the customer to pay.
#[derive(Debug, Serialize)]
pub struct PaymentRedirect {
    pub redirect_url: String,
}

/// Acknowledgement of an abandoned payment.
#[derive(Debug, Serialize)]
pub struct PaymentCancelled {
    pub message: &'static str,
}

/// Validate the form and cart and price the order.
async fn prepare(
    state: &AppState,
    cart: &SessionCart,
    form: CheckoutForm,
) -> Result<CheckoutInfo> {
    if cart.cart().is_empty() {
        return Err(AppError::BadRequest("Your cart is empty".to_string()));
    }
    let (contact, discount_code) = form.into_parts()?;
    let pricing = price_cart(state, cart.cart(), discount_code.as_deref()).await?;

    Ok(CheckoutInfo {
        contact,
        discount_code: pricing.discount_code,
        discount: pricing.discount,
        total: pricing.total,
        gateway_reference: None,
    })
}

async fn pending_checkout(session: &Session) -> Result<CheckoutInfo> {
    session
        .get::<CheckoutInfo>(session_keys::CHECKOUT_INFO)
        .await?
        .ok_or_else(|| AppError::BadRequest("No checkout in progress".to_string()))
}

async fn forget_checkout(session: &Session) -> Result<()> {
    session
        .remove::<CheckoutInfo>(session_keys::CHECKOUT_INFO)
        .await?;
    Ok(())
}

// =============================================================================
// PayPal
// =============================================================================

/// Start a PayPal payment.
#[instrument(skip(state, cart, form))]
pub async fn paypal_create(
    State(state): State<AppState>,
    cart: SessionCart,
    Json(form): Json<CheckoutForm>,
) -> Result<Json<PaymentRedirect>> {
    let client = state.paypal()?;
    let mut info = prepare(&state, &cart, form).await?;

    let amount = client.charge_amount(Price::vnd(info.total))?;
    let config = state.config();
    let created = client
        .create_order(
            amount,
            "Threadline order",
            &config.url_for("/checkout/paypal/success"),
            &config.url_for("/checkout/paypal/cancel"),
        )
        .await?;

    info.gateway_reference = Some(created.id.clone());
    cart.session()
        .insert(session_keys::CHECKOUT_INFO, &info)
        .await?;

    add_breadcrumb(
        "checkout",
        "PayPal order created",
        Some(&[("paypal_order_id", created.id.as_str())]),
    );

    Ok(Json(PaymentRedirect {
        redirect_url: created.approval_url,
    }))
}

/// Query parameters PayPal appends to the return URL.
#[derive(Debug, Deserialize)]
pub struct PaypalReturn {
    /// PayPal order id.
    pub token: String,
    #[serde(rename = "PayerID")]
    pub payer_id: Option<String>,
}

/// Capture an approved PayPal payment and place the order.
#[instrument(skip(state, customer, cart), fields(paypal_order_id = %query.token))]
pub async fn paypal_success(
    State(state): State<AppState>,
    OptionalAuth(customer): OptionalAuth,
    mut cart: SessionCart,
    Query(query): Query<PaypalReturn>,
) -> Result<Json<OrderPlaced>> {
    let client = state.paypal()?;

    let info = pending_checkout(cart.session()).await?;
    if info.gateway_reference.as_deref() != Some(query.token.as_str()) {
        return Err(AppError::BadRequest(
            "Payment does not match the checkout in progress".to_string(),
        ));
    }

    let capture = client.capture_order(&query.token).await?;
    if !capture.is_completed() {
        tracing::warn!(status = %capture.status, "PayPal capture not completed");
        return Err(PaymentError::Declined(format!(
            "PayPal payment was not completed ({})",
            capture.status
        ))
        .into());
    }

    let placed = commit(
        &state,
        &mut cart,
        customer.map(|c| c.id),
        info.contact,
        PaymentMethod::PayPal,
        Some(GatewayPayment {
            reference: paypal::payment_reference(&query.token),
            charged: info.total,
        }),
        info.discount_code,
    )
    .await?;
    forget_checkout(cart.session()).await?;

    Ok(Json(placed))
}

/// The customer backed out of PayPal. Nothing was charged or reserved.
#[instrument(skip(session))]
pub async fn paypal_cancel(session: Session) -> Result<Json<PaymentCancelled>> {
    forget_checkout(&session).await?;

    Ok(Json(PaymentCancelled {
        message: "Payment cancelled. Your cart has not changed.",
    }))
}

// =============================================================================
// VNPay
// =============================================================================

/// Client address as seen by the proxy, else loopback.
fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("127.0.0.1")
        .to_string()
}

/// Start a VNPay payment.
#[instrument(skip(state, cart, headers, form))]
pub async fn vnpay_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    cart: SessionCart,
    Json(form): Json<CheckoutForm>,
) -> Result<Json<PaymentRedirect>> {
    let config = state.vnpay()?;
    let mut info = prepare(&state, &cart, form).await?;

    let now = Utc::now();
    let txn_ref = now.timestamp_millis().to_string();
    let ip_addr = client_ip(&headers);
    let return_url = state.config().url_for(&config.return_path);
    let order_info = format!("Threadline order {txn_ref}");

    let redirect_url = vnpay::payment_url(
        config,
        &vnpay::PaymentRequest {
            amount: info.total,
            order_info: &order_info,
            txn_ref: &txn_ref,
            ip_addr: &ip_addr,
            return_url: &return_url,
            created_at: now,
        },
    )?;

    info.gateway_reference = Some(txn_ref);
    cart.session()
        .insert(session_keys::CHECKOUT_INFO, &info)
        .await?;

    Ok(Json(PaymentRedirect { redirect_url }))
}

/// Verify VNPay's signed return and place the order.
#[instrument(skip(state, customer, cart, params))]
pub async fn vnpay_return(
    State(state): State<AppState>,
    OptionalAuth(customer): OptionalAuth,
    mut cart: SessionCart,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<OrderPlaced>> {
    let config = state.vnpay()?;
    let outcome = vnpay::verify_return(config, &params)?;

    tracing::info!(
        response_code = %outcome.response_code,
        bank_code = outcome.bank_code.as_deref().unwrap_or(""),
        "VNPay return"
    );

    if !outcome.is_success() {
        forget_checkout(cart.session()).await?;
        return Err(PaymentError::Declined(outcome.message().to_string()).into());
    }

    let transaction_no = outcome
        .transaction_no
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("VNPay return has no transaction number".to_string()))?;

    let info = pending_checkout(cart.session()).await?;
    if info.gateway_reference != outcome.txn_ref {
        return Err(AppError::BadRequest(
            "Payment does not match the checkout in progress".to_string(),
        ));
    }
    if !outcome.charged(info.total) {
        tracing::warn!(
            amount = outcome.amount.as_deref().unwrap_or(""),
            total = %info.total,
            "VNPay amount does not match the checkout total"
        );
        return Err(PaymentError::AmountMismatch.into());
    }

    let placed = commit(
        &state,
        &mut cart,
        customer.map(|c| c.id),
        info.contact,
        PaymentMethod::VnPay,
        Some(GatewayPayment {
            reference: vnpay::payment_reference(transaction_no),
            charged: info.total,
        }),
        info.discount_code,
    )
    .await?;
    forget_checkout(cart.session()).await?;

    Ok(Json(placed))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_client_ip_uses_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.2"),
        );
        assert_eq!(client_ip(&headers), "203.0.113.7");
    }

    #[test]
    fn test_client_ip_defaults_to_loopback() {
        assert_eq!(client_ip(&HeaderMap::new()), "127.0.0.1");

        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(" "));
        assert_eq!(client_ip(&headers), "127.0.0.1");
    }

    #[test]
    fn test_paypal_return_query() {
        let query: PaypalReturn =
            serde_json::from_str(r#"{"token": "5O190127TN364715T", "PayerID": "FSMVU44LF3YUS"}"#)
                .unwrap();
        assert_eq!(query.token, "5O190127TN364715T");
        assert_eq!(query.payer_id.as_deref(), Some("FSMVU44LF3YUS"));
    }
}
