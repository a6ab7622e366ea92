//! Checkout route handlers.
//!
//! The preview is informational. Placing an order goes through
//! `place_order`, which locks the lots, validates, deducts and writes the
//! order in one transaction. The cart is cleared only after that commits.

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use threadline_core::cart::{Cart, CartLine};
use threadline_core::db::discounts::find_code;
use threadline_core::db::ledger::read_stock;
use threadline_core::db::{CheckoutRequest, PlacedOrder, place_order};
use threadline_core::inventory::{StockTarget, shortages};
use threadline_core::order::{ContactInfo, order_total};
use threadline_core::{CustomerId, DiscountError, OrderId, OrderStatus, PaymentMethod};

use crate::error::{AppError, Result, set_sentry_user};
use crate::middleware::OptionalAuth;
use crate::services::SessionCart;
use crate::state::AppState;

/// Cart totals with a discount code applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pricing {
    pub subtotal: Decimal,
    pub discount: Decimal,
    /// The code as the customer typed it, when one was given.
    pub discount_code: Option<String>,
    pub total: Decimal,
}

impl Pricing {
    /// Totals with no discount.
    #[must_use]
    pub fn undiscounted(cart: &Cart) -> Self {
        let subtotal = cart.total();
        Self {
            subtotal,
            discount: Decimal::ZERO,
            discount_code: None,
            total: subtotal,
        }
    }
}

/// Price `cart`, applying `code` if it is usable now.
///
/// The checkout commit re-checks the code under a row lock; this answer is
/// what the customer sees beforehand.
pub(crate) async fn price_cart(
    state: &AppState,
    cart: &Cart,
    code: Option<&str>,
) -> Result<Pricing> {
    let mut pricing = Pricing::undiscounted(cart);
    let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(pricing);
    };

    let found = find_code(state.pool(), code)
        .await?
        .ok_or_else(|| DiscountError::Unknown(code.to_string()))?;
    found.check(Utc::now())?;

    pricing.discount = found.discount_for(pricing.subtotal);
    pricing.discount_code = Some(code.to_string());
    pricing.total = order_total(pricing.subtotal, pricing.discount);
    Ok(pricing)
}

/// Response after an order is committed.
#[derive(Debug, Serialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub total: Decimal,
    /// `false` when the payment had already been recorded.
    pub created: bool,
}

impl OrderPlaced {
    #[must_use]
    pub const fn new(order: &PlacedOrder, payment_method: PaymentMethod) -> Self {
        Self {
            order_id: order.order_id,
            status: order.status,
            payment_method,
            total: order.total,
            created: order.created,
        }
    }
}

/// A payment a gateway has already taken.
#[derive(Debug, Clone)]
pub(crate) struct GatewayPayment {
    pub reference: String,
    /// Dong total the customer was charged.
    pub charged: Decimal,
}

/// Commit `cart` and empty it on success.
///
/// Used by every payment method; gateway returns pass their reference so a
/// replayed return finds the existing order.
pub(crate) async fn commit(
    state: &AppState,
    cart: &mut SessionCart,
    customer_id: Option<CustomerId>,
    contact: ContactInfo,
    payment_method: PaymentMethod,
    payment: Option<GatewayPayment>,
    discount_code: Option<String>,
) -> Result<OrderPlaced> {
    let (payment_reference, expected_total) = payment
        .map_or((None, None), |p| (Some(p.reference), Some(p.charged)));
    let request = CheckoutRequest {
        cart: cart.cart(),
        customer_id,
        contact,
        payment_method,
        payment_reference,
        discount_code,
        expected_total,
    };
    let placed = place_order(state.pool(), &request).await?;

    if let Some(id) = customer_id {
        set_sentry_user(&id, None);
    }
    tracing::info!(
        order_id = %placed.order_id,
        payment_method = %payment_method,
        total = %placed.total,
        created = placed.created,
        "Order placed"
    );

    cart.clear().await?;
    Ok(OrderPlaced::new(&placed, payment_method))
}

// =============================================================================
// Preview
// =============================================================================

/// Query parameters for the checkout preview.
#[derive(Debug, Default, Deserialize)]
pub struct PreviewQuery {
    pub discount_code: Option<String>,
}

/// What the customer is about to pay for.
#[derive(Debug, Serialize)]
pub struct CheckoutPreview {
    pub lines: Vec<CartLine>,
    #[serde(flatten)]
    pub pricing: Pricing,
    /// Why the discount code was not applied.
    pub discount_error: Option<String>,
    /// Lines that live stock cannot currently cover.
    pub stock_problems: Vec<String>,
}

/// Preview checkout totals and stock problems.
#[instrument(skip(state, cart))]
pub async fn preview(
    State(state): State<AppState>,
    cart: SessionCart,
    Query(query): Query<PreviewQuery>,
) -> Result<Json<CheckoutPreview>> {
    let cart = cart.cart();

    let (pricing, discount_error) =
        match price_cart(&state, cart, query.discount_code.as_deref()).await {
            Ok(pricing) => (pricing, None),
            Err(AppError::Discount(err)) => (Pricing::undiscounted(cart), Some(err.to_string())),
            Err(err) => return Err(err),
        };

    let requests = cart.stock_requests();
    let stock_problems = if requests.is_empty() {
        Vec::new()
    } else {
        let targets: Vec<StockTarget> = requests.iter().map(|r| r.target).collect();
        let view = read_stock(state.pool(), &targets).await?;
        shortages(&requests, &view.snapshot)
            .iter()
            .map(ToString::to_string)
            .collect()
    };

    Ok(Json(CheckoutPreview {
        lines: cart.lines().to_vec(),
        pricing,
        discount_error,
        stock_problems,
    }))
}

// =============================================================================
// Cash on delivery
// =============================================================================

/// Checkout form.
#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    #[serde(flatten)]
    pub contact: ContactInfo,
    pub discount_code: Option<String>,
}

impl CheckoutForm {
    /// Validated contact details and the trimmed discount code.
    pub(crate) fn into_parts(self) -> Result<(ContactInfo, Option<String>)> {
        let contact = self.contact.normalized()?;
        let code = self
            .discount_code
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        Ok((contact, code))
    }
}

/// Place a cash-on-delivery order. It starts out pending.
#[instrument(skip(state, cart, customer, form))]
pub async fn place_cod(
    State(state): State<AppState>,
    OptionalAuth(customer): OptionalAuth,
    mut cart: SessionCart,
    Json(form): Json<CheckoutForm>,
) -> Result<Json<OrderPlaced>> {
    let (contact, discount_code) = form.into_parts()?;

    let placed = commit(
        &state,
        &mut cart,
        customer.map(|c| c.id),
        contact,
        PaymentMethod::CashOnDelivery,
        None,
        discount_code,
    )
    .await?;

    Ok(Json(placed))
}
