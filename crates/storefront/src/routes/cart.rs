//! Cart route handlers.
//!
//! The cart lives in the visitor's session. Adding a line looks up live
//! stock and stores it on the line, which bounds later quantity changes.
//! Checkout validates against the lots again.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use threadline_core::ItemId;
use threadline_core::cart::{Cart, CartLine};
use threadline_core::db::ledger::read_stock;
use threadline_core::inventory::{StockTarget, shortages};

use crate::db::CatalogRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::services::SessionCart;
use crate::state::AppState;

/// Cart contents as returned by every cart endpoint.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub total: Decimal,
    pub item_count: i64,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            lines: cart.lines().to_vec(),
            total: cart.total(),
            item_count: cart.item_count(),
        }
    }
}

/// Item count for the header badge.
#[derive(Debug, Serialize)]
pub struct CartCount {
    pub count: i64,
}

/// Result of an informational stock check.
#[derive(Debug, Serialize)]
pub struct StockCheck {
    pub ok: bool,
    pub problems: Vec<String>,
}

/// Add a variant by size and color.
#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub item_id: i32,
    pub size: String,
    pub color: String,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

/// Add an item sold without variants.
#[derive(Debug, Deserialize)]
pub struct AddLegacyRequest {
    pub item_id: i32,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

/// Identifies a cart line.
#[derive(Debug, Deserialize)]
pub struct LineRequest {
    pub item_id: i32,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub color: String,
}

/// Set a line's quantity.
#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    #[serde(flatten)]
    pub line: LineRequest,
    pub quantity: i32,
}

const fn default_quantity() -> i32 {
    1
}

/// Show the cart.
#[instrument(skip(cart))]
pub async fn show(cart: SessionCart) -> Json<CartView> {
    Json(CartView::from(cart.cart()))
}

/// Add a variant to the cart.
#[instrument(skip(state, cart))]
pub async fn add(
    State(state): State<AppState>,
    mut cart: SessionCart,
    Json(request): Json<AddRequest>,
) -> Result<Json<CartView>> {
    let item_id = ItemId::new(request.item_id);
    let variant = CatalogRepository::new(state.pool())
        .find_variant(item_id, &request.size, &request.color)
        .await?
        .ok_or_else(|| AppError::NotFound("Variant".to_string()))?;

    let variant_id = variant.variant_id;
    let line = CartLine {
        variant_id: Some(variant_id),
        item_id: variant.item_id,
        item_name: variant.item_name,
        size: variant.size,
        color: variant.color,
        quantity: request.quantity,
        unit_price: variant.price,
        max_quantity: variant.available,
        image: variant.image,
    };
    cart.cart_mut().add(line)?;
    cart.save().await?;

    let variant_id = variant_id.to_string();
    add_breadcrumb("cart", "Added to cart", Some(&[("variant_id", variant_id.as_str())]));

    Ok(Json(CartView::from(cart.cart())))
}

/// Add an item sold without variants.
#[instrument(skip(state, cart))]
pub async fn add_legacy(
    State(state): State<AppState>,
    mut cart: SessionCart,
    Json(request): Json<AddLegacyRequest>,
) -> Result<Json<CartView>> {
    let item = CatalogRepository::new(state.pool())
        .find_legacy_item(ItemId::new(request.item_id))
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    let line = CartLine {
        variant_id: None,
        item_id: item.item_id,
        item_name: item.item_name,
        size: String::new(),
        color: String::new(),
        quantity: request.quantity,
        unit_price: item.price,
        max_quantity: item.available,
        image: item.image,
    };
    cart.cart_mut().add(line)?;
    cart.save().await?;

    Ok(Json(CartView::from(cart.cart())))
}

/// Set a line's quantity. Zero or less removes the line.
#[instrument(skip(cart))]
pub async fn update(
    mut cart: SessionCart,
    Json(request): Json<UpdateRequest>,
) -> Result<Json<CartView>> {
    let line = &request.line;
    cart.cart_mut().update(
        ItemId::new(line.item_id),
        &line.size,
        &line.color,
        request.quantity,
    )?;
    cart.save().await?;

    Ok(Json(CartView::from(cart.cart())))
}

/// Remove a line. Removing a line that is not there is not an error.
#[instrument(skip(cart))]
pub async fn remove(
    mut cart: SessionCart,
    Json(request): Json<LineRequest>,
) -> Result<Json<CartView>> {
    if cart
        .cart_mut()
        .remove(ItemId::new(request.item_id), &request.size, &request.color)
    {
        cart.save().await?;
    }

    Ok(Json(CartView::from(cart.cart())))
}

/// Empty the cart.
#[instrument(skip(cart))]
pub async fn clear(mut cart: SessionCart) -> Result<Json<CartView>> {
    cart.clear().await?;
    Ok(Json(CartView::from(cart.cart())))
}

/// Item count for the header badge.
#[instrument(skip(cart))]
pub async fn count(cart: SessionCart) -> Json<CartCount> {
    Json(CartCount {
        count: cart.cart().item_count(),
    })
}

/// Check every line against live stock without locking anything.
///
/// The answer can be stale by the time the customer checks out.
#[instrument(skip(state, cart))]
pub async fn check_stock(
    State(state): State<AppState>,
    cart: SessionCart,
) -> Result<Json<StockCheck>> {
    let requests = cart.cart().stock_requests();
    if requests.is_empty() {
        return Ok(Json(StockCheck {
            ok: true,
            problems: Vec::new(),
        }));
    }

    let targets: Vec<StockTarget> = requests.iter().map(|r| r.target).collect();
    let view = read_stock(state.pool(), &targets).await?;
    let problems: Vec<String> = shortages(&requests, &view.snapshot)
        .iter()
        .map(ToString::to_string)
        .collect();

    Ok(Json(StockCheck {
        ok: problems.is_empty(),
        problems,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use threadline_core::VariantId;

    use super::*;

    fn line(variant: i32, quantity: i32, price: i64) -> CartLine {
        CartLine {
            variant_id: Some(VariantId::new(variant)),
            item_id: ItemId::new(1),
            item_name: "Oxford Shirt".to_string(),
            size: format!("S{variant}"),
            color: "White".to_string(),
            quantity,
            unit_price: Decimal::from(price),
            max_quantity: 10,
            image: None,
        }
    }

    #[test]
    fn test_cart_view_totals() {
        let mut cart = Cart::new();
        cart.add(line(1, 2, 150_000)).unwrap();
        cart.add(line(2, 1, 180_000)).unwrap();

        let view = CartView::from(&cart);
        assert_eq!(view.lines.len(), 2);
        assert_eq!(view.item_count, 3);
        assert_eq!(view.total, Decimal::from(480_000));
    }

    #[test]
    fn test_add_request_defaults_quantity() {
        let request: AddRequest =
            serde_json::from_str(r#"{"item_id": 4, "size": "M", "color": "Black"}"#).unwrap();
        assert_eq!(request.quantity, 1);
    }

    #[test]
    fn test_update_request_flattens_line() {
        let request: UpdateRequest =
            serde_json::from_str(r#"{"item_id": 4, "size": "M", "color": "Black", "quantity": 0}"#)
                .unwrap();
        assert_eq!(request.line.item_id, 4);
        assert_eq!(request.line.size, "M");
        assert_eq!(request.quantity, 0);
    }

    #[test]
    fn test_legacy_line_request_without_size() {
        let request: LineRequest = serde_json::from_str(r#"{"item_id": 9}"#).unwrap();
        assert!(request.size.is_empty());
        assert!(request.color.is_empty());
    }
}
