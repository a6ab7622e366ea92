//! Checkout commit: order creation and stock deduction in one transaction.
//!
//! The sequence inside the transaction is:
//!
//! 1. Lock the payment reference and return the existing order if it was
//!    already used. A replay succeeds even after the cart was cleared.
//! 2. Lock every lot the cart draws from and validate against live sums.
//! 3. Apply the discount code, if any, and check the total against what the
//!    gateway charged.
//! 4. Insert the order and its lines.
//! 5. Deduct stock oldest lot first.
//! 6. Refresh the variant stock cache.
//!
//! Any error drops the transaction, which rolls back every step. The cart
//! is owned by the caller and is never touched here.

use std::collections::BTreeMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use super::{RepositoryError, discounts, ledger, orders};
use crate::cart::Cart;
use crate::inventory::{StockError, StockTarget, plan_deduction, validate};
use crate::order::{ContactInfo, order_total};
use crate::types::{CustomerId, DiscountError, OrderId, OrderStatus, PaymentMethod, VariantId};

/// Everything needed to turn a cart into an order.
#[derive(Debug, Clone)]
pub struct CheckoutRequest<'a> {
    pub cart: &'a Cart,
    pub customer_id: Option<CustomerId>,
    pub contact: ContactInfo,
    pub payment_method: PaymentMethod,
    /// Gateway transaction id. Makes the commit idempotent.
    pub payment_reference: Option<String>,
    pub discount_code: Option<String>,
    /// Amount the gateway charged. The commit fails unless the cart still
    /// totals exactly this.
    pub expected_total: Option<Decimal>,
}

/// A committed (or previously committed) order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub total: Decimal,
    /// `false` when the payment reference matched an existing order and
    /// nothing was written.
    pub created: bool,
}

/// Errors from [`place_order`].
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Empty cart, missing product, or not enough stock.
    #[error(transparent)]
    Stock(#[from] StockError),

    #[error(transparent)]
    Discount(#[from] DiscountError),

    /// Lots could not cover a line even though validation passed.
    #[error("stock for {target} ran out during checkout ({missing} short)")]
    Shortfall { target: StockTarget, missing: i32 },

    /// The cart changed after the gateway charged for it.
    #[error("order total {actual} does not match the {expected} charged")]
    AmountMismatch { expected: Decimal, actual: Decimal },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// Quantity per stock target, in target order (the lock order).
fn quantities_by_target(cart: &Cart) -> BTreeMap<StockTarget, i32> {
    let mut totals = BTreeMap::new();
    for line in cart.lines() {
        *totals.entry(line.target()).or_insert(0) += line.quantity;
    }
    totals
}

/// Commit a cart as an order.
///
/// # Errors
///
/// Returns `CheckoutError::Stock` for an empty cart or a failed validation,
/// `CheckoutError::Discount` for an unusable code,
/// `CheckoutError::AmountMismatch` if the total differs from
/// `expected_total`, `CheckoutError::Shortfall` if lots cannot cover a
/// validated line, and `CheckoutError::Repository` for database failures. The transaction is
/// rolled back in every error case.
pub async fn place_order(
    pool: &PgPool,
    request: &CheckoutRequest<'_>,
) -> Result<PlacedOrder, CheckoutError> {
    let cart = request.cart;
    let reference = request.payment_reference.as_deref();
    if reference.is_none() && cart.is_empty() {
        return Err(StockError::EmptyCart.into());
    }

    let mut tx = pool.begin().await?;

    if let Some(reference) = reference {
        orders::lock_payment_reference(&mut tx, reference).await?;
        if let Some(existing) = orders::find_by_payment_reference(&mut tx, reference).await? {
            tracing::info!(
                order_id = %existing.id,
                payment_reference = %reference,
                "Payment already recorded, returning existing order"
            );
            return Ok(PlacedOrder {
                order_id: existing.id,
                status: existing.status,
                total: existing.total,
                created: false,
            });
        }
    }

    if cart.is_empty() {
        return Err(StockError::EmptyCart.into());
    }

    // Binding validation under row locks
    let quantities = quantities_by_target(cart);
    let targets: Vec<StockTarget> = quantities.keys().copied().collect();
    let stock = ledger::lock_stock(&mut tx, &targets).await?;
    validate(&cart.stock_requests(), &stock.snapshot)?;

    let subtotal = cart.total();
    let (discount, discount_code) = match request.discount_code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => {
            let found = discounts::lock_code(&mut tx, code)
                .await?
                .ok_or_else(|| DiscountError::Unknown(code.to_string()))?;
            found.check(Utc::now())?;
            discounts::record_use(&mut tx, found.id).await?;
            (found.discount_for(subtotal), Some(found.code))
        }
        _ => (Decimal::ZERO, None),
    };
    let total = order_total(subtotal, discount);
    if let Some(expected) = request.expected_total
        && expected != total
    {
        tracing::warn!(
            expected = %expected,
            actual = %total,
            payment_reference = reference.unwrap_or(""),
            "Cart total differs from the amount charged"
        );
        return Err(CheckoutError::AmountMismatch {
            expected,
            actual: total,
        });
    }
    let status = request.payment_method.initial_status();

    let new_order = orders::NewOrder {
        customer_id: request.customer_id,
        status,
        payment_method: request.payment_method,
        payment_reference: request.payment_reference.as_deref(),
        subtotal,
        discount,
        discount_code: discount_code.as_deref(),
        total,
        contact: &request.contact,
    };
    let order = match orders::insert_order(&mut tx, &new_order).await {
        Ok(order) => order,
        Err(RepositoryError::Conflict(_)) if request.payment_reference.is_some() => {
            // A concurrent return for the same payment committed first
            drop(tx);
            return existing_for_reference(pool, request.payment_reference.as_deref()).await;
        }
        Err(e) => return Err(e.into()),
    };

    for line in cart.lines() {
        orders::insert_detail(&mut tx, order.id, line).await?;
    }

    for (target, quantity) in &quantities {
        let plan = plan_deduction(stock.lots(target), *quantity);
        if !plan.is_complete() {
            return Err(CheckoutError::Shortfall {
                target: *target,
                missing: plan.shortfall,
            });
        }
        ledger::apply_deductions(&mut tx, &plan.deductions).await?;
    }

    let variant_ids: Vec<VariantId> = targets.iter().filter_map(StockTarget::variant_id).collect();
    ledger::refresh_variant_stock(&mut *tx, &variant_ids).await?;

    tx.commit().await?;

    tracing::info!(
        order_id = %order.id,
        payment_method = %request.payment_method,
        total = %total,
        lines = cart.lines().len(),
        "Order placed"
    );

    Ok(PlacedOrder {
        order_id: order.id,
        status,
        total,
        created: true,
    })
}

async fn existing_for_reference(
    pool: &PgPool,
    reference: Option<&str>,
) -> Result<PlacedOrder, CheckoutError> {
    let mut conn = pool.acquire().await?;
    let existing = match reference {
        Some(reference) => orders::find_by_payment_reference(&mut conn, reference).await?,
        None => None,
    }
    .ok_or(RepositoryError::NotFound)?;

    Ok(PlacedOrder {
        order_id: existing.id,
        status: existing.status,
        total: existing.total,
        created: false,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::CartLine;
    use crate::types::ItemId;

    fn line(item: i32, variant: Option<i32>, size: &str, quantity: i32) -> CartLine {
        CartLine {
            variant_id: variant.map(VariantId::new),
            item_id: ItemId::new(item),
            item_name: format!("Item {item}"),
            size: size.to_string(),
            color: "Navy".to_string(),
            quantity,
            unit_price: Decimal::new(100_000, 0),
            max_quantity: 50,
            image: None,
        }
    }

    #[test]
    fn test_quantities_grouped_and_ordered_by_target() {
        let mut cart = Cart::new();
        cart.add(line(2, None, "", 1)).unwrap();
        cart.add(line(1, Some(20), "L", 2)).unwrap();
        cart.add(line(1, Some(10), "M", 3)).unwrap();

        let grouped: Vec<(StockTarget, i32)> = quantities_by_target(&cart).into_iter().collect();
        assert_eq!(
            grouped,
            vec![
                (StockTarget::Variant(VariantId::new(10)), 3),
                (StockTarget::Variant(VariantId::new(20)), 2),
                (StockTarget::LegacyItem(ItemId::new(2)), 1),
            ]
        );
    }

    #[test]
    fn test_shortfall_message_names_target() {
        let err = CheckoutError::Shortfall {
            target: StockTarget::Variant(VariantId::new(4)),
            missing: 2,
        };
        assert_eq!(
            err.to_string(),
            "stock for variant 4 ran out during checkout (2 short)"
        );
    }

    #[test]
    fn test_amount_mismatch_message() {
        let err = CheckoutError::AmountMismatch {
            expected: Decimal::from(350_000),
            actual: Decimal::from(1_750_000),
        };
        assert_eq!(
            err.to_string(),
            "order total 1750000 does not match the 350000 charged"
        );
    }

    #[test]
    fn test_empty_cart_error_is_stock_error() {
        let err: CheckoutError = StockError::EmptyCart.into();
        assert_eq!(err.to_string(), "cart empty");
    }
}
