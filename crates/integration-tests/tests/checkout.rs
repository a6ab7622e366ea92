//! Checkout commit against a real database.
//!
//! Requires `DATABASE_URL`; run with `--ignored`.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use sqlx::PgPool;

use threadline_core::cart::Cart;
use threadline_core::db::{CheckoutError, CheckoutRequest, OrderRepository, place_order};
use threadline_core::inventory::StockError;
use threadline_core::{OrderStatus, PaymentMethod, VariantId};

use threadline_integration_tests::{
    Shelf, cached_stock, cart, contact, count_rows, legacy_cart, legacy_lot_quantities,
    legacy_stock, lot_quantities, shelf, stock, unit_price,
};

fn request<'a>(cart: &'a Cart, method: PaymentMethod, reference: Option<&str>) -> CheckoutRequest<'a> {
    CheckoutRequest {
        cart,
        customer_id: None,
        contact: contact(),
        payment_method: method,
        payment_reference: reference.map(String::from),
        discount_code: None,
        expected_total: None,
    }
}

#[sqlx::test(migrations = "../core/migrations")]
#[ignore = "Requires DATABASE_URL"]
async fn test_checkout_drains_oldest_lot_first(pool: PgPool) {
    let shelf = shelf(&pool).await.unwrap();
    stock(&pool, &shelf, &[3, 5]).await.unwrap();
    let cart = cart(&shelf, 4).unwrap();

    let placed = place_order(&pool, &request(&cart, PaymentMethod::CashOnDelivery, None))
        .await
        .unwrap();

    assert!(placed.created);
    assert_eq!(placed.status, OrderStatus::Pending);
    assert_eq!(lot_quantities(&pool, &shelf).await.unwrap(), vec![0, 4]);
    assert_eq!(cached_stock(&pool, &shelf).await.unwrap(), 4);

    let order = OrderRepository::new(&pool)
        .get_with_details(placed.order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.details.len(), 1);
    assert_eq!(order.details[0].quantity, 4);
    assert_eq!(order.order.total, placed.total);
}

#[sqlx::test(migrations = "../core/migrations")]
#[ignore = "Requires DATABASE_URL"]
async fn test_empty_cart_writes_nothing(pool: PgPool) {
    let cart = Cart::new();

    let err = place_order(&pool, &request(&cart, PaymentMethod::CashOnDelivery, None))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Stock(StockError::EmptyCart)));
    assert_eq!(count_rows(&pool, "orders").await.unwrap(), 0);
    assert_eq!(count_rows(&pool, "order_detail").await.unwrap(), 0);
}

#[sqlx::test(migrations = "../core/migrations")]
#[ignore = "Requires DATABASE_URL"]
async fn test_insufficient_stock_rolls_back(pool: PgPool) {
    let shelf = shelf(&pool).await.unwrap();
    stock(&pool, &shelf, &[3]).await.unwrap();
    let cart = cart(&shelf, 5).unwrap();

    let err = place_order(&pool, &request(&cart, PaymentMethod::CashOnDelivery, None))
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Product 'Linen Shirt' (M/White) only has 3 left in stock"
    );
    assert_eq!(lot_quantities(&pool, &shelf).await.unwrap(), vec![3]);
    assert_eq!(count_rows(&pool, "orders").await.unwrap(), 0);
}

#[sqlx::test(migrations = "../core/migrations")]
#[ignore = "Requires DATABASE_URL"]
async fn test_payment_reference_is_idempotent(pool: PgPool) {
    let shelf = shelf(&pool).await.unwrap();
    stock(&pool, &shelf, &[10]).await.unwrap();
    let cart = cart(&shelf, 2).unwrap();
    let req = request(&cart, PaymentMethod::VnPay, Some("VNP-14022411"));

    let first = place_order(&pool, &req).await.unwrap();
    let replay = place_order(&pool, &req).await.unwrap();

    assert!(first.created);
    assert!(!replay.created);
    assert_eq!(first.order_id, replay.order_id);
    assert_eq!(first.status, OrderStatus::Paid);
    assert_eq!(count_rows(&pool, "orders").await.unwrap(), 1);
    assert_eq!(lot_quantities(&pool, &shelf).await.unwrap(), vec![8]);
}

#[sqlx::test(migrations = "../core/migrations")]
#[ignore = "Requires DATABASE_URL"]
async fn test_concurrent_checkouts_cannot_oversell(pool: PgPool) {
    let shelf = shelf(&pool).await.unwrap();
    stock(&pool, &shelf, &[10]).await.unwrap();

    let attempts = (0..2).map(|_| {
        let pool = pool.clone();
        tokio::spawn(async move {
            let cart = cart(&shelf, 6).unwrap();
            place_order(&pool, &request(&cart, PaymentMethod::CashOnDelivery, None)).await
        })
    });
    let mut results = Vec::new();
    for attempt in attempts.collect::<Vec<_>>() {
        results.push(attempt.await.unwrap());
    }

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(CheckoutError::Stock(StockError::Insufficient { available: 4, .. }))
    )));
    assert_eq!(lot_quantities(&pool, &shelf).await.unwrap(), vec![4]);
    assert_eq!(count_rows(&pool, "orders").await.unwrap(), 1);
}

#[sqlx::test(migrations = "../core/migrations")]
#[ignore = "Requires DATABASE_URL"]
async fn test_replay_after_cart_cleared_returns_existing_order(pool: PgPool) {
    let shelf = shelf(&pool).await.unwrap();
    stock(&pool, &shelf, &[10]).await.unwrap();
    let cart = cart(&shelf, 2).unwrap();
    let first = place_order(&pool, &request(&cart, PaymentMethod::VnPay, Some("VNP-14022412")))
        .await
        .unwrap();

    // The first commit emptied the session cart
    let cleared = Cart::new();
    let replay = place_order(
        &pool,
        &request(&cleared, PaymentMethod::VnPay, Some("VNP-14022412")),
    )
    .await
    .unwrap();

    assert!(!replay.created);
    assert_eq!(replay.order_id, first.order_id);
    assert_eq!(replay.total, first.total);
    assert_eq!(lot_quantities(&pool, &shelf).await.unwrap(), vec![8]);
}

#[sqlx::test(migrations = "../core/migrations")]
#[ignore = "Requires DATABASE_URL"]
async fn test_total_must_match_amount_charged(pool: PgPool) {
    let shelf = shelf(&pool).await.unwrap();
    stock(&pool, &shelf, &[5]).await.unwrap();
    // Paid for one unit, then the cart grew to five in another tab
    let cart = cart(&shelf, 5).unwrap();
    let mut req = request(&cart, PaymentMethod::PayPal, Some("PAYPAL-5O190127TN364715T"));
    req.expected_total = Some(unit_price());

    let err = place_order(&pool, &req).await.unwrap_err();

    match err {
        CheckoutError::AmountMismatch { expected, actual } => {
            assert_eq!(expected, unit_price());
            assert_eq!(actual, unit_price() * Decimal::from(5));
        }
        other => panic!("expected amount mismatch, got {other:?}"),
    }
    assert_eq!(lot_quantities(&pool, &shelf).await.unwrap(), vec![5]);
    assert_eq!(count_rows(&pool, "orders").await.unwrap(), 0);

    req.expected_total = Some(unit_price() * Decimal::from(5));
    let placed = place_order(&pool, &req).await.unwrap();
    assert_eq!(placed.status, OrderStatus::Paid);
    assert_eq!(lot_quantities(&pool, &shelf).await.unwrap(), vec![0]);
}

#[sqlx::test(migrations = "../core/migrations")]
#[ignore = "Requires DATABASE_URL"]
async fn test_concurrent_returns_for_one_payment_place_one_order(pool: PgPool) {
    let shelf = shelf(&pool).await.unwrap();
    stock(&pool, &shelf, &[10]).await.unwrap();

    let attempts = (0..2).map(|_| {
        let pool = pool.clone();
        tokio::spawn(async move {
            let cart = cart(&shelf, 6).unwrap();
            place_order(
                &pool,
                &request(&cart, PaymentMethod::PayPal, Some("PAYPAL-8AB51326")),
            )
            .await
        })
    });
    let mut placed = Vec::new();
    for attempt in attempts.collect::<Vec<_>>() {
        placed.push(attempt.await.unwrap().unwrap());
    }

    assert_eq!(placed.iter().filter(|p| p.created).count(), 1);
    assert_eq!(placed[0].order_id, placed[1].order_id);
    assert_eq!(lot_quantities(&pool, &shelf).await.unwrap(), vec![4]);
    assert_eq!(count_rows(&pool, "orders").await.unwrap(), 1);
}

#[sqlx::test(migrations = "../core/migrations")]
#[ignore = "Requires DATABASE_URL"]
async fn test_legacy_item_drains_item_lots(pool: PgPool) {
    let shelf = shelf(&pool).await.unwrap();
    legacy_stock(&pool, &shelf, &[2, 5]).await.unwrap();
    stock(&pool, &shelf, &[9]).await.unwrap();
    let cart = legacy_cart(&shelf, 4).unwrap();

    place_order(&pool, &request(&cart, PaymentMethod::CashOnDelivery, None))
        .await
        .unwrap();

    assert_eq!(legacy_lot_quantities(&pool, &shelf).await.unwrap(), vec![0, 3]);
    // Variant lots of the same item are not touched
    assert_eq!(lot_quantities(&pool, &shelf).await.unwrap(), vec![9]);
}

#[sqlx::test(migrations = "../core/migrations")]
#[ignore = "Requires DATABASE_URL"]
async fn test_legacy_item_is_checked_against_item_lots(pool: PgPool) {
    let shelf = shelf(&pool).await.unwrap();
    legacy_stock(&pool, &shelf, &[2]).await.unwrap();
    stock(&pool, &shelf, &[9]).await.unwrap();
    let cart = legacy_cart(&shelf, 3).unwrap();

    let err = place_order(&pool, &request(&cart, PaymentMethod::CashOnDelivery, None))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::Stock(StockError::Insufficient { available: 2, .. })
    ));
    assert_eq!(legacy_lot_quantities(&pool, &shelf).await.unwrap(), vec![2]);
}

#[sqlx::test(migrations = "../core/migrations")]
#[ignore = "Requires DATABASE_URL"]
async fn test_missing_product_fails_commit(pool: PgPool) {
    let shelf = shelf(&pool).await.unwrap();
    stock(&pool, &shelf, &[5]).await.unwrap();
    let gone = Shelf {
        variant_id: VariantId::new(shelf.variant_id.as_i32() + 1000),
        ..shelf
    };
    let cart = cart(&gone, 1).unwrap();

    let err = place_order(&pool, &request(&cart, PaymentMethod::CashOnDelivery, None))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::Stock(StockError::ProductNotFound { .. })
    ));
    assert_eq!(count_rows(&pool, "orders").await.unwrap(), 0);
    assert_eq!(lot_quantities(&pool, &shelf).await.unwrap(), vec![5]);
}
