//! Order cancellation and restock.
//!
//! Requires `DATABASE_URL`; run with `--ignored`.

#![allow(clippy::unwrap_used)]

use sqlx::PgPool;

use threadline_core::db::{
    CancelError, CheckoutRequest, OrderRepository, Requester, StatusUpdateError, cancel_order,
    place_order,
};
use threadline_core::{CustomerId, OrderId, OrderStatus, PaymentMethod, StaffId};

use threadline_integration_tests::{
    Shelf, cached_stock, cart, contact, count_rows, customer, legacy_cart, legacy_lot_quantities,
    legacy_stock, lot_quantities, shelf, stock,
};

async fn place(pool: &PgPool, shelf: &Shelf, quantity: i32, method: PaymentMethod) -> OrderId {
    let cart = cart(shelf, quantity).unwrap();
    let reference = (method != PaymentMethod::CashOnDelivery).then(|| "PAYID-7QX3".to_string());
    place_order(
        pool,
        &CheckoutRequest {
            cart: &cart,
            customer_id: None,
            contact: contact(),
            payment_method: method,
            payment_reference: reference,
            discount_code: None,
            expected_total: None,
        },
    )
    .await
    .unwrap()
    .order_id
}

#[sqlx::test(migrations = "../core/migrations")]
#[ignore = "Requires DATABASE_URL"]
async fn test_cancel_pending_restocks_first_lot(pool: PgPool) {
    let shelf = shelf(&pool).await.unwrap();
    stock(&pool, &shelf, &[3, 5]).await.unwrap();
    let order_id = place(&pool, &shelf, 4, PaymentMethod::CashOnDelivery).await;
    assert_eq!(lot_quantities(&pool, &shelf).await.unwrap(), vec![0, 4]);

    let cancelled = cancel_order(&pool, order_id, Requester::Staff(StaffId::new(1)))
        .await
        .unwrap();

    assert_eq!(cancelled.order_id, order_id);
    assert_eq!(cancelled.restocked.len(), 1);
    assert_eq!(cancelled.restocked[0].quantity, 4);
    // All returned units land on the lowest-id lot
    assert_eq!(lot_quantities(&pool, &shelf).await.unwrap(), vec![4, 4]);
    assert_eq!(cached_stock(&pool, &shelf).await.unwrap(), 8);
    assert_eq!(count_rows(&pool, "orders").await.unwrap(), 0);
    assert_eq!(count_rows(&pool, "order_detail").await.unwrap(), 0);
}

#[sqlx::test(migrations = "../core/migrations")]
#[ignore = "Requires DATABASE_URL"]
async fn test_cancel_adds_line_quantity_back(pool: PgPool) {
    let shelf = shelf(&pool).await.unwrap();
    stock(&pool, &shelf, &[10]).await.unwrap();
    let order_id = place(&pool, &shelf, 2, PaymentMethod::CashOnDelivery).await;
    assert_eq!(lot_quantities(&pool, &shelf).await.unwrap(), vec![8]);

    cancel_order(&pool, order_id, Requester::Staff(StaffId::new(1)))
        .await
        .unwrap();

    assert_eq!(lot_quantities(&pool, &shelf).await.unwrap(), vec![10]);
    assert_eq!(count_rows(&pool, "orders").await.unwrap(), 0);
}

#[sqlx::test(migrations = "../core/migrations")]
#[ignore = "Requires DATABASE_URL"]
async fn test_cancel_paid_order_changes_nothing(pool: PgPool) {
    let shelf = shelf(&pool).await.unwrap();
    stock(&pool, &shelf, &[10]).await.unwrap();
    let order_id = place(&pool, &shelf, 3, PaymentMethod::PayPal).await;

    let err = cancel_order(&pool, order_id, Requester::Staff(StaffId::new(1)))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CancelError::NotCancellable {
            status: OrderStatus::Paid
        }
    ));
    assert_eq!(lot_quantities(&pool, &shelf).await.unwrap(), vec![7]);
    assert_eq!(count_rows(&pool, "orders").await.unwrap(), 1);
    assert_eq!(count_rows(&pool, "order_detail").await.unwrap(), 1);
}

#[sqlx::test(migrations = "../core/migrations")]
#[ignore = "Requires DATABASE_URL"]
async fn test_customer_cannot_cancel_guest_order(pool: PgPool) {
    let shelf = shelf(&pool).await.unwrap();
    stock(&pool, &shelf, &[5]).await.unwrap();
    let order_id = place(&pool, &shelf, 1, PaymentMethod::CashOnDelivery).await;

    let err = cancel_order(&pool, order_id, Requester::Customer(CustomerId::new(1)))
        .await
        .unwrap_err();

    assert!(matches!(err, CancelError::NotFound));
    assert_eq!(lot_quantities(&pool, &shelf).await.unwrap(), vec![4]);
}

#[sqlx::test(migrations = "../core/migrations")]
#[ignore = "Requires DATABASE_URL"]
async fn test_status_change_to_cancelled_is_refused(pool: PgPool) {
    let shelf = shelf(&pool).await.unwrap();
    stock(&pool, &shelf, &[5]).await.unwrap();
    let order_id = place(&pool, &shelf, 1, PaymentMethod::CashOnDelivery).await;
    let repo = OrderRepository::new(&pool);

    let err = repo
        .update_status(order_id, OrderStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, StatusUpdateError::RequiresCancellation));

    let order = repo.update_status(order_id, OrderStatus::Processing).await.unwrap();
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(lot_quantities(&pool, &shelf).await.unwrap(), vec![4]);
}

#[sqlx::test(migrations = "../core/migrations")]
#[ignore = "Requires DATABASE_URL"]
async fn test_customer_cancels_own_pending_order(pool: PgPool) {
    let shelf = shelf(&pool).await.unwrap();
    stock(&pool, &shelf, &[5]).await.unwrap();
    let owner = customer(&pool, "mai@example.vn").await.unwrap();
    let cart = cart(&shelf, 2).unwrap();
    let placed = place_order(
        &pool,
        &CheckoutRequest {
            cart: &cart,
            customer_id: Some(owner),
            contact: contact(),
            payment_method: PaymentMethod::CashOnDelivery,
            payment_reference: None,
            discount_code: None,
            expected_total: None,
        },
    )
    .await
    .unwrap();

    let other = customer(&pool, "lan@example.vn").await.unwrap();
    let err = cancel_order(&pool, placed.order_id, Requester::Customer(other))
        .await
        .unwrap_err();
    assert!(matches!(err, CancelError::NotFound));

    let cancelled = cancel_order(&pool, placed.order_id, Requester::Customer(owner))
        .await
        .unwrap();

    assert_eq!(cancelled.order_id, placed.order_id);
    assert_eq!(lot_quantities(&pool, &shelf).await.unwrap(), vec![5]);
    assert_eq!(count_rows(&pool, "orders").await.unwrap(), 0);
}

#[sqlx::test(migrations = "../core/migrations")]
#[ignore = "Requires DATABASE_URL"]
async fn test_cancel_legacy_order_restocks_first_item_lot(pool: PgPool) {
    let shelf = shelf(&pool).await.unwrap();
    legacy_stock(&pool, &shelf, &[2, 5]).await.unwrap();
    let cart = legacy_cart(&shelf, 4).unwrap();
    let placed = place_order(
        &pool,
        &CheckoutRequest {
            cart: &cart,
            customer_id: None,
            contact: contact(),
            payment_method: PaymentMethod::CashOnDelivery,
            payment_reference: None,
            discount_code: None,
            expected_total: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(legacy_lot_quantities(&pool, &shelf).await.unwrap(), vec![0, 3]);

    cancel_order(&pool, placed.order_id, Requester::Staff(StaffId::new(1)))
        .await
        .unwrap();

    assert_eq!(legacy_lot_quantities(&pool, &shelf).await.unwrap(), vec![4, 3]);
    assert_eq!(count_rows(&pool, "order_detail").await.unwrap(), 0);
}

#[sqlx::test(migrations = "../core/migrations")]
#[ignore = "Requires DATABASE_URL"]
async fn test_cancel_without_lot_to_restock_fails(pool: PgPool) {
    let shelf = shelf(&pool).await.unwrap();
    stock(&pool, &shelf, &[3]).await.unwrap();
    let order_id = place(&pool, &shelf, 3, PaymentMethod::CashOnDelivery).await;
    sqlx::query("DELETE FROM shop.storage_lot")
        .execute(&pool)
        .await
        .unwrap();

    let err = cancel_order(&pool, order_id, Requester::Staff(StaffId::new(1)))
        .await
        .unwrap_err();

    assert!(matches!(err, CancelError::MissingLot(_)));
    assert_eq!(count_rows(&pool, "orders").await.unwrap(), 1);
    assert_eq!(count_rows(&pool, "order_detail").await.unwrap(), 1);
}
