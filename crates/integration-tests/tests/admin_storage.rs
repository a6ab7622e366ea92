//! Back-office ledger operations: receiving, editing and deleting lots.
//!
//! Requires `DATABASE_URL`; run with `--ignored`.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use sqlx::PgPool;

use threadline_admin::db::{ProductRepository, RepositoryError, StorageRepository, SupplierRepository};
use threadline_admin::models::{BulkReceive, LotFilter, ReceiveLot, UpdateLot};
use threadline_core::PaymentMethod;
use threadline_core::db::{CheckoutRequest, place_order};

use threadline_integration_tests::{cached_stock, cart, contact, lot_quantities, shelf, stock};

#[sqlx::test(migrations = "../core/migrations")]
#[ignore = "Requires DATABASE_URL"]
async fn test_receive_creates_variant_and_refreshes_cache(pool: PgPool) {
    let shelf = shelf(&pool).await.unwrap();
    let repo = StorageRepository::new(&pool);

    let lot_id = repo
        .receive(&ReceiveLot {
            item_id: shelf.item_id,
            size: "L".to_string(),
            color: "Navy".to_string(),
            supplier_id: shelf.supplier_id,
            quantity: 12,
            import_cost: Decimal::from(160_000),
            import_date: None,
            sell_price: Some(Decimal::from(390_000)),
        })
        .await
        .unwrap();

    let lot = repo.get(lot_id).await.unwrap().unwrap();
    assert_eq!(lot.size.as_deref(), Some("L"));
    assert_eq!(lot.quantity, 12);

    let products = ProductRepository::new(&pool);
    let variants = products.variants(shelf.item_id).await.unwrap();
    let navy = variants.iter().find(|v| v.color == "Navy").unwrap();
    assert_eq!(navy.cached_stock, 12);
    assert_eq!(navy.live_stock, 12);

    let product = products.get(shelf.item_id).await.unwrap().unwrap();
    assert_eq!(product.sell_price, Decimal::from(390_000));
}

#[sqlx::test(migrations = "../core/migrations")]
#[ignore = "Requires DATABASE_URL"]
async fn test_bulk_receive_imports_every_combination(pool: PgPool) {
    let shelf = shelf(&pool).await.unwrap();
    let request = BulkReceive {
        item_id: shelf.item_id,
        supplier_id: shelf.supplier_id,
        sizes: "S, M".to_string(),
        colors: "White,Black".to_string(),
        quantity: 5,
        import_cost: Decimal::from(150_000),
        import_date: None,
    };

    let outcome = StorageRepository::new(&pool)
        .bulk_receive(&request.receipts().unwrap())
        .await;

    assert_eq!(outcome.imported, 4);
    assert!(outcome.errors.is_empty());
    // M/White already existed and received its lot
    assert_eq!(lot_quantities(&pool, &shelf).await.unwrap(), vec![5]);
    assert_eq!(cached_stock(&pool, &shelf).await.unwrap(), 5);
}

#[sqlx::test(migrations = "../core/migrations")]
#[ignore = "Requires DATABASE_URL"]
async fn test_edit_lot_refreshes_cache(pool: PgPool) {
    let shelf = shelf(&pool).await.unwrap();
    let lots = stock(&pool, &shelf, &[6]).await.unwrap();
    let repo = StorageRepository::new(&pool);
    let lot = repo.get(lots[0]).await.unwrap().unwrap();

    repo.update(
        lot.id,
        &UpdateLot {
            quantity: 9,
            import_cost: Decimal::from(140_000),
            import_date: lot.import_date,
            supplier_id: shelf.supplier_id,
        },
    )
    .await
    .unwrap();

    assert_eq!(cached_stock(&pool, &shelf).await.unwrap(), 9);
}

#[sqlx::test(migrations = "../core/migrations")]
#[ignore = "Requires DATABASE_URL"]
async fn test_delete_sold_lot_is_blocked(pool: PgPool) {
    let shelf = shelf(&pool).await.unwrap();
    let lots = stock(&pool, &shelf, &[5]).await.unwrap();
    let cart = cart(&shelf, 1).unwrap();
    place_order(
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

    let err = StorageRepository::new(&pool).delete(lots[0]).await.unwrap_err();

    assert!(matches!(err, RepositoryError::Conflict(_)));
    assert_eq!(lot_quantities(&pool, &shelf).await.unwrap(), vec![4]);
}

#[sqlx::test(migrations = "../core/migrations")]
#[ignore = "Requires DATABASE_URL"]
async fn test_delete_unsold_lot(pool: PgPool) {
    let shelf = shelf(&pool).await.unwrap();
    let lots = stock(&pool, &shelf, &[5, 3]).await.unwrap();

    StorageRepository::new(&pool).delete(lots[1]).await.unwrap();

    assert_eq!(lot_quantities(&pool, &shelf).await.unwrap(), vec![5]);
    assert_eq!(cached_stock(&pool, &shelf).await.unwrap(), 5);
}

#[sqlx::test(migrations = "../core/migrations")]
#[ignore = "Requires DATABASE_URL"]
async fn test_supplier_with_lots_cannot_be_deleted(pool: PgPool) {
    let shelf = shelf(&pool).await.unwrap();
    stock(&pool, &shelf, &[5]).await.unwrap();

    let err = SupplierRepository::new(&pool)
        .delete(shelf.supplier_id)
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::Conflict(_)));
}

#[sqlx::test(migrations = "../core/migrations")]
#[ignore = "Requires DATABASE_URL"]
async fn test_lot_page_totals_cover_whole_filter(pool: PgPool) {
    let shelf = shelf(&pool).await.unwrap();
    let quantities: Vec<i32> = (1..=20).collect();
    stock(&pool, &shelf, &quantities).await.unwrap();

    let page = StorageRepository::new(&pool)
        .list(&LotFilter::default())
        .await
        .unwrap();

    assert_eq!(page.lots.len(), 15);
    assert_eq!(page.total_lots, 20);
    assert_eq!(page.total_pages, 2);
    // 210 units at 150,000 each
    assert_eq!(page.total_cost, Decimal::from(210 * 150_000));
}
