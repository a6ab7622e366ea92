//! Database scenario tests for Threadline.
//!
//! # Running Tests
//!
//! ```bash
//! # Pure tests
//! cargo test -p threadline-integration-tests
//!
//! # Database scenarios (each test gets a fresh migrated database)
//! DATABASE_URL=postgres://localhost/threadline cargo test -p threadline-integration-tests -- --ignored
//! ```
//!
//! This library holds the fixtures the scenarios share.

use rust_decimal::Decimal;
use sqlx::PgPool;

use threadline_core::cart::{Cart, CartLine};
use threadline_core::db::ledger::refresh_variant_stock;
use threadline_core::order::ContactInfo;
use threadline_core::{CustomerId, ItemId, LotId, SupplierId, VariantId};

/// Fixture setup failure.
pub type FixtureResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// A product with one variant and a supplier to receive lots from.
#[derive(Debug, Clone, Copy)]
pub struct Shelf {
    pub item_id: ItemId,
    pub variant_id: VariantId,
    pub supplier_id: SupplierId,
}

pub const ITEM_NAME: &str = "Linen Shirt";
pub const SIZE: &str = "M";
pub const COLOR: &str = "White";

/// Sell price of the fixture item.
#[must_use]
pub fn unit_price() -> Decimal {
    Decimal::from(350_000)
}

/// Create an item, its M/White variant and a supplier.
///
/// # Errors
///
/// Returns any database error.
pub async fn shelf(pool: &PgPool) -> FixtureResult<Shelf> {
    let item_id: i32 =
        sqlx::query_scalar("INSERT INTO shop.item (name, sell_price) VALUES ($1, $2) RETURNING id")
            .bind(ITEM_NAME)
            .bind(unit_price())
            .fetch_one(pool)
            .await?;
    let variant_id: i32 = sqlx::query_scalar(
        "INSERT INTO shop.product_variant (item_id, size, color) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(item_id)
    .bind(SIZE)
    .bind(COLOR)
    .fetch_one(pool)
    .await?;
    let supplier_id: i32 =
        sqlx::query_scalar("INSERT INTO shop.supplier (name) VALUES ('Saigon Textiles') RETURNING id")
            .fetch_one(pool)
            .await?;

    Ok(Shelf {
        item_id: ItemId::new(item_id),
        variant_id: VariantId::new(variant_id),
        supplier_id: SupplierId::new(supplier_id),
    })
}

/// Insert lots for the shelf's variant, in order, and refresh its cache.
///
/// # Errors
///
/// Returns any database error.
pub async fn stock(pool: &PgPool, shelf: &Shelf, quantities: &[i32]) -> FixtureResult<Vec<LotId>> {
    let mut ids = Vec::with_capacity(quantities.len());
    for quantity in quantities {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO shop.storage_lot (variant_id, supplier_id, quantity, import_cost)
             VALUES ($1, $2, $3, 150000) RETURNING id",
        )
        .bind(shelf.variant_id)
        .bind(shelf.supplier_id)
        .bind(quantity)
        .fetch_one(pool)
        .await?;
        ids.push(LotId::new(id));
    }
    refresh_variant_stock(pool, &[shelf.variant_id]).await?;
    Ok(ids)
}

/// Insert legacy lots keyed by the shelf's item rather than its variant.
///
/// # Errors
///
/// Returns any database error.
pub async fn legacy_stock(
    pool: &PgPool,
    shelf: &Shelf,
    quantities: &[i32],
) -> FixtureResult<Vec<LotId>> {
    let mut ids = Vec::with_capacity(quantities.len());
    for quantity in quantities {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO shop.storage_lot (item_id, supplier_id, quantity, import_cost)
             VALUES ($1, $2, $3, 150000) RETURNING id",
        )
        .bind(shelf.item_id)
        .bind(shelf.supplier_id)
        .bind(quantity)
        .fetch_one(pool)
        .await?;
        ids.push(LotId::new(id));
    }
    Ok(ids)
}

/// Quantities of the shelf item's legacy lots, oldest first.
///
/// # Errors
///
/// Returns any database error.
pub async fn legacy_lot_quantities(pool: &PgPool, shelf: &Shelf) -> FixtureResult<Vec<i32>> {
    Ok(sqlx::query_scalar(
        "SELECT quantity FROM shop.storage_lot
         WHERE variant_id IS NULL AND item_id = $1 ORDER BY id",
    )
    .bind(shelf.item_id)
    .fetch_all(pool)
    .await?)
}

/// A registered customer.
///
/// # Errors
///
/// Returns any database error.
pub async fn customer(pool: &PgPool, email: &str) -> FixtureResult<CustomerId> {
    let id: i32 = sqlx::query_scalar(
        "INSERT INTO shop.customer (email, name) VALUES ($1, 'Tran Thi Mai') RETURNING id",
    )
    .bind(email)
    .fetch_one(pool)
    .await?;
    Ok(CustomerId::new(id))
}

/// Quantities of the shelf's variant lots, oldest first.
///
/// # Errors
///
/// Returns any database error.
pub async fn lot_quantities(pool: &PgPool, shelf: &Shelf) -> FixtureResult<Vec<i32>> {
    Ok(sqlx::query_scalar("SELECT quantity FROM shop.storage_lot WHERE variant_id = $1 ORDER BY id")
        .bind(shelf.variant_id)
        .fetch_all(pool)
        .await?)
}

/// Cached stock on the variant row.
///
/// # Errors
///
/// Returns any database error.
pub async fn cached_stock(pool: &PgPool, shelf: &Shelf) -> FixtureResult<i64> {
    Ok(sqlx::query_scalar("SELECT stock_quantity FROM shop.product_variant WHERE id = $1")
        .bind(shelf.variant_id)
        .fetch_one(pool)
        .await?)
}

/// Row count of a table in the `shop` schema.
///
/// # Errors
///
/// Returns any database error.
pub async fn count_rows(pool: &PgPool, table: &str) -> FixtureResult<i64> {
    Ok(sqlx::query_scalar(&format!("SELECT COUNT(*) FROM shop.{table}"))
        .fetch_one(pool)
        .await?)
}

/// A cart holding `quantity` of the shelf's variant.
///
/// # Errors
///
/// Returns the cart error for a non-positive quantity.
pub fn cart(shelf: &Shelf, quantity: i32) -> FixtureResult<Cart> {
    let mut cart = Cart::new();
    cart.add(CartLine {
        variant_id: Some(shelf.variant_id),
        item_id: shelf.item_id,
        item_name: ITEM_NAME.to_string(),
        size: SIZE.to_string(),
        color: COLOR.to_string(),
        quantity,
        unit_price: unit_price(),
        // Checkout revalidates against the lots; the snapshot only gates adds.
        max_quantity: i64::from(i32::MAX),
        image: None,
    })?;
    Ok(cart)
}

/// A cart holding `quantity` of the shelf's item, sold without variants.
///
/// # Errors
///
/// Returns the cart error for a non-positive quantity.
pub fn legacy_cart(shelf: &Shelf, quantity: i32) -> FixtureResult<Cart> {
    let mut cart = Cart::new();
    cart.add(CartLine {
        variant_id: None,
        item_id: shelf.item_id,
        item_name: ITEM_NAME.to_string(),
        size: String::new(),
        color: String::new(),
        quantity,
        unit_price: unit_price(),
        max_quantity: i64::from(i32::MAX),
        image: None,
    })?;
    Ok(cart)
}

/// Valid shipping details.
#[must_use]
pub fn contact() -> ContactInfo {
    ContactInfo {
        recipient_name: "Tran Thi Mai".to_string(),
        phone: "0901234567".to_string(),
        shipping_address: "12 Ly Tu Trong, District 1, Ho Chi Minh City".to_string(),
    }
}
