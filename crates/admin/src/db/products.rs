//! Database operations for products, categories and variant stock.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use threadline_core::{CategoryId, ItemId, VariantId};

use super::RepositoryError;
use crate::models::{NewProduct, Product, ProductFilter, ProductUpdate, VariantStock};

const PRODUCT_SELECT: &str = r"
    SELECT
        i.id, i.category_id, c.name AS category_name, i.name, i.sell_price,
        i.is_available, i.cover_image, i.created_at,
        COUNT(v.id) AS variant_count,
        COALESCE(SUM(v.stock_quantity), 0)::BIGINT AS cached_stock
    FROM shop.item i
    LEFT JOIN shop.category c ON c.id = i.category_id
    LEFT JOIN shop.product_variant v ON v.item_id = i.id";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    category_id: Option<i32>,
    category_name: Option<String>,
    name: String,
    sell_price: Decimal,
    is_available: bool,
    cover_image: Option<String>,
    created_at: DateTime<Utc>,
    variant_count: i64,
    cached_stock: i64,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ItemId::new(row.id),
            category_id: row.category_id.map(CategoryId::new),
            category_name: row.category_name,
            name: row.name,
            sell_price: row.sell_price,
            is_available: row.is_available,
            cover_image: row.cover_image,
            variant_count: row.variant_count,
            cached_stock: row.cached_stock,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VariantStockRow {
    id: i32,
    item_id: i32,
    size: String,
    color: String,
    price_modifier: Decimal,
    image: Option<String>,
    cached_stock: i64,
    stock_refreshed_at: Option<DateTime<Utc>>,
    live_stock: i64,
    lot_count: i64,
}

impl From<VariantStockRow> for VariantStock {
    fn from(row: VariantStockRow) -> Self {
        Self {
            id: VariantId::new(row.id),
            item_id: ItemId::new(row.item_id),
            size: row.size,
            color: row.color,
            price_modifier: row.price_modifier,
            image: row.image,
            cached_stock: row.cached_stock,
            stock_refreshed_at: row.stock_refreshed_at,
            live_stock: row.live_stock,
            lot_count: row.lot_count,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for back-office catalog operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every product, available or not, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let search = filter
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty());

        let sql = format!(
            r"
            {PRODUCT_SELECT}
            WHERE ($1::int IS NULL OR i.category_id = $1)
              AND ($2::text IS NULL OR i.name ILIKE '%' || $2 || '%')
            GROUP BY i.id, c.name
            ORDER BY i.name, i.id
            "
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(filter.category)
            .bind(search)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ItemId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("{PRODUCT_SELECT} WHERE i.id = $1 GROUP BY i.id, c.name");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Create a product with no variants.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the category does not exist,
    /// or `RepositoryError::Database` for other failures.
    pub async fn create(&self, product: &NewProduct) -> Result<ItemId, RepositoryError> {
        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO shop.item (category_id, name, sell_price, is_available, cover_image)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(product.category_id)
        .bind(product.name.trim())
        .bind(product.sell_price)
        .bind(product.is_available)
        .bind(&product.cover_image)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "Category does not exist"))?;

        tracing::info!(item_id = id, name = %product.name, "Product created");
        Ok(ItemId::new(id))
    }

    /// Change a product's price and availability.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist, or
    /// `RepositoryError::Database` if the query fails.
    pub async fn update(&self, id: ItemId, update: &ProductUpdate) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.item
            SET sell_price = COALESCE($2, sell_price),
                is_available = COALESCE($3, is_available)
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(update.sell_price)
        .bind(update.is_available)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// A product's variants with cached and live stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn variants(&self, item_id: ItemId) -> Result<Vec<VariantStock>, RepositoryError> {
        let rows = sqlx::query_as::<_, VariantStockRow>(
            r"
            SELECT
                v.id, v.item_id, v.size, v.color, v.price_modifier, v.image,
                v.stock_quantity AS cached_stock, v.stock_refreshed_at,
                COALESCE(SUM(GREATEST(l.quantity, 0)), 0)::BIGINT AS live_stock,
                COUNT(l.id) AS lot_count
            FROM shop.product_variant v
            LEFT JOIN shop.storage_lot l ON l.variant_id = v.id
            WHERE v.item_id = $1
            GROUP BY v.id
            ORDER BY v.size, v.color
            ",
        )
        .bind(item_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Live stock of the legacy lots keyed to the item itself.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn legacy_stock(&self, item_id: ItemId) -> Result<i64, RepositoryError> {
        let stock: i64 = sqlx::query_scalar(
            r"
            SELECT COALESCE(SUM(GREATEST(quantity, 0)), 0)::BIGINT
            FROM shop.storage_lot
            WHERE variant_id IS NULL AND item_id = $1
            ",
        )
        .bind(item_id)
        .fetch_one(self.pool)
        .await?;

        Ok(stock)
    }

    /// Id of the category called `name`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ensure_category(&self, name: &str) -> Result<CategoryId, RepositoryError> {
        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO shop.category (name) VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            ",
        )
        .bind(name.trim())
        .fetch_one(self.pool)
        .await?;

        Ok(CategoryId::new(id))
    }
}
