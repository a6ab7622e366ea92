//! Read-only catalog queries.
//!
//! Listing uses the cached `stock_quantity`. Anything that bounds what a
//! customer may put in the cart sums the lots directly.

use rust_decimal::Decimal;
use sqlx::PgPool;

use threadline_core::{CategoryId, ItemId, VariantId};

use super::RepositoryError;
use crate::models::{
    ItemAvailability, ProductDetail, ProductSummary, VariantAvailability, VariantView,
};

/// Products per listing page.
pub const DEFAULT_PAGE_SIZE: i64 = 24;

/// Live stock of variant `v`, counting only positive lot balances.
const VARIANT_LIVE_STOCK: &str = r"
    COALESCE((SELECT SUM(GREATEST(l.quantity, 0))
              FROM shop.storage_lot l
              WHERE l.variant_id = v.id), 0)::BIGINT";

/// Live stock of item `i` from legacy item-keyed lots.
const LEGACY_LIVE_STOCK: &str = r"
    COALESCE((SELECT SUM(GREATEST(l.quantity, 0))
              FROM shop.storage_lot l
              WHERE l.variant_id IS NULL AND l.item_id = i.id), 0)::BIGINT";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductSummaryRow {
    id: i32,
    name: String,
    category_id: Option<i32>,
    category: Option<String>,
    cover_image: Option<String>,
    min_price: Decimal,
    max_price: Decimal,
    cached_stock: i64,
    legacy_stock: i64,
}

impl From<ProductSummaryRow> for ProductSummary {
    fn from(row: ProductSummaryRow) -> Self {
        Self {
            id: ItemId::new(row.id),
            name: row.name,
            category_id: row.category_id.map(CategoryId::new),
            category: row.category,
            cover_image: row.cover_image,
            min_price: row.min_price,
            max_price: row.max_price,
            in_stock: row.cached_stock > 0 || row.legacy_stock > 0,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: i32,
    name: String,
    category: Option<String>,
    cover_image: Option<String>,
    sell_price: Decimal,
    legacy_stock: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct VariantRow {
    id: i32,
    item_id: i32,
    item_name: String,
    size: String,
    color: String,
    price: Decimal,
    image: Option<String>,
    available: i64,
}

impl From<VariantRow> for VariantView {
    fn from(row: VariantRow) -> Self {
        Self {
            id: VariantId::new(row.id),
            size: row.size,
            color: row.color,
            price: row.price,
            image: row.image,
            available: row.available,
        }
    }
}

impl From<VariantRow> for VariantAvailability {
    fn from(row: VariantRow) -> Self {
        Self {
            variant_id: VariantId::new(row.id),
            item_id: ItemId::new(row.item_id),
            item_name: row.item_name,
            size: row.size,
            color: row.color,
            price: row.price,
            image: row.image,
            available: row.available,
        }
    }
}

/// Filters for the product listing.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category_id: Option<CategoryId>,
    /// Case-insensitive match on the product name.
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog reads.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List available products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<ProductSummary>, RepositoryError> {
        let sql = format!(
            r"
            SELECT i.id, i.name, i.category_id, c.name AS category, i.cover_image,
                   i.sell_price + COALESCE(MIN(v.price_modifier), 0) AS min_price,
                   i.sell_price + COALESCE(MAX(v.price_modifier), 0) AS max_price,
                   COALESCE(SUM(v.stock_quantity), 0)::BIGINT AS cached_stock,
                   {LEGACY_LIVE_STOCK} AS legacy_stock
            FROM shop.item i
            LEFT JOIN shop.category c ON c.id = i.category_id
            LEFT JOIN shop.product_variant v ON v.item_id = i.id
            WHERE i.is_available
              AND ($1::int IS NULL OR i.category_id = $1)
              AND ($2::text IS NULL OR i.name ILIKE '%' || $2 || '%')
            GROUP BY i.id, c.name
            ORDER BY i.created_at DESC, i.id DESC
            LIMIT $3 OFFSET $4
            "
        );

        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let rows = sqlx::query_as::<_, ProductSummaryRow>(&sql)
            .bind(filter.category_id)
            .bind(search)
            .bind(filter.limit.unwrap_or(DEFAULT_PAGE_SIZE))
            .bind(filter.offset.unwrap_or(0))
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Product page for an available item.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, item_id: ItemId) -> Result<Option<ProductDetail>, RepositoryError> {
        let sql = format!(
            r"
            SELECT i.id, i.name, c.name AS category, i.cover_image, i.sell_price,
                   {LEGACY_LIVE_STOCK} AS legacy_stock
            FROM shop.item i
            LEFT JOIN shop.category c ON c.id = i.category_id
            WHERE i.id = $1 AND i.is_available
            "
        );
        let Some(item) = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(item_id)
            .fetch_optional(self.pool)
            .await?
        else {
            return Ok(None);
        };

        let sql = format!(
            r"
            SELECT v.id, v.item_id, i.name AS item_name, v.size, v.color,
                   i.sell_price + v.price_modifier AS price,
                   COALESCE(v.image, i.cover_image) AS image,
                   {VARIANT_LIVE_STOCK} AS available
            FROM shop.product_variant v
            JOIN shop.item i ON i.id = v.item_id
            WHERE v.item_id = $1
            ORDER BY v.size, v.color, v.id
            "
        );
        let variants = sqlx::query_as::<_, VariantRow>(&sql)
            .bind(item_id)
            .fetch_all(self.pool)
            .await?;

        Ok(Some(ProductDetail::assemble(
            ItemId::new(item.id),
            item.name,
            item.category,
            item.cover_image,
            item.sell_price,
            variants.into_iter().map(Into::into).collect(),
            item.legacy_stock,
        )))
    }

    /// Look up a variant by size and color, with live stock.
    ///
    /// Size and color match case-insensitively after trimming.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_variant(
        &self,
        item_id: ItemId,
        size: &str,
        color: &str,
    ) -> Result<Option<VariantAvailability>, RepositoryError> {
        let sql = format!(
            r"
            SELECT v.id, v.item_id, i.name AS item_name, v.size, v.color,
                   i.sell_price + v.price_modifier AS price,
                   COALESCE(v.image, i.cover_image) AS image,
                   {VARIANT_LIVE_STOCK} AS available
            FROM shop.product_variant v
            JOIN shop.item i ON i.id = v.item_id
            WHERE v.item_id = $1
              AND i.is_available
              AND lower(v.size) = lower($2)
              AND lower(v.color) = lower($3)
            "
        );

        let row = sqlx::query_as::<_, VariantRow>(&sql)
            .bind(item_id)
            .bind(size.trim())
            .bind(color.trim())
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Look up an item sold without variants, with live legacy stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_legacy_item(
        &self,
        item_id: ItemId,
    ) -> Result<Option<ItemAvailability>, RepositoryError> {
        let sql = format!(
            r"
            SELECT i.id, i.name, NULL::text AS category, i.cover_image, i.sell_price,
                   {LEGACY_LIVE_STOCK} AS legacy_stock
            FROM shop.item i
            WHERE i.id = $1 AND i.is_available
            "
        );

        let row = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(item_id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(|r| ItemAvailability {
            item_id: ItemId::new(r.id),
            item_name: r.name,
            price: r.sell_price,
            image: r.cover_image,
            available: r.legacy_stock,
        }))
    }
}
