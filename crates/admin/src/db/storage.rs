//! Database operations for storage lots.
//!
//! Every mutation runs in one transaction with the refresh of the cached
//! `stock_quantity` of the variant it touched, so the cache never lags a
//! committed lot change made here.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use threadline_core::db::ledger::refresh_variant_stock;
use threadline_core::{ItemId, LotId, SupplierId, VariantId};

use super::RepositoryError;
use crate::models::storage::{LOTS_PER_PAGE, LOW_STOCK_THRESHOLD, page_count};
use crate::models::{BulkReceipt, Lot, LotFilter, LotPage, ReceiveLot, UpdateLot};

/// Lot columns with the names of the variant, item, category and supplier.
///
/// Legacy lots have no variant, so the item is resolved through either key.
const LOT_SELECT: &str = r"
    SELECT
        l.id, l.variant_id, i.id AS item_id, i.name AS item_name,
        c.name AS category_name, v.size, v.color,
        l.supplier_id, s.name AS supplier_name,
        l.quantity, l.import_cost, l.import_date, l.created_at
    FROM shop.storage_lot l
    LEFT JOIN shop.product_variant v ON v.id = l.variant_id
    JOIN shop.item i ON i.id = COALESCE(v.item_id, l.item_id)
    LEFT JOIN shop.category c ON c.id = i.category_id
    JOIN shop.supplier s ON s.id = l.supplier_id";

/// Shared by the page query and the totals query.
const LOT_FILTER: &str = r"
    WHERE ($1::text IS NULL
           OR s.name ILIKE '%' || $1 || '%'
           OR i.name ILIKE '%' || $1 || '%')
      AND (NOT $2 OR (l.quantity > 0 AND l.quantity < $3))";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct LotRow {
    id: i32,
    variant_id: Option<i32>,
    item_id: i32,
    item_name: String,
    category_name: Option<String>,
    size: Option<String>,
    color: Option<String>,
    supplier_id: i32,
    supplier_name: String,
    quantity: i32,
    import_cost: Decimal,
    import_date: NaiveDate,
    created_at: DateTime<Utc>,
}

impl From<LotRow> for Lot {
    fn from(row: LotRow) -> Self {
        Self {
            id: LotId::new(row.id),
            variant_id: row.variant_id.map(VariantId::new),
            item_id: ItemId::new(row.item_id),
            item_name: row.item_name,
            category_name: row.category_name,
            size: row.size,
            color: row.color,
            supplier_id: SupplierId::new(row.supplier_id),
            supplier_name: row.supplier_name,
            quantity: row.quantity,
            import_cost: row.import_cost,
            import_date: row.import_date,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LotTotalsRow {
    total_lots: i64,
    total_cost: Decimal,
    latest_import_date: Option<NaiveDate>,
}

#[derive(Debug, sqlx::FromRow)]
struct LotTargetRow {
    variant_id: Option<i32>,
    item_id: Option<i32>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for storage lot operations.
pub struct StorageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StorageRepository<'a> {
    /// Create a new storage repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of lots, newest import first, with totals over the filter.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self, filter: &LotFilter) -> Result<LotPage, RepositoryError> {
        let search = filter.search_term();

        let sql = format!(
            "{LOT_SELECT} {LOT_FILTER}
             ORDER BY l.import_date DESC, l.id DESC
             LIMIT $4 OFFSET $5"
        );
        let rows = sqlx::query_as::<_, LotRow>(&sql)
            .bind(search)
            .bind(filter.low_stock)
            .bind(LOW_STOCK_THRESHOLD)
            .bind(LOTS_PER_PAGE)
            .bind(filter.offset())
            .fetch_all(self.pool)
            .await?;

        let sql = format!(
            r"
            SELECT
                COUNT(*) AS total_lots,
                COALESCE(SUM(l.import_cost * l.quantity), 0) AS total_cost,
                MAX(l.import_date) AS latest_import_date
            FROM shop.storage_lot l
            LEFT JOIN shop.product_variant v ON v.id = l.variant_id
            JOIN shop.item i ON i.id = COALESCE(v.item_id, l.item_id)
            JOIN shop.supplier s ON s.id = l.supplier_id
            {LOT_FILTER}
            "
        );
        let totals = sqlx::query_as::<_, LotTotalsRow>(&sql)
            .bind(search)
            .bind(filter.low_stock)
            .bind(LOW_STOCK_THRESHOLD)
            .fetch_one(self.pool)
            .await?;

        Ok(LotPage {
            lots: rows.into_iter().map(Into::into).collect(),
            page: filter.page(),
            page_size: LOTS_PER_PAGE,
            total_lots: totals.total_lots,
            total_pages: page_count(totals.total_lots, LOTS_PER_PAGE),
            total_cost: totals.total_cost,
            latest_import_date: totals.latest_import_date,
        })
    }

    /// Get a lot by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: LotId) -> Result<Option<Lot>, RepositoryError> {
        let sql = format!("{LOT_SELECT} WHERE l.id = $1");
        let row = sqlx::query_as::<_, LotRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Receive stock for one (item, size, color), creating the variant if
    /// it does not exist yet.
    ///
    /// `lot` must already be normalized.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item does not exist,
    /// `RepositoryError::Conflict` if the supplier does not exist, or
    /// `RepositoryError::Database` for other failures.
    pub async fn receive(&self, lot: &ReceiveLot) -> Result<LotId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        lock_item(&mut tx, lot.item_id, lot.sell_price).await?;
        let variant_id = ensure_variant(&mut tx, lot.item_id, &lot.size, &lot.color).await?;

        let lot_id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO shop.storage_lot (
                variant_id, supplier_id, quantity, import_cost, import_date
            )
            VALUES ($1, $2, $3, $4, COALESCE($5, CURRENT_DATE))
            RETURNING id
            ",
        )
        .bind(variant_id)
        .bind(lot.supplier_id)
        .bind(lot.quantity)
        .bind(lot.import_cost)
        .bind(lot.import_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "Supplier does not exist"))?;

        refresh_variant_stock(&mut *tx, &[variant_id]).await?;
        tx.commit().await?;

        tracing::info!(
            lot_id,
            variant_id = %variant_id,
            quantity = lot.quantity,
            "Storage lot received"
        );

        Ok(LotId::new(lot_id))
    }

    /// Receive one lot per size × color combination.
    ///
    /// Each combination commits on its own; failures are collected rather
    /// than aborting the rest.
    pub async fn bulk_receive(&self, receipts: &[ReceiveLot]) -> BulkReceipt {
        let mut outcome = BulkReceipt::default();

        for receipt in receipts {
            match self.receive(receipt).await {
                Ok(lot_id) => {
                    outcome.imported += 1;
                    outcome.lots.push(lot_id);
                }
                Err(err) => {
                    outcome.errors.push(format!(
                        "Size {}, Color {}: {}",
                        receipt.size,
                        receipt.color,
                        receipt_failure(&err)
                    ));
                }
            }
        }

        outcome
    }

    /// Change a lot's quantity, cost, import date and supplier.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the lot does not exist,
    /// `RepositoryError::Conflict` if the supplier does not exist, or
    /// `RepositoryError::Database` for other failures.
    pub async fn update(&self, id: LotId, update: &UpdateLot) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let target = sqlx::query_as::<_, LotTargetRow>(
            r"
            UPDATE shop.storage_lot
            SET quantity = $2, import_cost = $3, import_date = $4, supplier_id = $5
            WHERE id = $1
            RETURNING variant_id, item_id
            ",
        )
        .bind(id)
        .bind(update.quantity)
        .bind(update.import_cost)
        .bind(update.import_date)
        .bind(update.supplier_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "Supplier does not exist"))?
        .ok_or(RepositoryError::NotFound)?;

        if let Some(variant_id) = target.variant_id {
            refresh_variant_stock(&mut *tx, &[VariantId::new(variant_id)]).await?;
        }
        tx.commit().await?;

        tracing::info!(lot_id = %id, quantity = update.quantity, "Storage lot updated");
        Ok(())
    }

    /// Delete a lot nothing has been sold from.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the lot does not exist,
    /// `RepositoryError::Conflict` if an order line references the lot's
    /// variant (or its item, for a legacy lot), or
    /// `RepositoryError::Database` for other failures.
    pub async fn delete(&self, id: LotId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let target = sqlx::query_as::<_, LotTargetRow>(
            "SELECT variant_id, item_id FROM shop.storage_lot WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let referenced: bool = match (target.variant_id, target.item_id) {
            (Some(variant_id), _) => {
                sqlx::query_scalar(
                    "SELECT EXISTS (SELECT 1 FROM shop.order_detail WHERE variant_id = $1)",
                )
                .bind(variant_id)
                .fetch_one(&mut *tx)
                .await?
            }
            (None, Some(item_id)) => {
                sqlx::query_scalar(
                    "SELECT EXISTS (SELECT 1 FROM shop.order_detail WHERE item_id = $1)",
                )
                .bind(item_id)
                .fetch_one(&mut *tx)
                .await?
            }
            (None, None) => {
                return Err(RepositoryError::DataCorruption(format!(
                    "storage lot {id} has neither variant nor item"
                )));
            }
        };
        if referenced {
            return Err(RepositoryError::Conflict(
                "Lot is referenced by existing orders and cannot be deleted".to_string(),
            ));
        }

        sqlx::query("DELETE FROM shop.storage_lot WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if let Some(variant_id) = target.variant_id {
            refresh_variant_stock(&mut *tx, &[VariantId::new(variant_id)]).await?;
        }
        tx.commit().await?;

        tracing::info!(lot_id = %id, "Storage lot deleted");
        Ok(())
    }
}

// =============================================================================
// Transaction helpers
// =============================================================================

/// Lock the item row, setting its sell price when given.
async fn lock_item(
    conn: &mut PgConnection,
    item_id: ItemId,
    sell_price: Option<Decimal>,
) -> Result<(), RepositoryError> {
    let found: Option<i32> = sqlx::query_scalar(
        r"
        UPDATE shop.item
        SET sell_price = COALESCE($2, sell_price)
        WHERE id = $1
        RETURNING id
        ",
    )
    .bind(item_id)
    .bind(sell_price)
    .fetch_optional(&mut *conn)
    .await?;

    found.map(|_| ()).ok_or(RepositoryError::NotFound)
}

/// Get or create the variant for (item, size, color).
async fn ensure_variant(
    conn: &mut PgConnection,
    item_id: ItemId,
    size: &str,
    color: &str,
) -> Result<VariantId, RepositoryError> {
    // The no-op update makes RETURNING yield the existing row on conflict
    let id: i32 = sqlx::query_scalar(
        r"
        INSERT INTO shop.product_variant (item_id, size, color)
        VALUES ($1, $2, $3)
        ON CONFLICT ON CONSTRAINT product_variant_item_size_color_key
        DO UPDATE SET size = EXCLUDED.size
        RETURNING id
        ",
    )
    .bind(item_id)
    .bind(size)
    .bind(color)
    .fetch_one(&mut *conn)
    .await?;

    Ok(VariantId::new(id))
}

/// Message for one failed bulk combination. Database details stay in logs.
fn receipt_failure(err: &RepositoryError) -> String {
    match err {
        RepositoryError::NotFound => "product not found".to_string(),
        RepositoryError::Conflict(msg) => msg.clone(),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            tracing::error!(error = %err, "Bulk receipt combination failed");
            "could not be saved".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_failure_hides_database_detail() {
        let err = RepositoryError::Database(sqlx::Error::PoolTimedOut);
        assert_eq!(receipt_failure(&err), "could not be saved");

        let err = RepositoryError::Conflict("Supplier does not exist".to_string());
        assert_eq!(receipt_failure(&err), "Supplier does not exist");
    }
}
