//! Storage ledger reads and writes.
//!
//! Lots are read in ascending id order. When the read is binding (checkout
//! commit), rows are locked with `FOR UPDATE` in that same order, so two
//! transactions touching overlapping lots always queue instead of
//! deadlocking, and the second one sees the first one's deductions.

use std::collections::HashMap;

use sqlx::{Executor, PgConnection, PgPool, Postgres};

use super::{RepositoryError, id_array};
use crate::inventory::{Deduction, LotBalance, Restock, StockSnapshot, StockTarget};
use crate::types::{ItemId, LotId, VariantId};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct LotRow {
    id: i32,
    variant_id: Option<i32>,
    item_id: Option<i32>,
    quantity: i32,
}

impl LotRow {
    fn target(&self) -> Result<StockTarget, RepositoryError> {
        StockTarget::from_columns(
            self.variant_id.map(VariantId::new),
            self.item_id.map(ItemId::new),
        )
        .ok_or_else(|| {
            RepositoryError::DataCorruption(format!("storage lot {} has no variant or item", self.id))
        })
    }
}

const LOTS_FOR_TARGETS: &str = r"
    SELECT id, variant_id, item_id, quantity
    FROM shop.storage_lot
    WHERE variant_id = ANY($1)
       OR (variant_id IS NULL AND item_id = ANY($2))
    ORDER BY id
";

const LOTS_FOR_TARGETS_LOCKED: &str = r"
    SELECT id, variant_id, item_id, quantity
    FROM shop.storage_lot
    WHERE variant_id = ANY($1)
       OR (variant_id IS NULL AND item_id = ANY($2))
    ORDER BY id
    FOR UPDATE
";

fn split_targets(targets: &[StockTarget]) -> (Vec<i32>, Vec<i32>) {
    let variants: Vec<VariantId> = targets.iter().filter_map(StockTarget::variant_id).collect();
    let items: Vec<ItemId> = targets
        .iter()
        .filter_map(StockTarget::legacy_item_id)
        .collect();
    (id_array(&variants), id_array(&items))
}

/// Lot balances for a set of targets, plus the validator snapshot built
/// from them.
#[derive(Debug, Default)]
pub struct StockView {
    pub snapshot: StockSnapshot,
    lots: HashMap<StockTarget, Vec<LotBalance>>,
}

impl StockView {
    /// Lots of `target` in ascending id order (empty if none).
    #[must_use]
    pub fn lots(&self, target: &StockTarget) -> &[LotBalance] {
        self.lots.get(target).map(Vec::as_slice).unwrap_or_default()
    }
}

async fn load_stock(
    conn: &mut PgConnection,
    targets: &[StockTarget],
    lock: bool,
) -> Result<StockView, RepositoryError> {
    let (variant_ids, item_ids) = split_targets(targets);

    let existing_variants: Vec<i32> =
        sqlx::query_scalar("SELECT id FROM shop.product_variant WHERE id = ANY($1)")
            .bind(&variant_ids)
            .fetch_all(&mut *conn)
            .await?;
    let existing_items: Vec<i32> = sqlx::query_scalar("SELECT id FROM shop.item WHERE id = ANY($1)")
        .bind(&item_ids)
        .fetch_all(&mut *conn)
        .await?;

    let sql = if lock {
        LOTS_FOR_TARGETS_LOCKED
    } else {
        LOTS_FOR_TARGETS
    };
    let rows = sqlx::query_as::<_, LotRow>(sql)
        .bind(&variant_ids)
        .bind(&item_ids)
        .fetch_all(&mut *conn)
        .await?;

    let mut lots: HashMap<StockTarget, Vec<LotBalance>> = HashMap::new();
    for row in rows {
        let target = row.target()?;
        lots.entry(target)
            .or_default()
            .push(LotBalance::new(LotId::new(row.id), row.quantity));
    }

    let mut snapshot = StockSnapshot::new();
    for target in targets {
        let exists = match target {
            StockTarget::Variant(id) => existing_variants.contains(&id.as_i32()),
            StockTarget::LegacyItem(id) => existing_items.contains(&id.as_i32()),
        };
        if exists {
            snapshot.insert_lots(*target, lots.get(target).map(Vec::as_slice).unwrap_or_default());
        }
    }

    Ok(StockView { snapshot, lots })
}

/// Read live stock without locking. Used for informational checks.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails, or
/// `RepositoryError::DataCorruption` for a lot with no target.
pub async fn read_stock(
    pool: &PgPool,
    targets: &[StockTarget],
) -> Result<StockView, RepositoryError> {
    let mut conn = pool.acquire().await?;
    load_stock(&mut conn, targets, false).await
}

/// Read and lock every lot of `targets` for the rest of the transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails, or
/// `RepositoryError::DataCorruption` for a lot with no target.
pub async fn lock_stock(
    conn: &mut PgConnection,
    targets: &[StockTarget],
) -> Result<StockView, RepositoryError> {
    load_stock(conn, targets, true).await
}

/// Apply a deduction plan.
///
/// Each update re-checks the lot still holds enough units, so a plan built
/// from stale balances fails instead of driving a lot negative.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if a lot no longer covers its
/// deduction, or `RepositoryError::Database` if a query fails.
pub async fn apply_deductions(
    conn: &mut PgConnection,
    deductions: &[Deduction],
) -> Result<(), RepositoryError> {
    for deduction in deductions {
        let result = sqlx::query(
            r"
            UPDATE shop.storage_lot
            SET quantity = quantity - $2
            WHERE id = $1 AND quantity >= $2
            ",
        )
        .bind(deduction.lot_id)
        .bind(deduction.take)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() != 1 {
            return Err(RepositoryError::Conflict(format!(
                "storage lot {} no longer holds {} units",
                deduction.lot_id, deduction.take
            )));
        }
    }
    Ok(())
}

/// First lot (lowest id) of each target, locked for update.
///
/// Targets without any lot are absent from the result.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn first_lots(
    conn: &mut PgConnection,
    targets: &[StockTarget],
) -> Result<HashMap<StockTarget, LotId>, RepositoryError> {
    let (variant_ids, item_ids) = split_targets(targets);

    let rows = sqlx::query_as::<_, LotRow>(
        r"
        SELECT id, variant_id, item_id, quantity
        FROM shop.storage_lot
        WHERE id IN (
            SELECT MIN(id)
            FROM shop.storage_lot
            WHERE variant_id = ANY($1)
               OR (variant_id IS NULL AND item_id = ANY($2))
            GROUP BY variant_id, item_id
        )
        ORDER BY id
        FOR UPDATE
        ",
    )
    .bind(&variant_ids)
    .bind(&item_ids)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| Ok((row.target()?, LotId::new(row.id))))
        .collect()
}

/// Apply a restock plan.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if a planned lot has disappeared, or
/// `RepositoryError::Database` if a query fails.
pub async fn apply_restocks(
    conn: &mut PgConnection,
    restocks: &[Restock],
) -> Result<(), RepositoryError> {
    for restock in restocks {
        let result = sqlx::query(
            r"
            UPDATE shop.storage_lot
            SET quantity = quantity + $2
            WHERE id = $1
            ",
        )
        .bind(restock.lot_id)
        .bind(restock.quantity)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() != 1 {
            return Err(RepositoryError::NotFound);
        }
    }
    Ok(())
}

// =============================================================================
// Variant stock cache
// =============================================================================

/// Recompute `stock_quantity` for the given variants from their lots.
///
/// Returns the number of variants updated.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn refresh_variant_stock<'e, E>(
    executor: E,
    variant_ids: &[VariantId],
) -> Result<u64, RepositoryError>
where
    E: Executor<'e, Database = Postgres>,
{
    if variant_ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        r"
        UPDATE shop.product_variant v
        SET stock_quantity = COALESCE(
                (SELECT SUM(GREATEST(l.quantity, 0))
                 FROM shop.storage_lot l
                 WHERE l.variant_id = v.id),
                0),
            stock_refreshed_at = now()
        WHERE v.id = ANY($1)
        ",
    )
    .bind(id_array(variant_ids))
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Recompute `stock_quantity` for every variant of an item.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn refresh_item_stock<'e, E>(executor: E, item_id: ItemId) -> Result<u64, RepositoryError>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r"
        UPDATE shop.product_variant v
        SET stock_quantity = COALESCE(
                (SELECT SUM(GREATEST(l.quantity, 0))
                 FROM shop.storage_lot l
                 WHERE l.variant_id = v.id),
                0),
            stock_refreshed_at = now()
        WHERE v.item_id = $1
        ",
    )
    .bind(item_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Recompute `stock_quantity` for every variant.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn refresh_all_stock<'e, E>(executor: E) -> Result<u64, RepositoryError>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r"
        UPDATE shop.product_variant v
        SET stock_quantity = COALESCE(s.total, 0),
            stock_refreshed_at = now()
        FROM shop.product_variant pv
        LEFT JOIN (
            SELECT variant_id, SUM(GREATEST(quantity, 0)) AS total
            FROM shop.storage_lot
            WHERE variant_id IS NOT NULL
            GROUP BY variant_id
        ) s ON s.variant_id = pv.id
        WHERE v.id = pv.id
        ",
    )
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_targets_separates_kinds() {
        let targets = [
            StockTarget::Variant(VariantId::new(3)),
            StockTarget::LegacyItem(ItemId::new(9)),
            StockTarget::Variant(VariantId::new(1)),
        ];
        let (variants, items) = split_targets(&targets);
        assert_eq!(variants, vec![3, 1]);
        assert_eq!(items, vec![9]);
    }

    #[test]
    fn test_lot_row_without_target_is_corruption() {
        let row = LotRow {
            id: 5,
            variant_id: None,
            item_id: None,
            quantity: 1,
        };
        assert!(matches!(
            row.target(),
            Err(RepositoryError::DataCorruption(_))
        ));
    }

    #[test]
    fn test_empty_view_has_no_lots() {
        let view = StockView::default();
        assert!(view.lots(&StockTarget::Variant(VariantId::new(1))).is_empty());
        assert_eq!(
            view.snapshot.available(&StockTarget::Variant(VariantId::new(1))),
            None
        );
    }
}
