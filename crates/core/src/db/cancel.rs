//! Order cancellation with restock.
//!
//! Only pending orders can be cancelled. Restoring stock, deleting the
//! order lines and deleting the order happen in one transaction; any failure
//! leaves every row as it was.

use std::collections::BTreeSet;

use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

use super::{RepositoryError, ledger, orders};
use crate::inventory::{MissingLot, Restock, RestockLine, StockTarget, plan_restock};
use crate::types::{CustomerId, OrderId, OrderStatus, StaffId, VariantId};

/// Who is asking for the cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requester {
    /// A signed-in customer; may only cancel their own orders.
    Customer(CustomerId),
    /// Back-office staff; may cancel any order, including guest orders.
    Staff(StaffId),
}

impl Requester {
    fn may_access(&self, owner: Option<CustomerId>) -> bool {
        match self {
            Self::Customer(id) => owner == Some(*id),
            Self::Staff(_) => true,
        }
    }
}

impl std::fmt::Display for Requester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer(id) => write!(f, "customer {id}"),
            Self::Staff(id) => write!(f, "staff {id}"),
        }
    }
}

/// Result of a successful cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CancelledOrder {
    pub order_id: OrderId,
    pub restocked: Vec<Restock>,
}

/// Errors from [`cancel_order`].
#[derive(Debug, Error)]
pub enum CancelError {
    /// The order does not exist or belongs to someone else.
    #[error("order not found")]
    NotFound,

    #[error("cannot cancel an order that is {status}")]
    NotCancellable { status: OrderStatus },

    #[error(transparent)]
    MissingLot(#[from] MissingLot),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CancelError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// Cancel a pending order and put its stock back.
///
/// Each line's quantity goes back to the first lot (lowest id) of its
/// variant, or of its item for legacy lines.
///
/// # Errors
///
/// Returns `CancelError::NotFound` if the order is missing or not visible to
/// `requester`, `CancelError::NotCancellable` unless it is pending,
/// `CancelError::MissingLot` if a line has no lot to return stock to, and
/// `CancelError::Repository` for database failures.
pub async fn cancel_order(
    pool: &PgPool,
    order_id: OrderId,
    requester: Requester,
) -> Result<CancelledOrder, CancelError> {
    let mut tx = pool.begin().await?;

    let order = orders::lock_order(&mut tx, order_id)
        .await?
        .filter(|o| requester.may_access(o.customer_id))
        .ok_or(CancelError::NotFound)?;

    if !order.status.is_cancellable() {
        return Err(CancelError::NotCancellable {
            status: order.status,
        });
    }

    let details = orders::details_for(&mut tx, order_id).await?;
    let lines: Vec<RestockLine> = details
        .iter()
        .map(|d| RestockLine {
            target: d.target(),
            quantity: d.quantity,
        })
        .collect();
    let targets: Vec<StockTarget> = lines
        .iter()
        .map(|l| l.target)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let first_lots = ledger::first_lots(&mut tx, &targets).await?;
    let restocked = plan_restock(&lines, &first_lots)?;
    ledger::apply_restocks(&mut tx, &restocked).await?;

    sqlx::query("DELETE FROM shop.order_detail WHERE order_id = $1")
        .bind(order_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM shop.orders WHERE id = $1")
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

    let variant_ids: Vec<VariantId> = targets.iter().filter_map(StockTarget::variant_id).collect();
    ledger::refresh_variant_stock(&mut *tx, &variant_ids).await?;

    tx.commit().await?;

    tracing::info!(
        order_id = %order_id,
        requester = %requester,
        lines = details.len(),
        "Order cancelled and restocked"
    );

    Ok(CancelledOrder {
        order_id,
        restocked,
    })
}
