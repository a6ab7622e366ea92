//! Order queries and status changes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use thiserror::Error;

use super::RepositoryError;
use crate::cart::CartLine;
use crate::order::{ContactInfo, Order, OrderDetail, OrderWithDetails};
use crate::types::{
    CustomerId, InvalidTransition, ItemId, OrderDetailId, OrderId, OrderStatus, PaymentMethod,
    VariantId,
};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    customer_id: Option<i32>,
    status: OrderStatus,
    payment_method: PaymentMethod,
    payment_reference: Option<String>,
    subtotal: Decimal,
    discount: Decimal,
    discount_code: Option<String>,
    total: Decimal,
    recipient_name: String,
    phone: String,
    shipping_address: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: OrderId::new(row.id),
            customer_id: row.customer_id.map(CustomerId::new),
            status: row.status,
            payment_method: row.payment_method,
            payment_reference: row.payment_reference,
            subtotal: row.subtotal,
            discount: row.discount,
            discount_code: row.discount_code,
            total: row.total,
            contact: ContactInfo {
                recipient_name: row.recipient_name,
                phone: row.phone,
                shipping_address: row.shipping_address,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderDetailRow {
    id: i32,
    order_id: i32,
    variant_id: Option<i32>,
    item_id: i32,
    item_name: String,
    size: String,
    color: String,
    quantity: i32,
    unit_price: Decimal,
}

impl From<OrderDetailRow> for OrderDetail {
    fn from(row: OrderDetailRow) -> Self {
        Self {
            id: OrderDetailId::new(row.id),
            order_id: OrderId::new(row.order_id),
            variant_id: row.variant_id.map(VariantId::new),
            item_id: ItemId::new(row.item_id),
            item_name: row.item_name,
            size: row.size,
            color: row.color,
            quantity: row.quantity,
            unit_price: row.unit_price,
        }
    }
}

const ORDER_COLUMNS: &str = r"
    id, customer_id, status, payment_method, payment_reference,
    subtotal, discount, discount_code, total,
    recipient_name, phone, shipping_address, created_at, updated_at
";

const DETAIL_COLUMNS: &str = r"
    id, order_id, variant_id, item_id, item_name, size, color, quantity, unit_price
";

// =============================================================================
// Inputs
// =============================================================================

/// Order row to insert at checkout commit.
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub customer_id: Option<CustomerId>,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_reference: Option<&'a str>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub discount_code: Option<&'a str>,
    pub total: Decimal,
    pub contact: &'a ContactInfo,
}

/// Filters for listing orders.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub customer_id: Option<CustomerId>,
    /// Matches recipient name or phone.
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Errors from [`OrderRepository::update_status`].
#[derive(Debug, Error)]
pub enum StatusUpdateError {
    #[error("order not found")]
    NotFound,

    #[error(transparent)]
    Transition(#[from] InvalidTransition),

    /// Cancelling restores stock and deletes the order; it has its own flow.
    #[error("orders are cancelled through the cancellation flow")]
    RequiresCancellation,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for StatusUpdateError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

// =============================================================================
// Transaction helpers
// =============================================================================

/// Insert an order row.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the payment reference already
/// exists, or `RepositoryError::Database` for other failures.
pub async fn insert_order(
    conn: &mut PgConnection,
    order: &NewOrder<'_>,
) -> Result<Order, RepositoryError> {
    let sql = format!(
        r"
        INSERT INTO shop.orders (
            customer_id, status, payment_method, payment_reference,
            subtotal, discount, discount_code, total,
            recipient_name, phone, shipping_address
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING {ORDER_COLUMNS}
        "
    );

    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(order.customer_id)
        .bind(order.status)
        .bind(order.payment_method)
        .bind(order.payment_reference)
        .bind(order.subtotal)
        .bind(order.discount)
        .bind(order.discount_code)
        .bind(order.total)
        .bind(&order.contact.recipient_name)
        .bind(&order.contact.phone)
        .bind(&order.contact.shipping_address)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "payment reference already recorded"))?;

    Ok(row.into())
}

/// Insert one order line from a cart line.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn insert_detail(
    conn: &mut PgConnection,
    order_id: OrderId,
    line: &CartLine,
) -> Result<OrderDetail, RepositoryError> {
    let sql = format!(
        r"
        INSERT INTO shop.order_detail (
            order_id, variant_id, item_id, item_name, size, color, quantity, unit_price
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {DETAIL_COLUMNS}
        "
    );

    let row = sqlx::query_as::<_, OrderDetailRow>(&sql)
        .bind(order_id)
        .bind(line.variant_id)
        .bind(line.item_id)
        .bind(&line.item_name)
        .bind(&line.size)
        .bind(&line.color)
        .bind(line.quantity)
        .bind(line.unit_price)
        .fetch_one(&mut *conn)
        .await?;

    Ok(row.into())
}

/// Serialize commits that carry the same payment reference.
///
/// Held until the transaction ends, so a second return for the same payment
/// waits here and then finds the first one's order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_payment_reference(
    conn: &mut PgConnection,
    reference: &str,
) -> Result<(), RepositoryError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(reference)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Order id already recorded for a gateway payment reference.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_by_payment_reference(
    conn: &mut PgConnection,
    reference: &str,
) -> Result<Option<Order>, RepositoryError> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM shop.orders WHERE payment_reference = $1");
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(reference)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(Into::into))
}

/// Lock an order row for the rest of the transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_order(
    conn: &mut PgConnection,
    id: OrderId,
) -> Result<Option<Order>, RepositoryError> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM shop.orders WHERE id = $1 FOR UPDATE");
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(Into::into))
}

/// Lines of an order, in insertion order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn details_for(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<Vec<OrderDetail>, RepositoryError> {
    let sql = format!("SELECT {DETAIL_COLUMNS} FROM shop.order_detail WHERE order_id = $1 ORDER BY id");
    let rows = sqlx::query_as::<_, OrderDetailRow>(&sql)
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order reads and status changes.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM shop.orders WHERE id = $1");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// Get an order with its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_with_details(
        &self,
        id: OrderId,
    ) -> Result<Option<OrderWithDetails>, RepositoryError> {
        let Some(order) = self.get(id).await? else {
            return Ok(None);
        };
        let mut conn = self.pool.acquire().await?;
        let details = details_for(&mut conn, id).await?;
        Ok(Some(OrderWithDetails { order, details }))
    }

    /// Get an order only if it belongs to `customer_id`.
    ///
    /// Orders of other customers are reported as missing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_for_customer(
        &self,
        id: OrderId,
        customer_id: CustomerId,
    ) -> Result<Option<OrderWithDetails>, RepositoryError> {
        Ok(self
            .get_with_details(id)
            .await?
            .filter(|o| o.order.customer_id == Some(customer_id)))
    }

    /// List orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM shop.orders
            WHERE ($1::shop.order_status IS NULL OR status = $1)
              AND ($2::int IS NULL OR customer_id = $2)
              AND ($3::text IS NULL
                   OR recipient_name ILIKE '%' || $3 || '%'
                   OR phone ILIKE '%' || $3 || '%')
            ORDER BY created_at DESC, id DESC
            LIMIT $4 OFFSET $5
            "
        );

        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(filter.status)
            .bind(filter.customer_id)
            .bind(filter.search.as_deref())
            .bind(filter.limit.unwrap_or(50))
            .bind(filter.offset.unwrap_or(0))
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Count orders matching a filter (ignores limit/offset).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, filter: &OrderFilter) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*)
            FROM shop.orders
            WHERE ($1::shop.order_status IS NULL OR status = $1)
              AND ($2::int IS NULL OR customer_id = $2)
              AND ($3::text IS NULL
                   OR recipient_name ILIKE '%' || $3 || '%'
                   OR phone ILIKE '%' || $3 || '%')
            ",
        )
        .bind(filter.status)
        .bind(filter.customer_id)
        .bind(filter.search.as_deref())
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    /// Move an order to a new status.
    ///
    /// The order row is locked while the transition is checked.
    ///
    /// # Errors
    ///
    /// Returns `StatusUpdateError::RequiresCancellation` for `cancelled`,
    /// `StatusUpdateError::NotFound` if the order does not exist,
    /// `StatusUpdateError::Transition` if the lifecycle forbids the change,
    /// or `StatusUpdateError::Repository` if a query fails.
    pub async fn update_status(
        &self,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, StatusUpdateError> {
        if next == OrderStatus::Cancelled {
            return Err(StatusUpdateError::RequiresCancellation);
        }

        let mut tx = self.pool.begin().await?;

        let current = lock_order(&mut tx, id)
            .await?
            .ok_or(StatusUpdateError::NotFound)?;
        current.status.transition_to(next)?;

        let sql = format!(
            r"
            UPDATE shop.orders
            SET status = $2, updated_at = now()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .bind(next)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %id,
            from = %current.status,
            to = %next,
            "Order status changed"
        );

        Ok(row.into())
    }
}
