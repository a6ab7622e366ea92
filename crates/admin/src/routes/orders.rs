//! Order route handlers.
//!
//! Status changes follow the order lifecycle. Cancelling is not a status
//! change: it restocks the lots and deletes the order, so it has its own
//! endpoint and is only allowed while the order is pending.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use threadline_core::db::{CancelledOrder, OrderFilter, OrderRepository, Requester, cancel_order};
use threadline_core::order::{Order, OrderWithDetails};
use threadline_core::{OrderId, OrderStatus, page_number, page_offset};

use crate::error::{AppError, Result, set_sentry_user};
use crate::middleware::RequireStaff;
use crate::state::AppState;

const ORDERS_PER_PAGE: i64 = 25;

/// Query parameters for the order list.
#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    /// Status name; legacy spellings are accepted.
    pub status: Option<String>,
    /// Matches recipient name or phone.
    pub q: Option<String>,
    pub page: Option<i64>,
}

impl OrderQuery {
    fn filter(&self) -> Result<OrderFilter> {
        let status = self
            .status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<OrderStatus>)
            .transpose()
            .map_err(AppError::BadRequest)?;
        let search = self
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(String::from);

        Ok(OrderFilter {
            status,
            search,
            limit: Some(ORDERS_PER_PAGE),
            offset: Some(page_offset(self.page(), ORDERS_PER_PAGE)),
            ..OrderFilter::default()
        })
    }

    fn page(&self) -> i64 {
        page_number(self.page)
    }
}

/// A page of orders.
#[derive(Debug, Serialize)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

/// Requested status change.
#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: String,
}

/// List orders, newest first.
#[instrument(skip(state, _staff))]
pub async fn index(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Query(query): Query<OrderQuery>,
) -> Result<Json<OrderPage>> {
    let filter = query.filter()?;

    let repo = OrderRepository::new(state.pool());
    let orders = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(OrderPage {
        orders,
        total,
        page: query.page(),
        page_size: ORDERS_PER_PAGE,
    }))
}

/// Order detail with its lines.
#[instrument(skip(state, _staff))]
pub async fn show(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Path(id): Path<i32>,
) -> Result<Json<OrderWithDetails>> {
    OrderRepository::new(state.pool())
        .get_with_details(OrderId::new(id))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Order".to_string()))
}

/// Move an order along its lifecycle.
#[instrument(skip(state, staff, change), fields(staff_id = %staff.id))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<i32>,
    Json(change): Json<StatusChange>,
) -> Result<Json<Order>> {
    let next: OrderStatus = change.status.parse().map_err(AppError::BadRequest)?;

    let order = OrderRepository::new(state.pool())
        .update_status(OrderId::new(id), next)
        .await?;

    Ok(Json(order))
}

/// Cancel a pending order on a customer's behalf and restock it.
#[instrument(skip(state, staff), fields(staff_id = %staff.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<i32>,
) -> Result<Json<CancelledOrder>> {
    set_sentry_user(&staff.id, Some(staff.email.as_str()));

    let cancelled = cancel_order(state.pool(), OrderId::new(id), Requester::Staff(staff.id)).await?;

    tracing::info!(
        order_id = %cancelled.order_id,
        lines = cancelled.restocked.len(),
        "Order cancelled by staff"
    );

    Ok(Json(cancelled))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_query_accepts_legacy_status() {
        let query = OrderQuery {
            status: Some("canceled".to_string()),
            page: Some(2),
            ..OrderQuery::default()
        };
        let filter = query.filter().unwrap();
        assert_eq!(filter.status, Some(OrderStatus::Cancelled));
        assert_eq!(filter.offset, Some(25));
    }

    #[test]
    fn test_order_query_rejects_unknown_status() {
        let query = OrderQuery {
            status: Some("shipped".to_string()),
            ..OrderQuery::default()
        };
        assert!(matches!(query.filter(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_blank_status_and_search_are_ignored() {
        let query = OrderQuery {
            status: Some(" ".to_string()),
            q: Some("  ".to_string()),
            page: None,
        };
        let filter = query.filter().unwrap();
        assert!(filter.status.is_none());
        assert!(filter.search.is_none());
        assert_eq!(filter.offset, Some(0));
    }

    #[test]
    fn test_order_query_clamps_huge_page() {
        let query = OrderQuery {
            page: Some(i64::MAX),
            ..OrderQuery::default()
        };
        let filter = query.filter().unwrap();
        assert_eq!(query.page(), threadline_core::MAX_PAGE);
        assert_eq!(filter.offset, Some((threadline_core::MAX_PAGE - 1) * ORDERS_PER_PAGE));
    }
}
