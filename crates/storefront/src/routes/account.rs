//! Account route handlers.
//!
//! These routes require a signed-in customer. Orders of other customers
//! answer as not found.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use threadline_core::{OrderId, page_number, page_offset};
use threadline_core::db::{CancelledOrder, OrderFilter, OrderRepository, Requester, cancel_order};
use threadline_core::order::{Order, OrderWithDetails};

use crate::error::{AppError, Result, set_sentry_user};
use crate::middleware::RequireAuth;
use crate::state::AppState;

const ORDERS_PER_PAGE: i64 = 20;

/// Query parameters for the order history.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<i64>,
}

/// A page of the customer's orders.
#[derive(Debug, Serialize)]
pub struct OrderHistory {
    pub orders: Vec<Order>,
    pub total: i64,
    pub page: i64,
}

/// The signed-in customer's orders, newest first.
#[instrument(skip(state, customer), fields(customer_id = %customer.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<OrderHistory>> {
    let page = page_number(query.page);
    let filter = OrderFilter {
        customer_id: Some(customer.id),
        limit: Some(ORDERS_PER_PAGE),
        offset: Some(page_offset(page, ORDERS_PER_PAGE)),
        ..OrderFilter::default()
    };

    let repo = OrderRepository::new(state.pool());
    let orders = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(OrderHistory {
        orders,
        total,
        page,
    }))
}

/// One of the customer's orders with its lines.
#[instrument(skip(state, customer), fields(customer_id = %customer.id))]
pub async fn order(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Json<OrderWithDetails>> {
    OrderRepository::new(state.pool())
        .get_for_customer(OrderId::new(id), customer.id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Order".to_string()))
}

/// Cancel one of the customer's pending orders and restock it.
#[instrument(skip(state, customer), fields(customer_id = %customer.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Json<CancelledOrder>> {
    set_sentry_user(&customer.id, Some(customer.email.as_str()));

    let cancelled = cancel_order(
        state.pool(),
        OrderId::new(id),
        Requester::Customer(customer.id),
    )
    .await?;

    tracing::info!(
        order_id = %cancelled.order_id,
        lines = cancelled.restocked.len(),
        "Order cancelled by customer"
    );

    Ok(Json(cancelled))
}
