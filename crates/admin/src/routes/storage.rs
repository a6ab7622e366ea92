//! Storage lot route handlers.
//!
//! Receiving, editing and deleting lots is restricted to admins; any staff
//! member can browse them.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use threadline_core::LotId;

use crate::db::StorageRepository;
use crate::error::{AppError, Result, set_sentry_user};
use crate::middleware::{RequireAdmin, RequireStaff};
use crate::models::{BulkReceipt, BulkReceive, Lot, LotFilter, LotPage, ReceiveLot, UpdateLot};
use crate::state::AppState;

/// List lots (`?search=&low_stock=&page=`).
#[instrument(skip(state, _staff))]
pub async fn index(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Query(filter): Query<LotFilter>,
) -> Result<Json<LotPage>> {
    let page = StorageRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(page))
}

/// Lot detail.
#[instrument(skip(state, _staff))]
pub async fn show(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Path(id): Path<i32>,
) -> Result<Json<Lot>> {
    StorageRepository::new(state.pool())
        .get(LotId::new(id))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Lot".to_string()))
}

/// Receive stock for one variant.
#[instrument(skip(state, staff, request), fields(staff_id = %staff.id))]
pub async fn receive(
    State(state): State<AppState>,
    RequireAdmin(staff): RequireAdmin,
    Json(request): Json<ReceiveLot>,
) -> Result<(StatusCode, Json<Lot>)> {
    set_sentry_user(&staff.id, Some(staff.email.as_str()));
    let request = request.normalized()?;

    let repo = StorageRepository::new(state.pool());
    let id = repo.receive(&request).await?;
    let lot = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("lot {id} missing after insert")))?;

    Ok((StatusCode::CREATED, Json(lot)))
}

/// Receive one lot per size × color.
#[instrument(skip(state, staff, request), fields(staff_id = %staff.id))]
pub async fn bulk_receive(
    State(state): State<AppState>,
    RequireAdmin(staff): RequireAdmin,
    Json(request): Json<BulkReceive>,
) -> Result<Json<BulkReceipt>> {
    set_sentry_user(&staff.id, Some(staff.email.as_str()));
    let receipts = request.receipts()?;

    let outcome = StorageRepository::new(state.pool())
        .bulk_receive(&receipts)
        .await;

    tracing::info!(
        item_id = %request.item_id,
        imported = outcome.imported,
        failed = outcome.errors.len(),
        "Bulk receipt finished"
    );

    Ok(Json(outcome))
}

/// Edit a lot's quantity, cost, import date and supplier.
#[instrument(skip(state, staff, update), fields(staff_id = %staff.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(staff): RequireAdmin,
    Path(id): Path<i32>,
    Json(update): Json<UpdateLot>,
) -> Result<Json<Lot>> {
    update.validate()?;

    let id = LotId::new(id);
    let repo = StorageRepository::new(state.pool());
    repo.update(id, &update).await?;

    repo.get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Lot".to_string()))
}

/// Delete a lot nothing has been sold from.
#[instrument(skip(state, staff), fields(staff_id = %staff.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(staff): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    StorageRepository::new(state.pool())
        .delete(LotId::new(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
