//! Supplier route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use threadline_core::SupplierId;

use crate::db::SupplierRepository;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireStaff};
use crate::models::{Supplier, SupplierInput, SupplierSummary};
use crate::state::AppState;

fn validated(input: SupplierInput) -> Result<SupplierInput> {
    input
        .normalized()
        .ok_or_else(|| AppError::BadRequest("Supplier name is required".to_string()))
}

/// All suppliers with their lot counts.
#[instrument(skip(state, _staff))]
pub async fn index(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
) -> Result<Json<Vec<SupplierSummary>>> {
    let suppliers = SupplierRepository::new(state.pool()).list().await?;
    Ok(Json(suppliers))
}

/// Supplier detail.
#[instrument(skip(state, _staff))]
pub async fn show(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Path(id): Path<i32>,
) -> Result<Json<Supplier>> {
    SupplierRepository::new(state.pool())
        .get(SupplierId::new(id))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))
}

/// Create a supplier.
#[instrument(skip(state, staff, input), fields(staff_id = %staff.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(staff): RequireAdmin,
    Json(input): Json<SupplierInput>,
) -> Result<(StatusCode, Json<Supplier>)> {
    let input = validated(input)?;
    let supplier = SupplierRepository::new(state.pool()).create(&input).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

/// Replace a supplier's details.
#[instrument(skip(state, staff, input), fields(staff_id = %staff.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(staff): RequireAdmin,
    Path(id): Path<i32>,
    Json(input): Json<SupplierInput>,
) -> Result<Json<Supplier>> {
    let input = validated(input)?;
    let supplier = SupplierRepository::new(state.pool())
        .update(SupplierId::new(id), &input)
        .await?;
    Ok(Json(supplier))
}

/// Delete a supplier that has no lots.
#[instrument(skip(state, staff), fields(staff_id = %staff.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(staff): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    SupplierRepository::new(state.pool())
        .delete(SupplierId::new(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
