//! Product, variant and stock cache route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use tracing::instrument;

use threadline_core::ItemId;
use threadline_core::db::ledger::{refresh_all_stock, refresh_item_stock};

use crate::db::ProductRepository;
use crate::error::{AppError, Result, set_sentry_user};
use crate::middleware::{RequireAdmin, RequireStaff};
use crate::models::{
    NewProduct, Product, ProductFilter, ProductUpdate, ProductVariants, StockRefresh,
};
use crate::state::AppState;

fn check_price(price: Decimal) -> Result<()> {
    if price <= Decimal::ZERO {
        return Err(AppError::BadRequest(
            "Sell price must be positive".to_string(),
        ));
    }
    Ok(())
}

async fn load(repo: &ProductRepository<'_>, id: ItemId) -> Result<Product> {
    repo.get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
}

/// List products (`?category=&q=`).
#[instrument(skip(state, _staff))]
pub async fn index(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Product>>> {
    let products = ProductRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(products))
}

/// Product detail.
#[instrument(skip(state, _staff))]
pub async fn show(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Path(id): Path<i32>,
) -> Result<Json<Product>> {
    let repo = ProductRepository::new(state.pool());
    Ok(Json(load(&repo, ItemId::new(id)).await?))
}

/// Create a product. Variants are created by receiving stock.
#[instrument(skip(state, staff, product), fields(staff_id = %staff.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(staff): RequireAdmin,
    Json(product): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>)> {
    if product.name.trim().is_empty() {
        return Err(AppError::BadRequest("Product name is required".to_string()));
    }
    check_price(product.sell_price)?;

    let repo = ProductRepository::new(state.pool());
    let id = repo.create(&product).await?;
    Ok((StatusCode::CREATED, Json(load(&repo, id).await?)))
}

/// Change a product's sell price or availability.
#[instrument(skip(state, staff, update), fields(staff_id = %staff.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(staff): RequireAdmin,
    Path(id): Path<i32>,
    Json(update): Json<ProductUpdate>,
) -> Result<Json<Product>> {
    if update.is_empty() {
        return Err(AppError::BadRequest("Nothing to update".to_string()));
    }
    if let Some(price) = update.sell_price {
        check_price(price)?;
    }

    let id = ItemId::new(id);
    let repo = ProductRepository::new(state.pool());
    repo.update(id, &update).await?;

    tracing::info!(item_id = %id, "Product updated");
    Ok(Json(load(&repo, id).await?))
}

/// A product's variants with cached and live stock.
#[instrument(skip(state, _staff))]
pub async fn variants(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Path(id): Path<i32>,
) -> Result<Json<ProductVariants>> {
    let id = ItemId::new(id);
    let repo = ProductRepository::new(state.pool());

    let product = load(&repo, id).await?;
    let variants = repo.variants(id).await?;
    let legacy_stock = repo.legacy_stock(id).await?;

    Ok(Json(ProductVariants {
        product,
        variants,
        legacy_stock,
    }))
}

/// Recompute the cached stock of one product's variants.
#[instrument(skip(state, _staff))]
pub async fn refresh_stock(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Path(id): Path<i32>,
) -> Result<Json<StockRefresh>> {
    let id = ItemId::new(id);
    let repo = ProductRepository::new(state.pool());
    load(&repo, id).await?;

    let variants_refreshed = refresh_item_stock(state.pool(), id).await?;
    tracing::info!(item_id = %id, variants_refreshed, "Variant stock refreshed");

    Ok(Json(StockRefresh { variants_refreshed }))
}

/// Recompute the cached stock of every variant.
#[instrument(skip(state, staff), fields(staff_id = %staff.id))]
pub async fn refresh_all(
    State(state): State<AppState>,
    RequireAdmin(staff): RequireAdmin,
) -> Result<Json<StockRefresh>> {
    set_sentry_user(&staff.id, Some(staff.email.as_str()));

    let variants_refreshed = refresh_all_stock(state.pool()).await?;
    tracing::info!(variants_refreshed, "All variant stock refreshed");

    Ok(Json(StockRefresh { variants_refreshed }))
}
