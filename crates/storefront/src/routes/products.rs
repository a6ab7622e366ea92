//! Product route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use threadline_core::{CategoryId, ItemId, page_number, page_offset};

use crate::db::CatalogRepository;
use crate::db::catalog::{DEFAULT_PAGE_SIZE, ProductFilter};
use crate::error::{AppError, Result};
use crate::models::{ProductDetail, ProductSummary, VariantAvailability};
use crate::state::AppState;

/// Query parameters for the product listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub category: Option<i32>,
    pub q: Option<String>,
    /// 1-based page number.
    pub page: Option<i64>,
}

impl ListQuery {
    fn filter(&self) -> ProductFilter {
        ProductFilter {
            category_id: self.category.map(CategoryId::new),
            search: self.q.clone(),
            limit: Some(DEFAULT_PAGE_SIZE),
            offset: Some(page_offset(page_number(self.page), DEFAULT_PAGE_SIZE)),
        }
    }
}

/// A page of products.
#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub products: Vec<ProductSummary>,
    pub page: i64,
    pub page_size: i64,
}

/// List available products.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ProductPage>> {
    let products = CatalogRepository::new(state.pool())
        .list(&query.filter())
        .await?;

    Ok(Json(ProductPage {
        products,
        page: page_number(query.page),
        page_size: DEFAULT_PAGE_SIZE,
    }))
}

/// Product page with its in-stock variants.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ProductDetail>> {
    CatalogRepository::new(state.pool())
        .get(ItemId::new(id))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
}

/// Query parameters for a variant lookup.
#[derive(Debug, Deserialize)]
pub struct VariantQuery {
    pub size: String,
    pub color: String,
}

/// Price and live stock for one size and color.
#[instrument(skip(state))]
pub async fn variant(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<VariantQuery>,
) -> Result<Json<VariantAvailability>> {
    CatalogRepository::new(state.pool())
        .find_variant(ItemId::new(id), &query.size, &query.color)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Variant".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_page_has_no_offset() {
        let filter = ListQuery::default().filter();
        assert_eq!(filter.offset, Some(0));
        assert_eq!(filter.limit, Some(DEFAULT_PAGE_SIZE));
    }

    #[test]
    fn test_page_offset() {
        let query = ListQuery {
            category: Some(3),
            q: Some("shirt".to_string()),
            page: Some(3),
        };
        let filter = query.filter();
        assert_eq!(filter.offset, Some(2 * DEFAULT_PAGE_SIZE));
        assert_eq!(filter.category_id, Some(CategoryId::new(3)));
    }

    #[test]
    fn test_page_below_one_is_clamped() {
        let query = ListQuery {
            page: Some(-4),
            ..ListQuery::default()
        };
        assert_eq!(query.filter().offset, Some(0));
    }

    #[test]
    fn test_huge_page_is_clamped() {
        let query = ListQuery {
            page: Some(i64::MAX),
            ..ListQuery::default()
        };
        assert_eq!(
            query.filter().offset,
            Some((threadline_core::MAX_PAGE - 1) * DEFAULT_PAGE_SIZE)
        );
    }
}
