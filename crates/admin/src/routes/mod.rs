//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                      - Liveness
//! GET    /health/ready                - Readiness (database)
//!
//! # Storage lots
//! GET    /storage                     - Paged lot list with totals
//! POST   /storage                     - Receive one lot (admin)
//! POST   /storage/bulk                - Receive size × color lots (admin)
//! GET    /storage/{id}                - Lot detail
//! PUT    /storage/{id}                - Edit a lot (admin)
//! DELETE /storage/{id}                - Delete an unsold lot (admin)
//!
//! # Suppliers
//! GET    /suppliers                   - Suppliers with lot counts
//! POST   /suppliers                   - Create (admin)
//! GET    /suppliers/{id}              - Detail
//! PUT    /suppliers/{id}              - Update (admin)
//! DELETE /suppliers/{id}              - Delete when lot-free (admin)
//!
//! # Products
//! GET    /products                    - Product list
//! POST   /products                    - Create (admin)
//! GET    /products/{id}               - Detail
//! PATCH  /products/{id}               - Price / availability (admin)
//! GET    /products/{id}/variants      - Variants with cached and live stock
//! POST   /products/{id}/refresh-stock - Recompute one product's cache
//! POST   /stock/refresh               - Recompute every variant (admin)
//!
//! # Orders
//! GET    /orders                      - Order list
//! GET    /orders/{id}                 - Order detail
//! POST   /orders/{id}/status          - Lifecycle transition
//! POST   /orders/{id}/cancel          - Cancel a pending order and restock
//! ```

pub mod orders;
pub mod products;
pub mod storage;
pub mod suppliers;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

fn storage_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(storage::index).post(storage::receive))
        .route("/bulk", post(storage::bulk_receive))
        .route(
            "/{id}",
            get(storage::show)
                .put(storage::update)
                .delete(storage::delete),
        )
}

fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(suppliers::index).post(suppliers::create))
        .route(
            "/{id}",
            get(suppliers::show)
                .put(suppliers::update)
                .delete(suppliers::delete),
        )
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/{id}", get(products::show).patch(products::update))
        .route("/{id}/variants", get(products::variants))
        .route("/{id}/refresh-stock", post(products::refresh_stock))
}

fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/status", post(orders::update_status))
        .route("/{id}/cancel", post(orders::cancel))
}

/// Build the admin API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/storage", storage_routes())
        .nest("/suppliers", supplier_routes())
        .nest("/products", product_routes())
        .route("/stock/refresh", post(products::refresh_all))
        .nest("/orders", order_routes())
}
