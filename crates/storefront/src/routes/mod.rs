//! HTTP route handlers for storefront.
//!
//! Every endpoint returns typed JSON.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                         - Liveness check
//! GET  /health/ready                   - Readiness check (database)
//!
//! # Products
//! GET  /products                       - Product listing (?category=&q=&page=)
//! GET  /products/{id}                  - Product detail with in-stock variants
//! GET  /products/{id}/variant          - Variant lookup (?size=&color=)
//!
//! # Cart (session)
//! GET  /cart                           - Cart contents and totals
//! POST /cart/add                       - Add a variant by size and color
//! POST /cart/add-legacy                - Add an item sold without variants
//! POST /cart/update                    - Set a line's quantity (<= 0 removes)
//! POST /cart/remove                    - Remove a line
//! POST /cart/clear                     - Empty the cart
//! GET  /cart/count                     - Item count badge
//! GET  /cart/check-stock               - Informational stock check
//!
//! # Checkout
//! GET  /checkout                       - Preview (?discount_code=)
//! POST /checkout                       - Place a cash-on-delivery order
//! POST /checkout/paypal                - Start a PayPal payment
//! GET  /checkout/paypal/success        - PayPal approval return
//! GET  /checkout/paypal/cancel         - PayPal cancel return
//! POST /checkout/vnpay                 - Start a VNPay payment
//! GET  /checkout/vnpay/return          - VNPay return (path configurable)
//!
//! # Account (requires sign-in)
//! GET  /account/orders                 - Order history
//! GET  /account/orders/{id}            - Order detail
//! POST /account/orders/{id}/cancel     - Cancel a pending order
//! ```

pub mod account;
pub mod cart;
pub mod checkout;
pub mod payments;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
        .route("/{id}/variant", get(products::variant))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/add-legacy", post(cart::add_legacy))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
        .route("/check-stock", get(cart::check_stock))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::preview).post(checkout::place_cod))
        .route("/paypal", post(payments::paypal_create))
        .route("/paypal/success", get(payments::paypal_success))
        .route("/paypal/cancel", get(payments::paypal_cancel))
        .route("/vnpay", post(payments::vnpay_create))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(account::orders))
        .route("/orders/{id}", get(account::order))
        .route("/orders/{id}/cancel", post(account::cancel))
}

/// Create all routes for the storefront.
///
/// `vnpay_return_path` is where VNPay sends the customer back to.
pub fn routes(vnpay_return_path: &str) -> Router<AppState> {
    Router::new()
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .route(vnpay_return_path, get(payments::vnpay_return))
        .nest("/account", account_routes())
}
