//! Transactional repositories shared by the storefront and admin binaries.
//!
//! # Schema: `shop`
//!
//! ## Tables
//!
//! - `category`, `item`, `product_variant` - Catalog (variant `stock_quantity` is a cache)
//! - `supplier`, `storage_lot` - Storage ledger, the source of truth for stock
//! - `orders`, `order_detail` - Placed orders
//! - `customer`, `staff` - Identities referenced by orders and sessions
//! - `discount_code` - Server-side discounts
//!
//! # Migrations
//!
//! Migrations are stored in `crates/core/migrations/` and run via:
//! ```bash
//! cargo run -p threadline-cli -- migrate
//! ```

pub mod cancel;
pub mod checkout;
pub mod discounts;
pub mod ledger;
pub mod orders;

use thiserror::Error;

pub use cancel::{CancelError, CancelledOrder, Requester, cancel_order};
pub use checkout::{CheckoutError, CheckoutRequest, PlacedOrder, place_order};
pub use orders::{OrderFilter, OrderRepository, StatusUpdateError};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate variant, referenced lot).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map unique and foreign-key violations to `Conflict` with `message`,
    /// passing every other error through.
    #[must_use]
    pub fn from_constraint(err: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && (db_err.is_unique_violation() || db_err.is_foreign_key_violation())
        {
            return Self::Conflict(message.to_string());
        }
        Self::Database(err)
    }
}

/// Convert ids to the `int[]` form used with `= ANY($1)`.
pub(crate) fn id_array<T: Copy + Into<i32>>(ids: &[T]) -> Vec<i32> {
    ids.iter().map(|&id| id.into()).collect()
}
