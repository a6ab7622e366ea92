//! Threadline Core - Shared domain types and stock reconciliation.
//!
//! This crate provides the pieces shared by every Threadline component:
//! - `storefront` - Public JSON API (catalog, cart, checkout, payments)
//! - `admin` - Back-office API (storage lots, suppliers, orders)
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! Without features, the crate contains only types and pure algorithms: no
//! I/O, no database access. The `postgres` feature adds the transactional
//! repositories that both binaries use to mutate the storage ledger, so that
//! checkout and cancellation follow exactly one code path.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, emails, and order statuses
//! - [`cart`] - Session-scoped shopping cart value
//! - [`inventory`] - Stock validation, FIFO deduction and restock planning
//! - [`order`] - Orders, order lines and checkout contact details
//! - `db` - Ledger, checkout, cancellation and order repositories (`postgres` feature)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
#[cfg(feature = "postgres")]
pub mod db;
pub mod inventory;
pub mod order;
pub mod types;

pub use types::*;
