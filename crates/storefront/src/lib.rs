//! Threadline Storefront library.
//!
//! The public JSON API: catalog, session cart, checkout, payment gateway
//! returns, and customer order history. The binary in `main.rs` wires these
//! modules into an Axum server; integration tests use them directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
