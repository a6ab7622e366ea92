//! Threadline Admin library.
//!
//! Back-office API for the storage ledger: receiving lots, suppliers, the
//! product catalog, the variant stock cache and the order lifecycle.
//!
//! # Security
//!
//! Every route requires a staff session. Ledger and catalog writes require
//! the admin role; order handling is open to any staff member.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
