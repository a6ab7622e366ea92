//! Domain models for storefront.
//!
//! Catalog views returned by the product routes, and the identity and
//! checkout state kept in the session.

pub mod catalog;
pub mod session;

pub use catalog::{
    ItemAvailability, ProductDetail, ProductSummary, VariantAvailability, VariantView,
};
pub use session::{CheckoutInfo, CurrentCustomer, keys as session_keys};
