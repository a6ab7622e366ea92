//! Business logic services for storefront.
//!
//! # Services
//!
//! - `cart` - Session-scoped cart extractor
//! - `payments` - PayPal and VNPay gateway clients

pub mod cart;
pub mod payments;

pub use cart::SessionCart;
