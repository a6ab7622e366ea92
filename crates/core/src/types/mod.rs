//! Core types for Threadline.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod discount;
pub mod email;
pub mod id;
pub mod page;
pub mod price;
pub mod status;

pub use discount::{DiscountCode, DiscountError, DiscountKind};
pub use email::{Email, EmailError};
pub use id::*;
pub use page::{MAX_PAGE, page_number, page_offset};
pub use price::{CurrencyCode, Price};
pub use status::*;
