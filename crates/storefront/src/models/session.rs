//! Session-related types.
//!
//! Types stored in the session alongside the cart.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use threadline_core::order::ContactInfo;
use threadline_core::{CustomerId, Email};

/// Session-stored customer identity.
///
/// Placed in the session by the sign-in flow; the storefront only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentCustomer {
    /// Customer's database ID.
    pub id: CustomerId,
    /// Customer's email address.
    pub email: Email,
}

/// Checkout details kept between a gateway redirect and its return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutInfo {
    pub contact: ContactInfo,
    pub discount_code: Option<String>,
    /// Discount shown to the customer before the redirect.
    pub discount: Decimal,
    /// Total the gateway was asked to charge, in dong.
    pub total: Decimal,
    /// Gateway-side id of the pending payment, when the gateway issues one.
    pub gateway_reference: Option<String>,
}

/// Session keys.
pub mod keys {
    /// Key for storing the current signed-in customer.
    pub const CURRENT_CUSTOMER: &str = "current_customer";

    /// Key for the visitor's cart.
    pub const CART: &str = "cart";

    /// Key for checkout details awaiting a gateway return.
    pub const CHECKOUT_INFO: &str = "checkout_info";
}
