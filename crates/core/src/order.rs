//! Orders and order lines.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::inventory::StockTarget;
use crate::types::{CustomerId, ItemId, OrderDetailId, OrderId, OrderStatus, PaymentMethod, VariantId};

/// Shipping and contact details captured at checkout.
///
/// Stored on the order as a snapshot; later edits to the customer's
/// profile do not change placed orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub recipient_name: String,
    pub phone: String,
    pub shipping_address: String,
}

/// Problems with submitted contact details.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContactError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("phone number must contain 9 to 15 digits")]
    InvalidPhone,
}

impl ContactInfo {
    /// Trim every field and check none is empty.
    ///
    /// # Errors
    ///
    /// Returns the first missing field, or `InvalidPhone` when the phone
    /// number does not have 9-15 digits.
    pub fn normalized(self) -> Result<Self, ContactError> {
        let recipient_name = self.recipient_name.trim().to_string();
        let phone = self.phone.trim().to_string();
        let shipping_address = self.shipping_address.trim().to_string();

        if recipient_name.is_empty() {
            return Err(ContactError::Missing("recipient name"));
        }
        if phone.is_empty() {
            return Err(ContactError::Missing("phone"));
        }
        if shipping_address.is_empty() {
            return Err(ContactError::Missing("shipping address"));
        }

        let digits = phone.chars().filter(char::is_ascii_digit).count();
        let allowed = |c: char| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '.');
        if !(9..=15).contains(&digits) || !phone.chars().all(allowed) {
            return Err(ContactError::InvalidPhone);
        }

        Ok(Self {
            recipient_name,
            phone,
            shipping_address,
        })
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// `None` for guest checkouts.
    pub customer_id: Option<CustomerId>,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_reference: Option<String>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub discount_code: Option<String>,
    pub total: Decimal,
    pub contact: ContactInfo,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of a placed order, with the unit price it sold at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub id: OrderDetailId,
    pub order_id: OrderId,
    /// `None` for legacy item-keyed lines.
    pub variant_id: Option<VariantId>,
    pub item_id: ItemId,
    pub item_name: String,
    pub size: String,
    pub color: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl OrderDetail {
    /// The lots this line was taken from (and is restocked to).
    #[must_use]
    pub fn target(&self) -> StockTarget {
        self.variant_id
            .map_or(StockTarget::LegacyItem(self.item_id), StockTarget::Variant)
    }

    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// An order together with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWithDetails {
    #[serde(flatten)]
    pub order: Order,
    pub details: Vec<OrderDetail>,
}

/// Order total: subtotal minus discount, never below zero.
#[must_use]
pub fn order_total(subtotal: Decimal, discount: Decimal) -> Decimal {
    (subtotal - discount.max(Decimal::ZERO)).max(Decimal::ZERO)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn contact(name: &str, phone: &str, address: &str) -> ContactInfo {
        ContactInfo {
            recipient_name: name.to_string(),
            phone: phone.to_string(),
            shipping_address: address.to_string(),
        }
    }

    #[test]
    fn test_contact_is_trimmed() {
        let c = contact(" Lan ", " 0901 234 567 ", " 12 Le Loi, Q1 ")
            .normalized()
            .unwrap();
        assert_eq!(c.recipient_name, "Lan");
        assert_eq!(c.phone, "0901 234 567");
        assert_eq!(c.shipping_address, "12 Le Loi, Q1");
    }

    #[test]
    fn test_contact_requires_fields() {
        assert_eq!(
            contact("", "0901234567", "x").normalized(),
            Err(ContactError::Missing("recipient name"))
        );
        assert_eq!(
            contact("Lan", "0901234567", "  ").normalized(),
            Err(ContactError::Missing("shipping address"))
        );
    }

    #[test]
    fn test_contact_rejects_bad_phone() {
        assert_eq!(
            contact("Lan", "12345", "x").normalized(),
            Err(ContactError::InvalidPhone)
        );
        assert_eq!(
            contact("Lan", "0901-234-56a", "x").normalized(),
            Err(ContactError::InvalidPhone)
        );
    }

    #[test]
    fn test_order_total_never_negative() {
        assert_eq!(
            order_total(Decimal::new(100, 0), Decimal::new(30, 0)),
            Decimal::new(70, 0)
        );
        assert_eq!(
            order_total(Decimal::new(100, 0), Decimal::new(300, 0)),
            Decimal::ZERO
        );
        assert_eq!(
            order_total(Decimal::new(100, 0), Decimal::new(-5, 0)),
            Decimal::new(100, 0)
        );
    }

    #[test]
    fn test_legacy_detail_targets_item() {
        let detail = OrderDetail {
            id: OrderDetailId::new(1),
            order_id: OrderId::new(1),
            variant_id: None,
            item_id: ItemId::new(4),
            item_name: "Old Tee".to_string(),
            size: String::new(),
            color: String::new(),
            quantity: 2,
            unit_price: Decimal::new(50_000, 0),
        };
        assert_eq!(detail.target(), StockTarget::LegacyItem(ItemId::new(4)));
        assert_eq!(detail.line_total(), Decimal::new(100_000, 0));
    }
}
