//! Shopping cart value type.
//!
//! A [`Cart`] is plain data: the storefront loads it from the visitor's
//! session, mutates it, and writes it back. Nothing here is shared between
//! sessions.
//!
//! Lines are identified by `(item, size, color)`. Each line carries a
//! snapshot of the stock that was available when it was last added, which
//! bounds later quantity changes without a database round-trip. The
//! snapshot is advisory; checkout validates against live lots again.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::inventory::{StockRequest, StockTarget};
use crate::types::{ItemId, VariantId};

/// Errors from cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    /// Quantity must be at least one when adding.
    #[error("quantity must be positive")]
    InvalidQuantity,

    /// The resulting quantity would exceed the stock snapshot.
    #[error("only {available} of '{item_name}' available")]
    ExceedsAvailable { item_name: String, available: i64 },

    /// No line matches the given item, size and color.
    #[error("item is not in the cart")]
    LineNotFound,
}

/// One line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// `None` for legacy items that predate size/color variants.
    pub variant_id: Option<VariantId>,
    pub item_id: ItemId,
    pub item_name: String,
    pub size: String,
    pub color: String,
    pub quantity: i32,
    /// Item sell price plus the variant's price modifier, at time of add.
    pub unit_price: Decimal,
    /// Live stock when the line was last added.
    pub max_quantity: i64,
    pub image: Option<String>,
}

impl CartLine {
    /// What this line draws stock from.
    #[must_use]
    pub fn target(&self) -> StockTarget {
        self.variant_id
            .map_or(StockTarget::LegacyItem(self.item_id), StockTarget::Variant)
    }

    /// `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    fn is(&self, item_id: ItemId, size: &str, color: &str) -> bool {
        self.item_id == item_id && self.size == size && self.color == color
    }
}

/// A visitor's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Lines in the order they were first added.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| i64::from(l.quantity)).sum()
    }

    /// Sum of line totals.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Find a line by its identity.
    #[must_use]
    pub fn find(&self, item_id: ItemId, size: &str, color: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.is(item_id, size, color))
    }

    /// Add a line, merging with an existing line for the same item, size
    /// and color.
    ///
    /// The incoming line's `max_quantity` replaces the stored snapshot, and
    /// the merged quantity must not exceed it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for a non-positive quantity, or
    /// `CartError::ExceedsAvailable` when the merged quantity is too large.
    pub fn add(&mut self, line: CartLine) -> Result<&CartLine, CartError> {
        if line.quantity <= 0 {
            return Err(CartError::InvalidQuantity);
        }

        let position = self
            .lines
            .iter()
            .position(|l| l.is(line.item_id, &line.size, &line.color));

        let merged_quantity = position
            .and_then(|i| self.lines.get(i))
            .map_or(0, |existing| existing.quantity)
            .saturating_add(line.quantity);

        if i64::from(merged_quantity) > line.max_quantity {
            return Err(CartError::ExceedsAvailable {
                item_name: line.item_name,
                available: line.max_quantity,
            });
        }

        let index = match position {
            Some(i) => {
                if let Some(existing) = self.lines.get_mut(i) {
                    existing.quantity = merged_quantity;
                    existing.max_quantity = line.max_quantity;
                    existing.unit_price = line.unit_price;
                }
                i
            }
            None => {
                self.lines.push(line);
                self.lines.len() - 1
            }
        };

        self.lines.get(index).ok_or(CartError::LineNotFound)
    }

    /// Set a line's quantity. A quantity of zero or less removes the line.
    ///
    /// Returns the updated line, or `None` if it was removed.
    ///
    /// # Errors
    ///
    /// Returns `CartError::LineNotFound` if no line matches, or
    /// `CartError::ExceedsAvailable` when `quantity` exceeds the line's
    /// stock snapshot.
    pub fn update(
        &mut self,
        item_id: ItemId,
        size: &str,
        color: &str,
        quantity: i32,
    ) -> Result<Option<&CartLine>, CartError> {
        let index = self
            .lines
            .iter()
            .position(|l| l.is(item_id, size, color))
            .ok_or(CartError::LineNotFound)?;

        if quantity <= 0 {
            self.lines.remove(index);
            return Ok(None);
        }

        let line = self.lines.get_mut(index).ok_or(CartError::LineNotFound)?;
        if i64::from(quantity) > line.max_quantity {
            return Err(CartError::ExceedsAvailable {
                item_name: line.item_name.clone(),
                available: line.max_quantity,
            });
        }
        line.quantity = quantity;
        Ok(Some(&*line))
    }

    /// Remove a line. Returns whether a line was removed.
    pub fn remove(&mut self, item_id: ItemId, size: &str, color: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| !l.is(item_id, size, color));
        self.lines.len() != before
    }

    /// Remove the line for a variant. Returns whether a line was removed.
    pub fn remove_variant(&mut self, variant_id: VariantId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.variant_id != Some(variant_id));
        self.lines.len() != before
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Validator input for the current lines.
    #[must_use]
    pub fn stock_requests(&self) -> Vec<StockRequest> {
        self.lines
            .iter()
            .map(|l| StockRequest {
                target: l.target(),
                item_name: l.item_name.clone(),
                size: l.size.clone(),
                color: l.color.clone(),
                quantity: l.quantity,
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(item: i32, size: &str, color: &str, quantity: i32, max: i64) -> CartLine {
        CartLine {
            variant_id: Some(VariantId::new(item * 100)),
            item_id: ItemId::new(item),
            item_name: format!("Item {item}"),
            size: size.to_string(),
            color: color.to_string(),
            quantity,
            unit_price: Decimal::new(120_000, 0),
            max_quantity: max,
            image: None,
        }
    }

    #[test]
    fn test_add_merges_same_item_size_color() {
        let mut cart = Cart::new();
        cart.add(line(1, "M", "Red", 2, 10)).unwrap();
        let merged = cart.add(line(1, "M", "Red", 3, 10)).unwrap();

        assert_eq!(merged.quantity, 5);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn test_add_keeps_distinct_colors_separate() {
        let mut cart = Cart::new();
        cart.add(line(1, "M", "Red", 1, 10)).unwrap();
        cart.add(line(1, "M", "Blue", 1, 10)).unwrap();
        assert_eq!(cart.lines().len(), 2);
    }

    #[test]
    fn test_add_beyond_snapshot_rejected_and_unchanged() {
        let mut cart = Cart::new();
        cart.add(line(1, "L", "Black", 4, 5)).unwrap();

        let err = cart.add(line(1, "L", "Black", 2, 5)).unwrap_err();
        assert_eq!(
            err,
            CartError::ExceedsAvailable {
                item_name: "Item 1".to_string(),
                available: 5
            }
        );
        assert_eq!(cart.item_count(), 4);
    }

    #[test]
    fn test_add_rejects_non_positive() {
        let mut cart = Cart::new();
        assert_eq!(
            cart.add(line(1, "S", "White", 0, 5)).unwrap_err(),
            CartError::InvalidQuantity
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_to_zero_removes_line() {
        let mut cart = Cart::new();
        cart.add(line(1, "M", "Red", 2, 10)).unwrap();
        assert_eq!(cart.update(ItemId::new(1), "M", "Red", 0).unwrap(), None);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_above_snapshot_fails() {
        let mut cart = Cart::new();
        cart.add(line(1, "M", "Red", 2, 3)).unwrap();
        assert!(matches!(
            cart.update(ItemId::new(1), "M", "Red", 4),
            Err(CartError::ExceedsAvailable { available: 3, .. })
        ));
        assert_eq!(cart.update(ItemId::new(1), "M", "Red", 3).unwrap().unwrap().quantity, 3);
    }

    #[test]
    fn test_update_unknown_line() {
        let mut cart = Cart::new();
        assert_eq!(
            cart.update(ItemId::new(9), "M", "Red", 1).unwrap_err(),
            CartError::LineNotFound
        );
    }

    #[test]
    fn test_total_and_remove() {
        let mut cart = Cart::new();
        cart.add(line(1, "M", "Red", 2, 10)).unwrap();
        cart.add(line(2, "S", "Blue", 1, 10)).unwrap();
        assert_eq!(cart.total(), Decimal::new(360_000, 0));

        assert!(cart.remove(ItemId::new(1), "M", "Red"));
        assert!(!cart.remove(ItemId::new(1), "M", "Red"));
        assert_eq!(cart.total(), Decimal::new(120_000, 0));

        assert!(cart.remove_variant(VariantId::new(200)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_legacy_line_targets_item() {
        let mut legacy = line(3, "", "", 1, 2);
        legacy.variant_id = None;
        let mut cart = Cart::new();
        cart.add(legacy).unwrap();

        let requests = cart.stock_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].target, StockTarget::LegacyItem(ItemId::new(3)));
    }

    #[test]
    fn test_serializes_as_line_array() {
        let mut cart = Cart::new();
        cart.add(line(1, "M", "Red", 1, 1)).unwrap();
        let json = serde_json::to_value(&cart).unwrap();
        assert!(json.is_array());
        let back: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(back, cart);
    }
}
