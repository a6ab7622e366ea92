//! Stock validation against live lot sums.
//!
//! The validator never trusts the cached `stock_quantity` on variants. The
//! caller builds a [`StockSnapshot`] from the lots themselves; at checkout
//! commit that snapshot is read under `FOR UPDATE` locks, which is what makes
//! the second validation binding.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{LotBalance, StockTarget, available_stock};

/// One requested quantity, as derived from a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRequest {
    pub target: StockTarget,
    /// Name shown in failure messages.
    pub item_name: String,
    pub size: String,
    pub color: String,
    pub quantity: i32,
}

impl StockRequest {
    fn label(&self) -> String {
        match (self.size.is_empty(), self.color.is_empty()) {
            (true, true) => format!("'{}'", self.item_name),
            (false, true) => format!("'{}' ({})", self.item_name, self.size),
            (true, false) => format!("'{}' ({})", self.item_name, self.color),
            (false, false) => format!("'{}' ({}/{})", self.item_name, self.size, self.color),
        }
    }
}

/// Why a set of requests cannot be satisfied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StockError {
    /// Nothing to check out.
    #[error("cart empty")]
    EmptyCart,

    /// The variant (or legacy item) no longer exists.
    #[error("product not found: '{name}'")]
    ProductNotFound { name: String },

    /// Fewer units are in stock than requested.
    #[error("Product {label} only has {available} left in stock")]
    Insufficient {
        /// Item name with size and color, quoted.
        label: String,
        available: i64,
        requested: i64,
    },
}

/// Live availability per stock target.
///
/// A target missing from the snapshot means the product does not exist. A
/// product that exists with no lots is present with zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockSnapshot {
    available: HashMap<StockTarget, i64>,
}

impl StockSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `target` exists and has the given lots.
    pub fn insert_lots(&mut self, target: StockTarget, lots: &[LotBalance]) {
        self.available.insert(target, available_stock(lots));
    }

    /// Record a pre-summed availability for `target`.
    pub fn insert(&mut self, target: StockTarget, available: i64) {
        self.available.insert(target, available);
    }

    /// Availability of `target`, or `None` when the product is gone.
    #[must_use]
    pub fn available(&self, target: &StockTarget) -> Option<i64> {
        self.available.get(target).copied()
    }
}

/// Sum requests per target, keeping first-seen order and the first
/// request's labels for messages.
fn aggregate(requests: &[StockRequest]) -> Vec<(&StockRequest, i64)> {
    let mut totals: Vec<(&StockRequest, i64)> = Vec::new();
    for request in requests {
        if let Some((_, total)) = totals.iter_mut().find(|(r, _)| r.target == request.target) {
            *total += i64::from(request.quantity);
        } else {
            totals.push((request, i64::from(request.quantity)));
        }
    }
    totals
}

/// Every problem with `requests`, in cart order.
///
/// Used by the informational check, which reports all offending lines at
/// once. An empty request list yields no shortages; use [`validate`] to
/// reject empty carts.
#[must_use]
pub fn shortages(requests: &[StockRequest], snapshot: &StockSnapshot) -> Vec<StockError> {
    aggregate(requests)
        .into_iter()
        .filter_map(|(request, requested)| match snapshot.available(&request.target) {
            None => Some(StockError::ProductNotFound {
                name: request.item_name.clone(),
            }),
            Some(available) if available < requested => Some(StockError::Insufficient {
                label: request.label(),
                available,
                requested,
            }),
            Some(_) => None,
        })
        .collect()
}

/// Check that every request can be satisfied.
///
/// # Errors
///
/// Returns `StockError::EmptyCart` for an empty request list, otherwise the
/// first shortage found in cart order.
pub fn validate(requests: &[StockRequest], snapshot: &StockSnapshot) -> Result<(), StockError> {
    if requests.is_empty() {
        return Err(StockError::EmptyCart);
    }
    shortages(requests, snapshot)
        .into_iter()
        .next()
        .map_or(Ok(()), Err)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{ItemId, LotId, VariantId};

    fn request(target: StockTarget, name: &str, quantity: i32) -> StockRequest {
        StockRequest {
            target,
            item_name: name.to_string(),
            size: "M".to_string(),
            color: "Black".to_string(),
            quantity,
        }
    }

    fn variant(id: i32) -> StockTarget {
        StockTarget::Variant(VariantId::new(id))
    }

    #[test]
    fn test_empty_cart_fails() {
        let err = validate(&[], &StockSnapshot::new()).unwrap_err();
        assert_eq!(err, StockError::EmptyCart);
        assert_eq!(err.to_string(), "cart empty");
    }

    #[test]
    fn test_insufficient_names_item_and_available() {
        let mut snapshot = StockSnapshot::new();
        snapshot.insert(variant(1), 3);

        let err = validate(&[request(variant(1), "Linen Shirt", 5)], &snapshot).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Linen Shirt"), "{message}");
        assert!(message.contains('3'), "{message}");
        assert_eq!(
            message,
            "Product 'Linen Shirt' (M/Black) only has 3 left in stock"
        );
    }

    #[test]
    fn test_missing_product() {
        let err = validate(&[request(variant(9), "Gone Tee", 1)], &StockSnapshot::new())
            .unwrap_err();
        assert!(matches!(err, StockError::ProductNotFound { ref name } if name == "Gone Tee"));
        assert!(err.to_string().starts_with("product not found"));
    }

    #[test]
    fn test_exact_stock_passes() {
        let mut snapshot = StockSnapshot::new();
        snapshot.insert_lots(
            variant(1),
            &[
                LotBalance::new(LotId::new(1), 2),
                LotBalance::new(LotId::new(2), 3),
            ],
        );
        assert!(validate(&[request(variant(1), "Chino", 5)], &snapshot).is_ok());
    }

    #[test]
    fn test_lines_for_same_target_are_summed() {
        let mut snapshot = StockSnapshot::new();
        snapshot.insert(variant(1), 4);

        let requests = [request(variant(1), "Chino", 3), request(variant(1), "Chino", 2)];
        let err = validate(&requests, &snapshot).unwrap_err();
        assert!(matches!(
            err,
            StockError::Insufficient {
                available: 4,
                requested: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_legacy_item_checked_against_item_lots() {
        let legacy = StockTarget::LegacyItem(ItemId::new(12));
        let mut snapshot = StockSnapshot::new();
        snapshot.insert_lots(legacy, &[LotBalance::new(LotId::new(4), 1)]);

        let mut req = request(legacy, "Old Hoodie", 2);
        req.size = String::new();
        req.color = String::new();
        let err = validate(&[req], &snapshot).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Product 'Old Hoodie' only has 1 left in stock"
        );
    }

    #[test]
    fn test_shortages_reports_every_line() {
        let mut snapshot = StockSnapshot::new();
        snapshot.insert(variant(1), 0);
        snapshot.insert(variant(2), 10);

        let requests = [
            request(variant(1), "A", 1),
            request(variant(2), "B", 1),
            request(variant(3), "C", 1),
        ];
        let found = shortages(&requests, &snapshot);
        assert_eq!(found.len(), 2);
        assert!(matches!(found[0], StockError::Insufficient { .. }));
        assert!(matches!(found[1], StockError::ProductNotFound { .. }));
    }
}
