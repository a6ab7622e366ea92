//! Stock reconciliation algorithms.
//!
//! Storage lots are the source of truth for availability. Everything in
//! this module is pure: callers load lot balances (under row locks when the
//! result is binding), run a planner, then apply the plan in the same
//! transaction.
//!
//! - [`validator`] - Compare requested quantities with live lot sums
//! - [`fifo`] - Oldest-lot-first deduction planning for checkout
//! - [`restock`] - First-match lot planning for cancellations

pub mod fifo;
pub mod restock;
pub mod validator;

use serde::{Deserialize, Serialize};

use crate::types::{ItemId, LotId, VariantId};

pub use fifo::{Deduction, DeductionPlan, plan_deduction};
pub use restock::{MissingLot, Restock, RestockLine, plan_restock};
pub use validator::{StockError, StockRequest, StockSnapshot, shortages, validate};

/// What a storage lot (or cart line, or order detail) is stocked against.
///
/// Variant lots are the current model. Legacy lots predate size/color
/// variants and reference the flat item directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum StockTarget {
    Variant(VariantId),
    LegacyItem(ItemId),
}

impl StockTarget {
    /// Build a target from the nullable column pair used by lots and order
    /// details. A variant id wins when both are present.
    #[must_use]
    pub fn from_columns(variant_id: Option<VariantId>, item_id: Option<ItemId>) -> Option<Self> {
        variant_id
            .map(Self::Variant)
            .or_else(|| item_id.map(Self::LegacyItem))
    }

    /// The variant id, if this is a variant target.
    #[must_use]
    pub const fn variant_id(&self) -> Option<VariantId> {
        match self {
            Self::Variant(id) => Some(*id),
            Self::LegacyItem(_) => None,
        }
    }

    /// The item id, if this is a legacy target.
    #[must_use]
    pub const fn legacy_item_id(&self) -> Option<ItemId> {
        match self {
            Self::Variant(_) => None,
            Self::LegacyItem(id) => Some(*id),
        }
    }
}

impl std::fmt::Display for StockTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Variant(id) => write!(f, "variant {id}"),
            Self::LegacyItem(id) => write!(f, "item {id}"),
        }
    }
}

/// Current quantity of one storage lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotBalance {
    pub id: LotId,
    pub quantity: i32,
}

impl LotBalance {
    #[must_use]
    pub const fn new(id: LotId, quantity: i32) -> Self {
        Self { id, quantity }
    }
}

/// Real stock of a target: the sum of its non-negative lot quantities.
///
/// Negative lots (manual corrections gone wrong) count as empty rather than
/// hiding stock held in other lots.
#[must_use]
pub fn available_stock(lots: &[LotBalance]) -> i64 {
    lots.iter().map(|lot| i64::from(lot.quantity.max(0))).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_stock_ignores_negative_lots() {
        let lots = [
            LotBalance::new(LotId::new(1), 4),
            LotBalance::new(LotId::new(2), -3),
            LotBalance::new(LotId::new(3), 6),
        ];
        assert_eq!(available_stock(&lots), 10);
        assert_eq!(available_stock(&[]), 0);
    }

    #[test]
    fn test_target_from_columns_prefers_variant() {
        assert_eq!(
            StockTarget::from_columns(Some(VariantId::new(5)), Some(ItemId::new(9))),
            Some(StockTarget::Variant(VariantId::new(5)))
        );
        assert_eq!(
            StockTarget::from_columns(None, Some(ItemId::new(9))),
            Some(StockTarget::LegacyItem(ItemId::new(9)))
        );
        assert_eq!(StockTarget::from_columns(None, None), None);
    }

    #[test]
    fn test_variants_lock_before_legacy_items() {
        let mut targets = vec![
            StockTarget::LegacyItem(ItemId::new(1)),
            StockTarget::Variant(VariantId::new(8)),
            StockTarget::Variant(VariantId::new(2)),
        ];
        targets.sort();
        assert_eq!(
            targets,
            vec![
                StockTarget::Variant(VariantId::new(2)),
                StockTarget::Variant(VariantId::new(8)),
                StockTarget::LegacyItem(ItemId::new(1)),
            ]
        );
    }
}
