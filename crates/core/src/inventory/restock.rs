//! Restock planning for cancelled orders.
//!
//! A cancellation puts each detail's quantity back on the first lot (lowest
//! id) of the same target. It does not try to work out which lots the
//! original checkout drained.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::StockTarget;
use crate::types::LotId;

/// One order detail to put back on the shelf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestockLine {
    pub target: StockTarget,
    pub quantity: i32,
}

/// Units to add to one lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Restock {
    pub lot_id: LotId,
    pub target: StockTarget,
    pub quantity: i32,
}

/// No lot exists to receive returned stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no storage lot to restock {target}")]
pub struct MissingLot {
    pub target: StockTarget,
}

/// Plan the restock of `lines` given the first lot of each target.
///
/// Quantities for the same lot are merged. The plan is ordered by lot id so
/// concurrent cancellations update rows in the same order.
///
/// # Errors
///
/// Returns `MissingLot` for the first target with no lot in `first_lots`.
pub fn plan_restock(
    lines: &[RestockLine],
    first_lots: &HashMap<StockTarget, LotId>,
) -> Result<Vec<Restock>, MissingLot> {
    let mut merged: BTreeMap<LotId, Restock> = BTreeMap::new();

    for line in lines {
        if line.quantity <= 0 {
            continue;
        }
        let lot_id = *first_lots
            .get(&line.target)
            .ok_or(MissingLot {
                target: line.target,
            })?;
        merged
            .entry(lot_id)
            .and_modify(|r| r.quantity += line.quantity)
            .or_insert(Restock {
                lot_id,
                target: line.target,
                quantity: line.quantity,
            });
    }

    Ok(merged.into_values().collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{ItemId, VariantId};

    #[test]
    fn test_restock_targets_first_lot() {
        let a = StockTarget::Variant(VariantId::new(1));
        let first = HashMap::from([(a, LotId::new(10))]);

        let plan = plan_restock(&[RestockLine { target: a, quantity: 2 }], &first).unwrap();
        assert_eq!(
            plan,
            vec![Restock {
                lot_id: LotId::new(10),
                target: a,
                quantity: 2
            }]
        );
    }

    #[test]
    fn test_restock_merges_duplicate_targets() {
        let a = StockTarget::Variant(VariantId::new(1));
        let legacy = StockTarget::LegacyItem(ItemId::new(3));
        let first = HashMap::from([(a, LotId::new(20)), (legacy, LotId::new(5))]);

        let lines = [
            RestockLine { target: a, quantity: 1 },
            RestockLine { target: legacy, quantity: 4 },
            RestockLine { target: a, quantity: 3 },
        ];
        let plan = plan_restock(&lines, &first).unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].lot_id, LotId::new(5));
        assert_eq!(plan[0].quantity, 4);
        assert_eq!(plan[1].lot_id, LotId::new(20));
        assert_eq!(plan[1].quantity, 4);
    }

    #[test]
    fn test_missing_lot_is_an_error() {
        let a = StockTarget::Variant(VariantId::new(7));
        let err = plan_restock(&[RestockLine { target: a, quantity: 1 }], &HashMap::new())
            .unwrap_err();
        assert_eq!(err.target, a);
        assert_eq!(err.to_string(), "no storage lot to restock variant 7");
    }
}
