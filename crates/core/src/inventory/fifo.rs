//! Oldest-lot-first deduction planning.
//!
//! Lot ids are assigned on receipt, so ascending id is receipt order. Each
//! lot gives `min(lot.remaining, still_needed)`; lots at or below zero are
//! skipped. A plan never drives a lot negative.

use serde::Serialize;

use super::LotBalance;
use crate::types::LotId;

/// Units taken from one lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Deduction {
    pub lot_id: LotId,
    /// Units removed from the lot (always positive).
    pub take: i32,
    /// Lot quantity after the deduction (never negative).
    pub remaining_after: i32,
}

/// Result of planning a deduction across a target's lots.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DeductionPlan {
    pub deductions: Vec<Deduction>,
    /// Units that could not be covered by any lot.
    pub shortfall: i32,
}

impl DeductionPlan {
    /// Every requested unit is covered.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.shortfall == 0
    }

    /// Units the plan removes in total.
    #[must_use]
    pub fn total_taken(&self) -> i64 {
        self.deductions.iter().map(|d| i64::from(d.take)).sum()
    }
}

/// Plan how to take `requested` units from `lots`, oldest lot first.
///
/// The input order does not matter; lots are visited by ascending id.
/// A non-positive request yields an empty, complete plan.
#[must_use]
pub fn plan_deduction(lots: &[LotBalance], requested: i32) -> DeductionPlan {
    let mut ordered: Vec<LotBalance> = lots.to_vec();
    ordered.sort_by_key(|lot| lot.id);

    let mut still_needed = requested.max(0);
    let mut deductions = Vec::new();

    for lot in ordered {
        if still_needed == 0 {
            break;
        }
        if lot.quantity <= 0 {
            continue;
        }

        let take = lot.quantity.min(still_needed);
        still_needed -= take;
        deductions.push(Deduction {
            lot_id: lot.id,
            take,
            remaining_after: lot.quantity - take,
        });
    }

    DeductionPlan {
        deductions,
        shortfall: still_needed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::available_stock;

    fn lots(quantities: &[i32]) -> Vec<LotBalance> {
        quantities
            .iter()
            .zip(1..)
            .map(|(&q, id)| LotBalance::new(LotId::new(id), q))
            .collect()
    }

    fn apply(lots: &[LotBalance], plan: &DeductionPlan) -> Vec<LotBalance> {
        lots.iter()
            .map(|lot| {
                plan.deductions
                    .iter()
                    .find(|d| d.lot_id == lot.id)
                    .map_or(*lot, |d| LotBalance::new(lot.id, d.remaining_after))
            })
            .collect()
    }

    #[test]
    fn test_oldest_lot_drained_first() {
        let before = lots(&[3, 5]);
        let plan = plan_deduction(&before, 4);

        assert!(plan.is_complete());
        let after = apply(&before, &plan);
        let quantities: Vec<i32> = after.iter().map(|l| l.quantity).collect();
        assert_eq!(quantities, vec![0, 4]);
    }

    #[test]
    fn test_input_order_is_irrelevant() {
        let mut shuffled = lots(&[3, 5]);
        shuffled.reverse();
        let plan = plan_deduction(&shuffled, 4);

        assert_eq!(plan.deductions.len(), 2);
        assert_eq!(plan.deductions[0].lot_id, LotId::new(1));
        assert_eq!(plan.deductions[0].take, 3);
        assert_eq!(plan.deductions[1].take, 1);
    }

    #[test]
    fn test_single_lot_covers_request() {
        let plan = plan_deduction(&lots(&[10, 10]), 6);
        assert_eq!(plan.deductions.len(), 1);
        assert_eq!(plan.deductions[0].remaining_after, 4);
    }

    #[test]
    fn test_skips_empty_and_negative_lots() {
        let plan = plan_deduction(&lots(&[0, -2, 5]), 2);
        assert_eq!(plan.deductions.len(), 1);
        assert_eq!(plan.deductions[0].lot_id, LotId::new(3));
    }

    #[test]
    fn test_shortfall_reported_not_hidden() {
        let plan = plan_deduction(&lots(&[2, 1]), 6);
        assert!(!plan.is_complete());
        assert_eq!(plan.shortfall, 3);
        assert_eq!(plan.total_taken(), 3);
        assert!(plan.deductions.iter().all(|d| d.remaining_after == 0));
    }

    #[test]
    fn test_non_positive_request_is_noop() {
        assert_eq!(plan_deduction(&lots(&[4]), 0), DeductionPlan::default());
        assert_eq!(plan_deduction(&lots(&[4]), -3), DeductionPlan::default());
    }

    #[test]
    fn test_sum_decreases_by_request_and_no_lot_goes_negative() {
        let cases: &[(&[i32], i32)] = &[
            (&[3, 5], 8),
            (&[1, 1, 1, 1], 3),
            (&[7, 0, 2, 9], 11),
            (&[4, -1, 6], 10),
            (&[12], 1),
        ];

        for &(quantities, requested) in cases {
            let before = lots(quantities);
            let plan = plan_deduction(&before, requested);
            assert!(plan.is_complete(), "{quantities:?} - {requested}");

            let after = apply(&before, &plan);
            let sum = |ls: &[LotBalance]| ls.iter().map(|l| i64::from(l.quantity)).sum::<i64>();
            assert_eq!(sum(&after), sum(&before) - i64::from(requested));
            assert!(
                after
                    .iter()
                    .zip(&before)
                    .all(|(a, b)| a.quantity >= 0 || a.quantity == b.quantity)
            );
            assert_eq!(
                available_stock(&after),
                available_stock(&before) - i64::from(requested)
            );
        }
    }
}
