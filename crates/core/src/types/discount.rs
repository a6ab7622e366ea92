//! Discount codes.
//!
//! The discount is always computed on the server from the stored code;
//! clients only send the code string.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// How much a code takes off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DiscountKind {
    /// Fixed amount in dong.
    AmountOff(Decimal),
    /// Percentage of the subtotal (0-100].
    PercentOff(Decimal),
}

/// Why a code cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscountError {
    #[error("discount code '{0}' does not exist")]
    Unknown(String),
    #[error("discount code is no longer active")]
    Inactive,
    #[error("discount code is not valid yet")]
    NotStarted,
    #[error("discount code has expired")]
    Expired,
    #[error("discount code has reached its usage limit")]
    UsageExhausted,
}

/// A stored discount code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountCode {
    pub id: i32,
    pub code: String,
    pub description: String,
    pub kind: DiscountKind,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Zero means unlimited.
    pub max_usage: i32,
    pub used_count: i32,
    pub is_active: bool,
}

impl DiscountCode {
    /// Check the code can be used at `now`.
    ///
    /// # Errors
    ///
    /// Returns the first reason the code is unusable.
    pub fn check(&self, now: DateTime<Utc>) -> Result<(), DiscountError> {
        if !self.is_active {
            return Err(DiscountError::Inactive);
        }
        if now < self.starts_at {
            return Err(DiscountError::NotStarted);
        }
        if now > self.ends_at {
            return Err(DiscountError::Expired);
        }
        if self.max_usage > 0 && self.used_count >= self.max_usage {
            return Err(DiscountError::UsageExhausted);
        }
        Ok(())
    }

    /// Amount taken off `subtotal`, never more than the subtotal itself.
    ///
    /// Percentages round to whole dong.
    #[must_use]
    pub fn discount_for(&self, subtotal: Decimal) -> Decimal {
        let raw = match self.kind {
            DiscountKind::AmountOff(amount) => amount,
            DiscountKind::PercentOff(percent) => (subtotal * percent / Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
        };
        raw.max(Decimal::ZERO).min(subtotal.max(Decimal::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn code(kind: DiscountKind) -> DiscountCode {
        let now = Utc::now();
        DiscountCode {
            id: 1,
            code: "SUMMER".to_string(),
            description: String::new(),
            kind,
            starts_at: now - Duration::days(1),
            ends_at: now + Duration::days(1),
            max_usage: 0,
            used_count: 0,
            is_active: true,
        }
    }

    #[test]
    fn test_percent_rounds_to_whole_dong() {
        let c = code(DiscountKind::PercentOff(Decimal::new(15, 0)));
        assert_eq!(c.discount_for(Decimal::new(199_999, 0)), Decimal::new(30_000, 0));
    }

    #[test]
    fn test_amount_capped_at_subtotal() {
        let c = code(DiscountKind::AmountOff(Decimal::new(50_000, 0)));
        assert_eq!(c.discount_for(Decimal::new(30_000, 0)), Decimal::new(30_000, 0));
        assert_eq!(c.discount_for(Decimal::new(80_000, 0)), Decimal::new(50_000, 0));
    }

    #[test]
    fn test_check_window_and_usage() {
        let now = Utc::now();
        let mut c = code(DiscountKind::AmountOff(Decimal::ONE));
        assert!(c.check(now).is_ok());

        assert_eq!(c.check(now + Duration::days(2)), Err(DiscountError::Expired));
        assert_eq!(c.check(now - Duration::days(2)), Err(DiscountError::NotStarted));

        c.max_usage = 3;
        c.used_count = 3;
        assert_eq!(c.check(now), Err(DiscountError::UsageExhausted));

        c.is_active = false;
        assert_eq!(c.check(now), Err(DiscountError::Inactive));
    }
}
