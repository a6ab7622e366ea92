//! Type-safe price representation using decimal arithmetic.
//!
//! Catalog prices are stored in Vietnamese dong. US dollar amounts only
//! exist at the PayPal boundary, where a configured exchange rate converts
//! an order total before it is sent to the gateway.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (dong, dollars).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a price in dong.
    #[must_use]
    pub const fn vnd(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::VND)
    }

    /// Final unit price of a variant: the item's sell price plus the
    /// variant's price modifier.
    #[must_use]
    pub fn with_modifier(self, modifier: Decimal) -> Self {
        Self::new(self.amount + modifier, self.currency_code)
    }

    /// Convert a dong amount to US dollars using `vnd_per_usd`.
    ///
    /// Rounded half-away-from-zero to cents. Returns `None` for a
    /// non-positive rate or when the price is not in dong.
    #[must_use]
    pub fn to_usd(self, vnd_per_usd: Decimal) -> Option<Self> {
        if self.currency_code != CurrencyCode::VND || vnd_per_usd <= Decimal::ZERO {
            return None;
        }
        let usd = (self.amount / vnd_per_usd)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        Some(Self::new(usd, CurrencyCode::USD))
    }

    /// Amount formatted the way the gateways expect it: two decimals for
    /// dollars, whole units for dong.
    #[must_use]
    pub fn gateway_amount(&self) -> String {
        match self.currency_code {
            CurrencyCode::USD => format!("{:.2}", self.amount),
            CurrencyCode::VND => self.amount.trunc().to_string(),
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.currency_code {
            CurrencyCode::USD => write!(f, "${:.2}", self.amount),
            CurrencyCode::VND => {
                let whole = self.amount.trunc().abs().to_string();
                let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
                for (i, c) in whole.chars().enumerate() {
                    if i > 0 && (whole.len() - i) % 3 == 0 {
                        grouped.push('.');
                    }
                    grouped.push(c);
                }
                if self.amount.is_sign_negative() && !self.amount.trunc().is_zero() {
                    write!(f, "-")?;
                }
                write!(f, "{grouped} ₫")
            }
        }
    }
}

/// ISO 4217 currency codes used by the shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    VND,
    USD,
}

impl CurrencyCode {
    /// The ISO code as sent to payment gateways.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::VND => "VND",
            Self::USD => "USD",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_vnd_display_groups_thousands() {
        assert_eq!(Price::vnd(Decimal::new(150_000, 0)).to_string(), "150.000 ₫");
        assert_eq!(Price::vnd(Decimal::new(999, 0)).to_string(), "999 ₫");
        assert_eq!(
            Price::vnd(Decimal::new(1_250_000, 0)).to_string(),
            "1.250.000 ₫"
        );
    }

    #[test]
    fn test_usd_display() {
        let price = Price::new(Decimal::new(1999, 2), CurrencyCode::USD);
        assert_eq!(price.to_string(), "$19.99");
    }

    #[test]
    fn test_with_modifier_adds() {
        let price = Price::vnd(Decimal::new(200_000, 0)).with_modifier(Decimal::new(15_000, 0));
        assert_eq!(price.amount, Decimal::new(215_000, 0));
    }

    #[test]
    fn test_to_usd_rounds_to_cents() {
        let usd = Price::vnd(Decimal::new(500_000, 0))
            .to_usd(Decimal::new(25_000, 0))
            .unwrap();
        assert_eq!(usd.currency_code, CurrencyCode::USD);
        assert_eq!(usd.gateway_amount(), "20.00");

        let odd = Price::vnd(Decimal::new(100_000, 0))
            .to_usd(Decimal::new(30_000, 0))
            .unwrap();
        assert_eq!(odd.gateway_amount(), "3.33");
    }

    #[test]
    fn test_to_usd_rejects_bad_rate() {
        assert!(Price::vnd(Decimal::ONE).to_usd(Decimal::ZERO).is_none());
    }

    #[test]
    fn test_vnd_gateway_amount_is_whole() {
        assert_eq!(Price::vnd(Decimal::new(1234, 0)).gateway_amount(), "1234");
    }
}
