//! Product and variant models for back-office catalog management.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use threadline_core::{CategoryId, ItemId, VariantId};

/// A product as staff see it, available or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ItemId,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub name: String,
    pub sell_price: Decimal,
    pub is_available: bool,
    pub cover_image: Option<String>,
    pub variant_count: i64,
    /// Sum of the variants' cached stock.
    pub cached_stock: i64,
    pub created_at: DateTime<Utc>,
}

/// Filters for the product list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub category: Option<CategoryId>,
    pub q: Option<String>,
}

/// A new product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub category_id: Option<CategoryId>,
    pub sell_price: Decimal,
    #[serde(default = "default_available")]
    pub is_available: bool,
    pub cover_image: Option<String>,
}

const fn default_available() -> bool {
    true
}

/// Price and availability changes. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub sell_price: Option<Decimal>,
    pub is_available: Option<bool>,
}

impl ProductUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.sell_price.is_none() && self.is_available.is_none()
    }
}

/// A variant with both the cached and the live stock.
///
/// The two differ when a lot changed without a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantStock {
    pub id: VariantId,
    pub item_id: ItemId,
    pub size: String,
    pub color: String,
    pub price_modifier: Decimal,
    pub image: Option<String>,
    pub cached_stock: i64,
    pub stock_refreshed_at: Option<DateTime<Utc>>,
    /// Sum of the non-negative quantities of the variant's lots.
    pub live_stock: i64,
    pub lot_count: i64,
}

impl VariantStock {
    /// Whether the cached stock disagrees with the lots.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        self.cached_stock != self.live_stock
    }
}

/// Variants of one product.
#[derive(Debug, Clone, Serialize)]
pub struct ProductVariants {
    pub product: Product,
    pub variants: Vec<VariantStock>,
    /// Live stock of legacy lots keyed to the item itself.
    pub legacy_stock: i64,
}

/// Result of a cache refresh.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StockRefresh {
    pub variants_refreshed: u64,
}
