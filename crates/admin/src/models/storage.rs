//! Storage lot domain models.
//!
//! A lot is one receipt of stock from a supplier. Variant lots carry a
//! size and color; legacy lots only name an item.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use threadline_core::{ItemId, LotId, SupplierId, VariantId, page_number, page_offset};

/// Lots shown per page in the storage list.
pub const LOTS_PER_PAGE: i64 = 15;

/// Lots with fewer units than this (and more than zero) are low on stock.
pub const LOW_STOCK_THRESHOLD: i32 = 10;

/// A storage lot with the names needed to display it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lot {
    pub id: LotId,
    /// `None` for legacy item-keyed lots.
    pub variant_id: Option<VariantId>,
    pub item_id: ItemId,
    pub item_name: String,
    pub category_name: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub supplier_id: SupplierId,
    pub supplier_name: String,
    pub quantity: i32,
    /// Cost per unit, in dong.
    pub import_cost: Decimal,
    pub import_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Lot {
    /// Value of the units left in this lot.
    #[must_use]
    pub fn stock_value(&self) -> Decimal {
        self.import_cost * Decimal::from(self.quantity)
    }

    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        self.quantity > 0 && self.quantity < LOW_STOCK_THRESHOLD
    }
}

/// Filters for the storage list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LotFilter {
    /// Case-insensitive match on supplier or item name.
    pub search: Option<String>,
    #[serde(default)]
    pub low_stock: bool,
    pub page: Option<i64>,
}

impl LotFilter {
    /// 1-based page, at least 1.
    #[must_use]
    pub fn page(&self) -> i64 {
        page_number(self.page)
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        page_offset(self.page(), LOTS_PER_PAGE)
    }

    /// Trimmed search term, `None` when blank.
    #[must_use]
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// One page of lots with totals over every lot matching the filter.
#[derive(Debug, Clone, Serialize)]
pub struct LotPage {
    pub lots: Vec<Lot>,
    pub page: i64,
    pub page_size: i64,
    pub total_lots: i64,
    pub total_pages: i64,
    /// Σ import cost × quantity.
    pub total_cost: Decimal,
    pub latest_import_date: Option<NaiveDate>,
}

/// Page count for `total` rows.
#[must_use]
pub const fn page_count(total: i64, page_size: i64) -> i64 {
    if total <= 0 {
        0
    } else {
        (total + page_size - 1) / page_size
    }
}

/// Receive stock for one variant.
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiveLot {
    pub item_id: ItemId,
    pub size: String,
    pub color: String,
    pub supplier_id: SupplierId,
    pub quantity: i32,
    pub import_cost: Decimal,
    /// Defaults to today.
    pub import_date: Option<NaiveDate>,
    /// Also set the item's sell price.
    pub sell_price: Option<Decimal>,
}

/// Why a receipt was rejected before touching the database.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReceiptError {
    #[error("size and color are required")]
    MissingSizeOrColor,
    #[error("quantity must be positive")]
    InvalidQuantity,
    #[error("import cost cannot be negative")]
    NegativeCost,
    #[error("sell price must be positive")]
    InvalidSellPrice,
    #[error("at least one size and one color are required")]
    NoCombinations,
}

fn check_amounts(
    quantity: i32,
    import_cost: Decimal,
    sell_price: Option<Decimal>,
) -> Result<(), ReceiptError> {
    if quantity <= 0 {
        return Err(ReceiptError::InvalidQuantity);
    }
    if import_cost.is_sign_negative() {
        return Err(ReceiptError::NegativeCost);
    }
    if sell_price.is_some_and(|p| p <= Decimal::ZERO) {
        return Err(ReceiptError::InvalidSellPrice);
    }
    Ok(())
}

impl ReceiveLot {
    /// Trim size and color and check the amounts.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn normalized(mut self) -> Result<Self, ReceiptError> {
        self.size = self.size.trim().to_string();
        self.color = self.color.trim().to_string();
        if self.size.is_empty() || self.color.is_empty() {
            return Err(ReceiptError::MissingSizeOrColor);
        }
        check_amounts(self.quantity, self.import_cost, self.sell_price)?;
        Ok(self)
    }
}

/// Receive the same quantity and cost for every size × color combination.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkReceive {
    pub item_id: ItemId,
    pub supplier_id: SupplierId,
    /// Comma-separated, e.g. `"S, M, L"`.
    pub sizes: String,
    /// Comma-separated, e.g. `"Black, White"`.
    pub colors: String,
    pub quantity: i32,
    pub import_cost: Decimal,
    pub import_date: Option<NaiveDate>,
}

fn split_list(list: &str) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for value in list.split(',').map(str::trim).filter(|v| !v.is_empty()) {
        if !values.iter().any(|v| v == value) {
            values.push(value.to_string());
        }
    }
    values
}

impl BulkReceive {
    /// One receipt per combination, sizes outermost.
    ///
    /// # Errors
    ///
    /// Returns `ReceiptError::NoCombinations` when either list is empty, or
    /// an amount error.
    pub fn receipts(&self) -> Result<Vec<ReceiveLot>, ReceiptError> {
        let sizes = split_list(&self.sizes);
        let colors = split_list(&self.colors);
        if sizes.is_empty() || colors.is_empty() {
            return Err(ReceiptError::NoCombinations);
        }
        check_amounts(self.quantity, self.import_cost, None)?;

        Ok(sizes
            .iter()
            .flat_map(|size| {
                colors.iter().map(move |color| ReceiveLot {
                    item_id: self.item_id,
                    size: size.clone(),
                    color: color.clone(),
                    supplier_id: self.supplier_id,
                    quantity: self.quantity,
                    import_cost: self.import_cost,
                    import_date: self.import_date,
                    sell_price: None,
                })
            })
            .collect())
    }
}

/// Outcome of a bulk receipt. Combinations fail independently.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkReceipt {
    pub imported: usize,
    pub lots: Vec<LotId>,
    /// One entry per failed combination.
    pub errors: Vec<String>,
}

/// Editable fields of a lot.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateLot {
    pub quantity: i32,
    pub import_cost: Decimal,
    pub import_date: NaiveDate,
    pub supplier_id: SupplierId,
}

impl UpdateLot {
    /// # Errors
    ///
    /// Returns `ReceiptError::NegativeCost` for a negative cost. Quantity
    /// may be any value, including zero for an exhausted lot.
    pub fn validate(&self) -> Result<(), ReceiptError> {
        if self.import_cost.is_sign_negative() {
            return Err(ReceiptError::NegativeCost);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn bulk(sizes: &str, colors: &str) -> BulkReceive {
        BulkReceive {
            item_id: ItemId::new(7),
            supplier_id: SupplierId::new(2),
            sizes: sizes.to_string(),
            colors: colors.to_string(),
            quantity: 20,
            import_cost: Decimal::from(90_000),
            import_date: None,
        }
    }

    #[test]
    fn test_bulk_receipts_cover_every_combination() {
        let receipts = bulk("S, M ,L", "Black,White").receipts().unwrap();
        let combos: Vec<(&str, &str)> = receipts
            .iter()
            .map(|r| (r.size.as_str(), r.color.as_str()))
            .collect();
        assert_eq!(
            combos,
            vec![
                ("S", "Black"),
                ("S", "White"),
                ("M", "Black"),
                ("M", "White"),
                ("L", "Black"),
                ("L", "White"),
            ]
        );
        assert!(receipts.iter().all(|r| r.quantity == 20));
    }

    #[test]
    fn test_bulk_receipts_skip_blanks_and_duplicates() {
        let receipts = bulk("M,,M, ", "Navy").receipts().unwrap();
        assert_eq!(receipts.len(), 1);
    }

    #[test]
    fn test_bulk_receipts_need_both_lists() {
        assert_eq!(
            bulk("", "Black").receipts().unwrap_err(),
            ReceiptError::NoCombinations
        );
        assert_eq!(
            bulk("S", " , ").receipts().unwrap_err(),
            ReceiptError::NoCombinations
        );
    }

    #[test]
    fn test_receive_lot_normalized() {
        let lot = ReceiveLot {
            item_id: ItemId::new(1),
            size: " XL ".to_string(),
            color: "Red".to_string(),
            supplier_id: SupplierId::new(1),
            quantity: 5,
            import_cost: Decimal::ZERO,
            import_date: None,
            sell_price: Some(Decimal::from(250_000)),
        };
        assert_eq!(lot.clone().normalized().unwrap().size, "XL");

        let mut bad = lot.clone();
        bad.quantity = 0;
        assert_eq!(bad.normalized().unwrap_err(), ReceiptError::InvalidQuantity);

        let mut bad = lot.clone();
        bad.color = "  ".to_string();
        assert_eq!(
            bad.normalized().unwrap_err(),
            ReceiptError::MissingSizeOrColor
        );

        let mut bad = lot;
        bad.sell_price = Some(Decimal::ZERO);
        assert_eq!(bad.normalized().unwrap_err(), ReceiptError::InvalidSellPrice);
    }

    #[test]
    fn test_lot_filter_paging() {
        let filter = LotFilter {
            page: Some(3),
            ..LotFilter::default()
        };
        assert_eq!(filter.offset(), 30);

        let filter = LotFilter {
            page: Some(-4),
            search: Some("   ".to_string()),
            ..LotFilter::default()
        };
        assert_eq!(filter.page(), 1);
        assert_eq!(filter.search_term(), None);

        let filter = LotFilter {
            page: Some(i64::MAX),
            ..LotFilter::default()
        };
        assert_eq!(filter.page(), threadline_core::MAX_PAGE);
        assert_eq!(filter.offset(), (threadline_core::MAX_PAGE - 1) * LOTS_PER_PAGE);
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, LOTS_PER_PAGE), 0);
        assert_eq!(page_count(15, LOTS_PER_PAGE), 1);
        assert_eq!(page_count(16, LOTS_PER_PAGE), 2);
    }

    #[test]
    fn test_low_stock() {
        let lot = Lot {
            id: LotId::new(1),
            variant_id: Some(VariantId::new(1)),
            item_id: ItemId::new(1),
            item_name: "Linen Shirt".to_string(),
            category_name: None,
            size: Some("M".to_string()),
            color: Some("Sand".to_string()),
            supplier_id: SupplierId::new(1),
            supplier_name: "Saigon Textiles".to_string(),
            quantity: 4,
            import_cost: Decimal::from(120_000),
            import_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            created_at: Utc::now(),
        };
        assert!(lot.is_low_stock());
        assert_eq!(lot.stock_value(), Decimal::from(480_000));

        let empty = Lot { quantity: 0, ..lot };
        assert!(!empty.is_low_stock());
    }
}
