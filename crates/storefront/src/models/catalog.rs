//! Catalog views.

use rust_decimal::Decimal;
use serde::Serialize;

use threadline_core::{CategoryId, ItemId, VariantId};

/// A product in the listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSummary {
    pub id: ItemId,
    pub name: String,
    pub category_id: Option<CategoryId>,
    pub category: Option<String>,
    pub cover_image: Option<String>,
    pub min_price: Decimal,
    pub max_price: Decimal,
    /// From the variant stock cache; may lag behind the lots.
    pub in_stock: bool,
}

/// A variant shown on the product page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantView {
    pub id: VariantId,
    pub size: String,
    pub color: String,
    /// Item sell price plus the variant's price modifier.
    pub price: Decimal,
    pub image: Option<String>,
    /// Live sum of the variant's lots.
    pub available: i64,
}

/// Product page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductDetail {
    pub id: ItemId,
    pub name: String,
    pub category: Option<String>,
    pub cover_image: Option<String>,
    pub sell_price: Decimal,
    /// Variants with stock, ordered by size then color.
    pub variants: Vec<VariantView>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub min_price: Decimal,
    pub max_price: Decimal,
    /// Stock of item-keyed lots for products sold without variants.
    pub legacy_available: i64,
}

impl ProductDetail {
    /// Build the page from an item and all of its variants.
    ///
    /// Out-of-stock variants are dropped. Sizes and colors keep first-seen
    /// order. With no variant in stock the price range collapses to the
    /// item's sell price.
    #[must_use]
    pub fn assemble(
        id: ItemId,
        name: String,
        category: Option<String>,
        cover_image: Option<String>,
        sell_price: Decimal,
        variants: Vec<VariantView>,
        legacy_available: i64,
    ) -> Self {
        let variants: Vec<VariantView> = variants.into_iter().filter(|v| v.available > 0).collect();

        let mut sizes: Vec<String> = Vec::new();
        let mut colors: Vec<String> = Vec::new();
        for variant in &variants {
            if !sizes.contains(&variant.size) {
                sizes.push(variant.size.clone());
            }
            if !colors.contains(&variant.color) {
                colors.push(variant.color.clone());
            }
        }

        let min_price = variants.iter().map(|v| v.price).min().unwrap_or(sell_price);
        let max_price = variants.iter().map(|v| v.price).max().unwrap_or(sell_price);

        Self {
            id,
            name,
            category,
            cover_image,
            sell_price,
            variants,
            sizes,
            colors,
            min_price,
            max_price,
            legacy_available,
        }
    }
}

/// Answer to "can I add this size and color?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantAvailability {
    pub variant_id: VariantId,
    pub item_id: ItemId,
    pub item_name: String,
    pub size: String,
    pub color: String,
    pub price: Decimal,
    pub image: Option<String>,
    /// Live sum of the variant's lots.
    pub available: i64,
}

/// Answer to "can I add this item?" for products sold without variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemAvailability {
    pub item_id: ItemId,
    pub item_name: String,
    pub price: Decimal,
    pub image: Option<String>,
    /// Live sum of the item-keyed lots.
    pub available: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(id: i32, size: &str, color: &str, price: i64, available: i64) -> VariantView {
        VariantView {
            id: VariantId::new(id),
            size: size.to_string(),
            color: color.to_string(),
            price: Decimal::from(price),
            image: None,
            available,
        }
    }

    #[test]
    fn test_assemble_drops_out_of_stock_variants() {
        let detail = ProductDetail::assemble(
            ItemId::new(1),
            "Linen Shirt".to_string(),
            None,
            None,
            Decimal::from(300_000),
            vec![
                variant(1, "M", "White", 300_000, 4),
                variant(2, "L", "White", 320_000, 0),
                variant(3, "M", "Navy", 310_000, 2),
            ],
            0,
        );

        assert_eq!(detail.variants.len(), 2);
        assert_eq!(detail.sizes, vec!["M"]);
        assert_eq!(detail.colors, vec!["White", "Navy"]);
        assert_eq!(detail.min_price, Decimal::from(300_000));
        assert_eq!(detail.max_price, Decimal::from(310_000));
    }

    #[test]
    fn test_assemble_without_stock_uses_sell_price() {
        let detail = ProductDetail::assemble(
            ItemId::new(2),
            "Denim Jacket".to_string(),
            Some("Outerwear".to_string()),
            None,
            Decimal::from(650_000),
            vec![variant(5, "S", "Blue", 650_000, 0)],
            3,
        );

        assert!(detail.variants.is_empty());
        assert!(detail.sizes.is_empty());
        assert_eq!(detail.min_price, Decimal::from(650_000));
        assert_eq!(detail.max_price, Decimal::from(650_000));
        assert_eq!(detail.legacy_available, 3);
    }
}
