//! Seed the catalog and opening stock from a YAML file.
//!
//! ```yaml
//! categories: [Shirts]
//! suppliers:
//!   - name: Saigon Textiles
//!     phone: "0281234567"
//! products:
//!   - name: Linen Shirt
//!     category: Shirts
//!     sell_price: 350000
//!     variants:
//!       - size: M
//!         color: White
//!         lots:
//!           - supplier: Saigon Textiles
//!             quantity: 20
//!             import_cost: 180000
//!             import_date: 2025-09-01
//! ```
//!
//! Categories, suppliers and products are matched by name, so re-running the
//! seed does not duplicate them. Lots are always inserted.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use threadline_admin::db::{
    ProductRepository, RepositoryError, StorageRepository, SupplierRepository,
};
use threadline_admin::models::{NewProduct, ProductFilter, ReceiveLot, SupplierInput};
use threadline_core::db::ledger::refresh_all_stock;
use threadline_core::{CategoryId, ItemId, SupplierId};

use super::{ConnectError, connect};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0} validation errors found")]
    Invalid(usize),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Top-level seed document.
#[derive(Debug, Default, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub suppliers: Vec<SeedSupplier>,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

#[derive(Debug, Deserialize)]
pub struct SeedSupplier {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    pub category: Option<String>,
    pub sell_price: Decimal,
    #[serde(default = "default_available")]
    pub is_available: bool,
    pub cover_image: Option<String>,
    #[serde(default)]
    pub variants: Vec<SeedVariant>,
}

const fn default_available() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct SeedVariant {
    pub size: String,
    pub color: String,
    #[serde(default)]
    pub lots: Vec<SeedLot>,
}

#[derive(Debug, Deserialize)]
pub struct SeedLot {
    /// Supplier name; must be listed under `suppliers` or already exist.
    pub supplier: String,
    pub quantity: i32,
    pub import_cost: Decimal,
    pub import_date: Option<NaiveDate>,
}

/// What a seed run created.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub categories: usize,
    pub suppliers_created: usize,
    pub products_created: usize,
    pub lots: usize,
    pub variants_refreshed: u64,
}

/// Check a catalog for problems the database would reject halfway through.
///
/// `known_suppliers` are supplier names that already exist.
#[must_use]
pub fn validate_catalog(catalog: &Catalog, known_suppliers: &HashSet<String>) -> Vec<String> {
    let mut errors = Vec::new();

    let suppliers: HashSet<&str> = catalog
        .suppliers
        .iter()
        .map(|s| s.name.trim())
        .chain(known_suppliers.iter().map(String::as_str))
        .collect();

    for supplier in &catalog.suppliers {
        if supplier.name.trim().is_empty() {
            errors.push("Supplier with empty name".to_string());
        }
    }

    for product in &catalog.products {
        let name = product.name.trim();
        if name.is_empty() {
            errors.push("Product with empty name".to_string());
            continue;
        }
        if product.sell_price <= Decimal::ZERO {
            errors.push(format!("{name}: sell price must be positive"));
        }

        let mut seen = HashSet::new();
        for variant in &product.variants {
            let size = variant.size.trim();
            let color = variant.color.trim();
            if size.is_empty() || color.is_empty() {
                errors.push(format!("{name}: variant needs a size and a color"));
                continue;
            }
            if !seen.insert((size.to_lowercase(), color.to_lowercase())) {
                errors.push(format!("{name}: duplicate variant {size}/{color}"));
            }

            for lot in &variant.lots {
                if !suppliers.contains(lot.supplier.trim()) {
                    errors.push(format!(
                        "{name} {size}/{color}: unknown supplier {}",
                        lot.supplier
                    ));
                }
                if lot.quantity <= 0 {
                    errors.push(format!("{name} {size}/{color}: quantity must be positive"));
                }
                if lot.import_cost < Decimal::ZERO {
                    errors.push(format!(
                        "{name} {size}/{color}: import cost cannot be negative"
                    ));
                }
            }
        }
    }

    errors
}

/// Seed the catalog from a YAML file.
///
/// # Errors
///
/// Returns `SeedError` if the file cannot be read or parsed, fails
/// validation, or a database operation fails.
pub async fn from_file(file_path: &str) -> Result<SeedSummary, SeedError> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(SeedError::FileNotFound(file_path.to_owned()));
    }

    info!(path = %file_path, "Loading catalog");
    let content = tokio::fs::read_to_string(path).await?;
    let catalog: Catalog = serde_yaml::from_str(&content)?;
    info!(
        categories = catalog.categories.len(),
        suppliers = catalog.suppliers.len(),
        products = catalog.products.len(),
        "Parsed catalog"
    );

    let pool = connect().await?;
    let supplier_repo = SupplierRepository::new(&pool);
    let product_repo = ProductRepository::new(&pool);
    let storage_repo = StorageRepository::new(&pool);

    let mut supplier_ids: HashMap<String, SupplierId> = supplier_repo
        .list()
        .await?
        .into_iter()
        .map(|s| (s.supplier.name, s.supplier.id))
        .collect();

    let known: HashSet<String> = supplier_ids.keys().cloned().collect();
    let errors = validate_catalog(&catalog, &known);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(SeedError::Invalid(errors.len()));
    }

    let mut summary = SeedSummary::default();

    let category_names: HashSet<&str> = catalog
        .categories
        .iter()
        .map(String::as_str)
        .chain(catalog.products.iter().filter_map(|p| p.category.as_deref()))
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();
    let mut category_ids = HashMap::new();
    for name in category_names {
        category_ids.insert(name, product_repo.ensure_category(name).await?);
        summary.categories += 1;
    }

    for supplier in &catalog.suppliers {
        let name = supplier.name.trim();
        if supplier_ids.contains_key(name) {
            continue;
        }
        let created = supplier_repo
            .create(&SupplierInput {
                name: name.to_owned(),
                phone: supplier.phone.clone(),
                email: supplier.email.clone(),
                address: supplier.address.clone(),
            })
            .await?;
        supplier_ids.insert(created.name, created.id);
        summary.suppliers_created += 1;
    }

    for product in &catalog.products {
        let category_id = product
            .category
            .as_deref()
            .and_then(|c| category_ids.get(c.trim()).copied());
        let item_id = match find_product(&product_repo, product, category_id).await? {
            Some(id) => id,
            None => {
                summary.products_created += 1;
                product_repo
                    .create(&NewProduct {
                        name: product.name.trim().to_owned(),
                        category_id,
                        sell_price: product.sell_price,
                        is_available: product.is_available,
                        cover_image: product.cover_image.clone(),
                    })
                    .await?
            }
        };

        for variant in &product.variants {
            for lot in &variant.lots {
                let Some(&supplier_id) = supplier_ids.get(lot.supplier.trim()) else {
                    continue;
                };
                storage_repo
                    .receive(&ReceiveLot {
                        item_id,
                        size: variant.size.trim().to_owned(),
                        color: variant.color.trim().to_owned(),
                        supplier_id,
                        quantity: lot.quantity,
                        import_cost: lot.import_cost,
                        import_date: lot.import_date,
                        sell_price: None,
                    })
                    .await?;
                summary.lots += 1;
            }
        }
        info!(product = %product.name, item_id = %item_id, "Product seeded");
    }

    summary.variants_refreshed = refresh_all_stock(&pool).await?;

    info!("Seeding complete!");
    info!("  Categories: {}", summary.categories);
    info!("  Suppliers created: {}", summary.suppliers_created);
    info!("  Products created: {}", summary.products_created);
    info!("  Lots received: {}", summary.lots);
    info!("  Variants refreshed: {}", summary.variants_refreshed);

    Ok(summary)
}

async fn find_product(
    repo: &ProductRepository<'_>,
    product: &SeedProduct,
    category_id: Option<CategoryId>,
) -> Result<Option<ItemId>, RepositoryError> {
    let name = product.name.trim();
    let existing = repo
        .list(&ProductFilter {
            category: category_id,
            q: Some(name.to_owned()),
        })
        .await?;
    Ok(existing
        .into_iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .map(|p| p.id))
}
