//! Supplier domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use threadline_core::SupplierId;

/// A supplier that storage lots are received from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Supplier with the number of lots received from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplierSummary {
    #[serde(flatten)]
    pub supplier: Supplier,
    pub lot_count: i64,
}

/// Create or replace a supplier's details.
#[derive(Debug, Clone, Deserialize)]
pub struct SupplierInput {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl SupplierInput {
    /// Trimmed input with blank optional fields dropped, or `None` when the
    /// name is blank.
    #[must_use]
    pub fn normalized(self) -> Option<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name,
            phone: blank_to_none(self.phone),
            email: blank_to_none(self.email),
            address: blank_to_none(self.address),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_supplier_input_normalized() {
        let input = SupplierInput {
            name: "  Saigon Textiles ".to_string(),
            phone: Some(" ".to_string()),
            email: Some("sales@saigontextiles.vn".to_string()),
            address: None,
        };
        let input = input.normalized().unwrap();
        assert_eq!(input.name, "Saigon Textiles");
        assert_eq!(input.phone, None);
        assert_eq!(input.email.as_deref(), Some("sales@saigontextiles.vn"));
    }

    #[test]
    fn test_supplier_input_requires_name() {
        let input = SupplierInput {
            name: "   ".to_string(),
            phone: None,
            email: None,
            address: None,
        };
        assert!(input.normalized().is_none());
    }
}
