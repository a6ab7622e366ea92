//! Database operations for suppliers.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use threadline_core::SupplierId;

use super::RepositoryError;
use crate::models::{Supplier, SupplierInput, SupplierSummary};

#[derive(Debug, sqlx::FromRow)]
struct SupplierRow {
    id: i32,
    name: String,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<SupplierRow> for Supplier {
    fn from(row: SupplierRow) -> Self {
        Self {
            id: SupplierId::new(row.id),
            name: row.name,
            phone: row.phone,
            email: row.email,
            address: row.address,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SupplierSummaryRow {
    #[sqlx(flatten)]
    supplier: SupplierRow,
    lot_count: i64,
}

/// Repository for supplier operations.
pub struct SupplierRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SupplierRepository<'a> {
    /// Create a new supplier repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All suppliers by name, with how many lots each has supplied.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<SupplierSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, SupplierSummaryRow>(
            r"
            SELECT s.id, s.name, s.phone, s.email, s.address, s.created_at,
                   COUNT(l.id) AS lot_count
            FROM shop.supplier s
            LEFT JOIN shop.storage_lot l ON l.supplier_id = s.id
            GROUP BY s.id
            ORDER BY s.name, s.id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| SupplierSummary {
                supplier: row.supplier.into(),
                lot_count: row.lot_count,
            })
            .collect())
    }

    /// Get a supplier by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: SupplierId) -> Result<Option<Supplier>, RepositoryError> {
        let row = sqlx::query_as::<_, SupplierRow>(
            "SELECT id, name, phone, email, address, created_at FROM shop.supplier WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Create a supplier.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, input: &SupplierInput) -> Result<Supplier, RepositoryError> {
        let row = sqlx::query_as::<_, SupplierRow>(
            r"
            INSERT INTO shop.supplier (name, phone, email, address)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, phone, email, address, created_at
            ",
        )
        .bind(&input.name)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .fetch_one(self.pool)
        .await?;

        tracing::info!(supplier_id = row.id, "Supplier created");
        Ok(row.into())
    }

    /// Replace a supplier's details.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the supplier does not exist, or
    /// `RepositoryError::Database` if the query fails.
    pub async fn update(
        &self,
        id: SupplierId,
        input: &SupplierInput,
    ) -> Result<Supplier, RepositoryError> {
        let row = sqlx::query_as::<_, SupplierRow>(
            r"
            UPDATE shop.supplier
            SET name = $2, phone = $3, email = $4, address = $5
            WHERE id = $1
            RETURNING id, name, phone, email, address, created_at
            ",
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete a supplier no lot was received from.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if lots reference the supplier,
    /// `RepositoryError::NotFound` if it does not exist, or
    /// `RepositoryError::Database` for other failures.
    pub async fn delete(&self, id: SupplierId) -> Result<(), RepositoryError> {
        let lots: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM shop.storage_lot WHERE supplier_id = $1")
                .bind(id)
                .fetch_one(self.pool)
                .await?;
        if lots > 0 {
            return Err(RepositoryError::Conflict(format!(
                "Supplier has {lots} storage lots and cannot be deleted"
            )));
        }

        // A lot received in between still trips the foreign key
        let result = sqlx::query("DELETE FROM shop.supplier WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| {
                RepositoryError::from_constraint(e, "Supplier has storage lots and cannot be deleted")
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tracing::info!(supplier_id = %id, "Supplier deleted");
        Ok(())
    }
}
