//! Database operations for staff accounts.

use sqlx::PgPool;

use threadline_core::{Email, StaffId, StaffRole};

use super::RepositoryError;

/// Repository for staff accounts.
pub struct StaffRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StaffRepository<'a> {
    /// Create a new staff repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a staff account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is taken, or
    /// `RepositoryError::Database` for other failures.
    pub async fn create(
        &self,
        email: &Email,
        name: &str,
        role: StaffRole,
    ) -> Result<StaffId, RepositoryError> {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO shop.staff (email, name, role) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(email.as_str())
        .bind(name)
        .bind(role)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            RepositoryError::from_constraint(e, &format!("Staff already exists with email {email}"))
        })?;

        Ok(StaffId::new(id))
    }
}
