//! Discount code lookups.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use super::RepositoryError;
use crate::types::{DiscountCode, DiscountKind};

#[derive(Debug, sqlx::FromRow)]
struct DiscountCodeRow {
    id: i32,
    code: String,
    description: String,
    amount_off: Option<Decimal>,
    percent_off: Option<Decimal>,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    max_usage: i32,
    used_count: i32,
    is_active: bool,
}

impl TryFrom<DiscountCodeRow> for DiscountCode {
    type Error = RepositoryError;

    fn try_from(row: DiscountCodeRow) -> Result<Self, Self::Error> {
        let kind = match (row.amount_off, row.percent_off) {
            (Some(amount), None) => DiscountKind::AmountOff(amount),
            (None, Some(percent)) => DiscountKind::PercentOff(percent),
            _ => {
                return Err(RepositoryError::DataCorruption(format!(
                    "discount code {} must have exactly one of amount_off/percent_off",
                    row.code
                )));
            }
        };

        Ok(Self {
            id: row.id,
            code: row.code,
            description: row.description,
            kind,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            max_usage: row.max_usage,
            used_count: row.used_count,
            is_active: row.is_active,
        })
    }
}

const SELECT_CODE: &str = r"
    SELECT id, code, description, amount_off, percent_off,
           starts_at, ends_at, max_usage, used_count, is_active
    FROM shop.discount_code
    WHERE upper(code) = upper($1)
";

/// Look up a code (case-insensitive) for a checkout preview.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_code(pool: &PgPool, code: &str) -> Result<Option<DiscountCode>, RepositoryError> {
    sqlx::query_as::<_, DiscountCodeRow>(SELECT_CODE)
        .bind(code.trim())
        .fetch_optional(pool)
        .await?
        .map(TryInto::try_into)
        .transpose()
}

/// Look up and lock a code inside the checkout transaction, so its usage
/// count cannot be raced past `max_usage`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_code(
    conn: &mut PgConnection,
    code: &str,
) -> Result<Option<DiscountCode>, RepositoryError> {
    let sql = format!("{SELECT_CODE} FOR UPDATE");
    sqlx::query_as::<_, DiscountCodeRow>(&sql)
        .bind(code.trim())
        .fetch_optional(&mut *conn)
        .await?
        .map(TryInto::try_into)
        .transpose()
}

/// Count one use of a code.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn record_use(conn: &mut PgConnection, id: i32) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE shop.discount_code SET used_count = used_count + 1 WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
