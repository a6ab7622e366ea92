//! Staff account commands.
//!
//! ```bash
//! tl-cli staff create -e lan@threadline.vn -n "Lan Nguyen" -r admin
//! ```
//!
//! Staff sign in through the admin API; this is how the first admin is made.

use thiserror::Error;

use threadline_admin::db::{RepositoryError, StaffRepository};
use threadline_core::{Email, StaffId, StaffRole};

use super::{ConnectError, connect};

/// Errors that can occur during staff operations.
#[derive(Debug, Error)]
pub enum StaffError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Invalid role: {0}. Valid roles: admin, employee")]
    InvalidRole(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Name is required")]
    MissingName,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Parse and check the arguments before touching the database.
fn parse_args(email: &str, name: &str, role: &str) -> Result<(Email, String, StaffRole), StaffError> {
    let role: StaffRole = role
        .parse()
        .map_err(|_| StaffError::InvalidRole(role.to_owned()))?;
    let email = Email::parse(email).map_err(|_| StaffError::InvalidEmail(email.to_owned()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(StaffError::MissingName);
    }
    Ok((email, name.to_owned(), role))
}

/// Create a staff account.
///
/// # Errors
///
/// Returns `StaffError` for invalid arguments, a taken email, or database failures.
pub async fn create(email: &str, name: &str, role: &str) -> Result<StaffId, StaffError> {
    let (email, name, role) = parse_args(email, name, role)?;

    let pool = connect().await?;
    let id = StaffRepository::new(&pool).create(&email, &name, role).await?;

    tracing::info!(staff_id = %id, email = %email, role = %role, "Staff account created");
    Ok(id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let (email, name, role) = parse_args("lan@threadline.vn", " Lan ", "employee").unwrap();
        assert_eq!(email.as_str(), "lan@threadline.vn");
        assert_eq!(name, "Lan");
        assert_eq!(role, StaffRole::Employee);
    }

    #[test]
    fn test_parse_args_rejects_bad_role() {
        assert!(matches!(
            parse_args("lan@threadline.vn", "Lan", "super_admin"),
            Err(StaffError::InvalidRole(_))
        ));
    }

    #[test]
    fn test_parse_args_rejects_bad_email() {
        assert!(matches!(
            parse_args("not-an-email", "Lan", "admin"),
            Err(StaffError::InvalidEmail(_))
        ));
    }

    #[test]
    fn test_parse_args_requires_name() {
        assert!(matches!(
            parse_args("lan@threadline.vn", "  ", "admin"),
            Err(StaffError::MissingName)
        ));
    }
}
