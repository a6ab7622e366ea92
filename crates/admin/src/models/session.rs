//! Session-related types for staff authentication.

use serde::{Deserialize, Serialize};

use threadline_core::{Email, StaffId, StaffRole};

/// Session-stored staff identity.
///
/// Placed in the session by the sign-in flow; the admin API only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentStaff {
    /// Staff member's database ID.
    pub id: StaffId,
    /// Staff member's email address.
    pub email: Email,
    /// Permission level.
    pub role: StaffRole,
}

impl CurrentStaff {
    /// Whether this staff member has full access.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == StaffRole::Admin
    }
}

/// Session keys for staff authentication data.
pub mod keys {
    /// Key for storing the current signed-in staff member.
    pub const CURRENT_STAFF: &str = "current_staff";
}
