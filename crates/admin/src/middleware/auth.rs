//! Authentication extractors for admin.
//!
//! Staff identities are placed in the session by the sign-in flow. These
//! extractors only read them.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentStaff, session_keys};

/// Extractor that requires a signed-in staff member of any role.
///
/// # Example
///
/// ```rust,ignore
/// async fn lots(RequireStaff(staff): RequireStaff) -> impl IntoResponse {
///     format!("Hello, {}!", staff.email)
/// }
/// ```
pub struct RequireStaff(pub CurrentStaff);

/// Extractor that requires a staff member with the `admin` role.
///
/// Supplier management and bulk stock refreshes use this.
pub struct RequireAdmin(pub CurrentStaff);

/// Error returned when a staff extractor rejects the request.
#[derive(Debug, PartialEq, Eq)]
pub enum StaffAuthRejection {
    /// Nobody is signed in.
    Unauthorized,
    /// Signed in, but the role is not enough.
    Forbidden,
}

impl IntoResponse for StaffAuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Sign in required"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Admin access required"),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

async fn current_staff(parts: &Parts) -> Option<CurrentStaff> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentStaff>(session_keys::CURRENT_STAFF)
        .await
        .ok()
        .flatten()
}

impl<S> FromRequestParts<S> for RequireStaff
where
    S: Send + Sync,
{
    type Rejection = StaffAuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_staff(parts)
            .await
            .map(Self)
            .ok_or(StaffAuthRejection::Unauthorized)
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = StaffAuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let staff = current_staff(parts)
            .await
            .ok_or(StaffAuthRejection::Unauthorized)?;

        if !staff.is_admin() {
            tracing::warn!(staff_id = %staff.id, "Admin-only route refused");
            return Err(StaffAuthRejection::Forbidden);
        }

        Ok(Self(staff))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    #[tokio::test]
    async fn test_missing_session_is_unauthorized() {
        let (mut parts, ()) = Request::builder().uri("/lots").body(()).unwrap().into_parts();

        let rejection = RequireStaff::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert_eq!(rejection, StaffAuthRejection::Unauthorized);

        let response = RequireAdmin::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_forbidden_response() {
        let response = StaffAuthRejection::Forbidden.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
