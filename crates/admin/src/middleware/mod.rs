//! HTTP middleware stack for admin.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. Request ID (add unique ID to each request)
//! 3. `TraceLayer` (request tracing, status and latency)
//! 4. Session layer (tower-sessions with `PostgreSQL` store)
//! 5. Staff extractors (per handler)

pub mod auth;
pub mod request_id;
pub mod session;

pub use auth::{RequireAdmin, RequireStaff};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use session::create_session_layer;
