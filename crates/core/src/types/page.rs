//! Page numbers taken from query strings.

/// Highest page any listing serves. Larger requests are clamped to it.
pub const MAX_PAGE: i64 = 10_000;

/// A 1-based page number in `1..=MAX_PAGE`.
///
/// Missing, zero and negative inputs become page 1.
#[must_use]
pub fn page_number(raw: Option<i64>) -> i64 {
    raw.unwrap_or(1).clamp(1, MAX_PAGE)
}

/// Row offset of `page` for `page_size` rows per page.
#[must_use]
pub const fn page_offset(page: i64, page_size: i64) -> i64 {
    page.saturating_sub(1).saturating_mul(page_size)
}
