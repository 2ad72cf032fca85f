//! HTTP handlers, one module per resource family.
//!
//! Every handler answers with the `ApiResponse` envelope; failures are `AppError`s.

pub mod admins;
pub mod articles;
pub mod auth;
pub mod comments;
pub mod dashboard;
pub mod visits;

/// Treats blank strings the same as a missing field.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
