//! Router Module Index
//!
//! One router per resource family. Access control is not applied per module: public and
//! admin-only methods share paths (e.g. `GET /api/articles` vs `POST /api/articles`), so
//! the `AuthAdmin` extractor in each protected handler performs the check.

use axum::{Router, routing::get};

use crate::AppState;

/// Login, registration and student profile routes.
pub mod auth;

/// Admin directory (super admin only).
pub mod admins;

/// Articles and their nested comments.
pub mod articles;

/// Counseling visit requests.
pub mod visits;

/// Dashboard counters.
pub mod dashboard;

/// api_routes
///
/// Every resource router merged under one tree, plus the health probe.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers; never touches the database.
        .route("/health", get(|| async { "ok" }))
        .merge(auth::auth_routes())
        .merge(admins::admin_routes())
        .merge(articles::article_routes())
        .merge(visits::visit_routes())
        .merge(dashboard::dashboard_routes())
}
