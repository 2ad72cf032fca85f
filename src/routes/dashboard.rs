use crate::{AppState, handlers::dashboard};
use axum::{Router, routing::get};

pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        // GET /api/dashboard/stats
        // Totals for articles, visits, pending and today's visits, students and comments.
        .route("/api/dashboard/stats", get(dashboard::get_dashboard_stats))
}
