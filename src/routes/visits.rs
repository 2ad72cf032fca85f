use crate::{AppState, handlers::visits};
use axum::{Router, routing::get};

/// Visit Router Module
///
/// Booking (`POST /api/visits`) is public. Listing, reviewing and changing visits is
/// reserved for authenticated admins.
pub fn visit_routes() -> Router<AppState> {
    Router::new()
        // GET /api/visits?status=...
        // POST /api/visits
        .route(
            "/api/visits",
            get(visits::list_visits).post(visits::create_visit),
        )
        // GET/PUT/PATCH/DELETE /api/visits/{id}
        // PUT and PATCH both merge status, notes and approver.
        .route(
            "/api/visits/{id}",
            get(visits::get_visit)
                .put(visits::update_visit)
                .patch(visits::update_visit)
                .delete(visits::delete_visit),
        )
}
