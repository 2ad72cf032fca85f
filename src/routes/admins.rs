use crate::{AppState, handlers::admins};
use axum::{Router, routing::get};

/// Admin Directory Router Module
///
/// Account management for counselors and staff. Every handler requires an authenticated
/// admin and additionally rejects anyone who is not `SUPER_ADMIN` with 403.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET/POST /api/admins
        .route(
            "/api/admins",
            get(admins::list_admins).post(admins::create_admin),
        )
        // GET/PUT/DELETE /api/admins/{id}
        // DELETE refuses to remove the caller's own account.
        .route(
            "/api/admins/{id}",
            get(admins::get_admin)
                .put(admins::update_admin)
                .delete(admins::delete_admin),
        )
}
