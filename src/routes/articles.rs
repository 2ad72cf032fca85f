use crate::{
    AppState,
    handlers::{articles, comments},
};
use axum::{
    Router,
    routing::{delete, get},
};

/// Article Router Module
///
/// Reads are public. Writes require an authenticated admin (any role); there is no
/// per-author ownership check.
pub fn article_routes() -> Router<AppState> {
    Router::new()
        // GET /api/articles?category=...&search=...
        // POST /api/articles
        .route(
            "/api/articles",
            get(articles::list_articles).post(articles::create_article),
        )
        // GET/PUT/PATCH/DELETE /api/articles/{id}
        // PATCH is an alias of PUT: both run the same partial update.
        .route(
            "/api/articles/{id}",
            get(articles::get_article)
                .put(articles::update_article)
                .patch(articles::update_article)
                .delete(articles::delete_article),
        )
        // --- Comments ---
        // GET/POST /api/articles/{id}/comments
        // Anyone may comment, either as a registered student or anonymously.
        .route(
            "/api/articles/{id}/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        // DELETE /api/articles/{id}/comments/{comment_id}?studentId=...
        // Only the authoring student may delete.
        .route(
            "/api/articles/{id}/comments/{comment_id}",
            delete(comments::delete_comment),
        )
}
