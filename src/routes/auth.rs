use crate::{AppState, handlers::auth};
use axum::{
    Router,
    routing::{get, post},
};

/// Auth Router Module
///
/// Unauthenticated gateway endpoints. Successful logins return a signed session token
/// that the protected routes expect as `Authorization: Bearer <token>`.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        // POST /api/auth/login
        // Admin login by username and password.
        .route("/api/auth/login", post(auth::admin_login))
        // POST /api/auth/student/login
        // Student login by NISN or email.
        .route("/api/auth/student/login", post(auth::student_login))
        // POST /api/auth/student/register
        // Student self-registration. Rejects an NISN or email that is already taken.
        .route("/api/auth/student/register", post(auth::register_student))
        // GET /api/auth/student/me?id=...
        .route("/api/auth/student/me", get(auth::student_me))
}
