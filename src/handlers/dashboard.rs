use axum::extract::State;
use chrono::Utc;

use crate::{
    AppState, auth::AuthAdmin, error::AppResult, models::DashboardStats, response::ApiResponse,
};

/// get_dashboard_stats
///
/// [Admin Route] Headline counters for the dashboard overview. "Today" is the server's
/// current UTC date.
#[utoipa::path(
    get,
    path = "/api/dashboard/stats",
    responses(
        (status = 200, description = "Dashboard counters", body = DashboardStats),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_dashboard_stats(
    _admin: AuthAdmin,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<DashboardStats>> {
    let stats = state.repo.get_stats(Utc::now().date_naive()).await?;
    Ok(ApiResponse::ok(stats))
}
