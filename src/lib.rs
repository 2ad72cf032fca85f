use axum::{Router, extract::FromRef, http::HeaderName};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod response;
pub mod seed;

// Resource routers (auth, admins, articles, visits, dashboard).
pub mod routes;

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use response::ApiResponse;

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and response schema into the OpenAPI
/// document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::admin_login, handlers::auth::student_login,
        handlers::auth::register_student, handlers::auth::student_me,
        handlers::admins::list_admins, handlers::admins::get_admin,
        handlers::admins::create_admin, handlers::admins::update_admin,
        handlers::admins::delete_admin,
        handlers::articles::list_articles, handlers::articles::get_article,
        handlers::articles::create_article, handlers::articles::update_article,
        handlers::articles::delete_article,
        handlers::comments::list_comments, handlers::comments::create_comment,
        handlers::comments::delete_comment,
        handlers::visits::create_visit, handlers::visits::list_visits,
        handlers::visits::get_visit, handlers::visits::update_visit,
        handlers::visits::delete_visit,
        handlers::dashboard::get_dashboard_stats
    ),
    components(
        schemas(
            models::AdminLoginRequest, models::StudentLoginRequest,
            models::StudentRegisterRequest, models::CreateAdminRequest,
            models::UpdateAdminRequest, models::CreateArticleRequest,
            models::UpdateArticleRequest, models::CreateCommentRequest,
            models::CreateVisitRequest, models::UpdateVisitRequest,
            models::AdminProfile, models::AdminCounts, models::AdminListItem,
            models::AdminSession, models::StudentProfile, models::StudentSession,
            models::ArticleResponse, models::CommentAuthor, models::CommentResponse,
            models::VisitResponse, models::DashboardStats,
        )
    ),
    tags(
        (name = "bk-portal", description = "School guidance & counseling (BK) API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Shared, cloneable container for everything a handler needs. Cloned per request;
/// the repository is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Persistence layer (Postgres in production, in-memory in tests).
    pub repo: RepositoryState,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Lets extractors such as `AuthAdmin` pull single components out of AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the API routes, Swagger UI, and the global observability and CORS layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(routes::api_routes())
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. A fresh UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. One span per request, tagged with that id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the `http_request` span for `TraceLayer`, recording method, URI and the
/// `x-request-id` so every log line of a request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
