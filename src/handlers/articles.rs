use axum::{extract::State, http::StatusCode};
use uuid::Uuid;

use super::non_empty;
use crate::{
    AppState,
    auth::AuthAdmin,
    error::{AppError, AppResult},
    extract::{AppJson, AppPath, AppQuery},
    models::{
        ArticleChanges, ArticleFilter, ArticleResponse, CreateArticleRequest, NewArticle,
        UpdateArticleRequest,
    },
    response::{ApiResponse, created},
};

pub const DEFAULT_ARTICLE_IMAGE: &str =
    "https://images.unsplash.com/photo-1497633762265-9d179a990aa6";
pub const DEFAULT_ARTICLE_CATEGORY: &str = "General";
pub const DEFAULT_READ_TIME: &str = "5 min read";

fn article_not_found() -> AppError {
    AppError::NotFound("Article not found".to_string())
}

/// list_articles
///
/// [Public Route] Lists articles, newest first, optionally narrowed by category or a
/// free-text search.
#[utoipa::path(
    get,
    path = "/api/articles",
    params(ArticleFilter),
    responses((status = 200, description = "Articles", body = [ArticleResponse]))
)]
pub async fn list_articles(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<ArticleFilter>,
) -> AppResult<ApiResponse<Vec<ArticleResponse>>> {
    let filter = ArticleFilter {
        category: non_empty(filter.category),
        search: non_empty(filter.search),
    };

    let articles = state.repo.list_articles(&filter).await?;
    Ok(ApiResponse::ok(
        articles.into_iter().map(ArticleResponse::from).collect(),
    ))
}

/// get_article
///
/// [Public Route] Fetches one article by id.
#[utoipa::path(
    get,
    path = "/api/articles/{id}",
    params(("id" = Uuid, Path, description = "Article id")),
    responses(
        (status = 200, description = "Article", body = ArticleResponse),
        (status = 404, description = "Article not found")
    )
)]
pub async fn get_article(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<ApiResponse<ArticleResponse>> {
    let article = state
        .repo
        .find_article(id)
        .await?
        .ok_or_else(article_not_found)?;

    Ok(ApiResponse::ok(article.into()))
}

/// create_article
///
/// [Admin Route] Publishes an article. Missing image, category and read time fall back
/// to the portal defaults. The author must be an existing admin.
#[utoipa::path(
    post,
    path = "/api/articles",
    request_body = CreateArticleRequest,
    responses(
        (status = 201, description = "Article created", body = ArticleResponse),
        (status = 400, description = "Missing field or unknown author"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create_article(
    admin: AuthAdmin,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateArticleRequest>,
) -> AppResult<(StatusCode, ApiResponse<ArticleResponse>)> {
    let (Some(title), Some(excerpt), Some(content), Some(author_id)) = (
        non_empty(payload.title),
        non_empty(payload.excerpt),
        non_empty(payload.content),
        payload.author_id,
    ) else {
        return Err(AppError::BadRequest(
            "Title, excerpt, content and authorId are required".to_string(),
        ));
    };

    if state.repo.find_admin(author_id).await?.is_none() {
        return Err(AppError::BadRequest("Author not found".to_string()));
    }

    let article = state
        .repo
        .create_article(NewArticle {
            title,
            excerpt,
            content,
            image: non_empty(payload.image).unwrap_or_else(|| DEFAULT_ARTICLE_IMAGE.to_string()),
            category: non_empty(payload.category)
                .unwrap_or_else(|| DEFAULT_ARTICLE_CATEGORY.to_string()),
            read_time: non_empty(payload.read_time)
                .unwrap_or_else(|| DEFAULT_READ_TIME.to_string()),
            author_id,
        })
        .await?;

    tracing::info!(article_id = %article.id, created_by = %admin.id, "article published");

    Ok(created(
        ApiResponse::ok(ArticleResponse::from(article))
            .with_message("Article created successfully"),
    ))
}

/// update_article
///
/// [Admin Route] Partial update. Serves both PUT and PATCH; empty strings leave the
/// field unchanged. Any authenticated admin may edit any article.
#[utoipa::path(
    put,
    path = "/api/articles/{id}",
    params(("id" = Uuid, Path, description = "Article id")),
    request_body = UpdateArticleRequest,
    responses(
        (status = 200, description = "Article updated", body = ArticleResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Article not found")
    )
)]
pub async fn update_article(
    admin: AuthAdmin,
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateArticleRequest>,
) -> AppResult<ApiResponse<ArticleResponse>> {
    let changes = ArticleChanges {
        title: non_empty(payload.title),
        excerpt: non_empty(payload.excerpt),
        content: non_empty(payload.content),
        image: non_empty(payload.image),
        category: non_empty(payload.category),
        read_time: non_empty(payload.read_time),
    };

    let article = state
        .repo
        .update_article(id, changes)
        .await?
        .ok_or_else(article_not_found)?;

    tracing::debug!(article_id = %id, updated_by = %admin.id, "article updated");

    Ok(ApiResponse::ok(ArticleResponse::from(article))
        .with_message("Article updated successfully"))
}

/// delete_article
///
/// [Admin Route] Deletes an article together with its comments.
#[utoipa::path(
    delete,
    path = "/api/articles/{id}",
    params(("id" = Uuid, Path, description = "Article id")),
    responses(
        (status = 200, description = "Article deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Article not found")
    )
)]
pub async fn delete_article(
    admin: AuthAdmin,
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<ApiResponse<()>> {
    if !state.repo.delete_article(id).await? {
        return Err(article_not_found());
    }

    tracing::info!(article_id = %id, deleted_by = %admin.id, "article deleted");
    Ok(ApiResponse::done("Article deleted successfully"))
}
