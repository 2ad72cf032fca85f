use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
};
use uuid::Uuid;

use super::non_empty;
use crate::{
    AppState,
    auth::confirm_student,
    error::{AppError, AppResult},
    extract::{AppJson, AppPath, AppQuery},
    models::{CommentResponse, CreateCommentRequest, NewComment, StudentIdQuery},
    response::{ApiResponse, created},
};

/// list_comments
///
/// [Public Route] Comments on an article, newest first. Student comments carry the
/// student's name and class under `student`.
#[utoipa::path(
    get,
    path = "/api/articles/{id}/comments",
    params(("id" = Uuid, Path, description = "Article id")),
    responses((status = 200, description = "Comments", body = [CommentResponse]))
)]
pub async fn list_comments(
    State(state): State<AppState>,
    AppPath(article_id): AppPath<Uuid>,
) -> AppResult<ApiResponse<Vec<CommentResponse>>> {
    let comments = state.repo.list_comments(article_id).await?;
    Ok(ApiResponse::ok(
        comments.into_iter().map(CommentResponse::from).collect(),
    ))
}

/// create_comment
///
/// [Public Route] Posts a comment as a registered student (`studentId`) or anonymously
/// (`name`, optional `email`).
#[utoipa::path(
    post,
    path = "/api/articles/{id}/comments",
    params(("id" = Uuid, Path, description = "Article id")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment created", body = CommentResponse),
        (status = 400, description = "Missing content or name"),
        (status = 404, description = "Article or student not found")
    )
)]
pub async fn create_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppPath(article_id): AppPath<Uuid>,
    AppJson(payload): AppJson<CreateCommentRequest>,
) -> AppResult<(StatusCode, ApiResponse<CommentResponse>)> {
    let content = non_empty(payload.content)
        .ok_or_else(|| AppError::BadRequest("Content is required".to_string()))?;

    let name = non_empty(payload.name);
    if payload.student_id.is_none() && name.is_none() {
        return Err(AppError::BadRequest(
            "Name is required for anonymous comments".to_string(),
        ));
    }

    if state.repo.find_article(article_id).await?.is_none() {
        return Err(AppError::NotFound("Article not found".to_string()));
    }

    let new_comment = match payload.student_id {
        Some(student_id) => {
            confirm_student(&headers, &state.config, student_id)?;
            if state.repo.find_student(student_id).await?.is_none() {
                return Err(AppError::NotFound("Student not found".to_string()));
            }
            NewComment {
                article_id,
                student_id: Some(student_id),
                name: None,
                email: None,
                content,
            }
        }
        None => NewComment {
            article_id,
            student_id: None,
            name,
            email: non_empty(payload.email),
            content,
        },
    };

    let comment = state.repo.create_comment(new_comment).await?;

    Ok(created(
        ApiResponse::ok(CommentResponse::from(comment)).with_message("Comment posted successfully"),
    ))
}

/// delete_comment
///
/// [Student Route] Removes a comment. Only the student who wrote it may delete it; the
/// caller identifies themselves with `?studentId=`.
#[utoipa::path(
    delete,
    path = "/api/articles/{id}/comments/{comment_id}",
    params(
        ("id" = Uuid, Path, description = "Article id"),
        ("comment_id" = Uuid, Path, description = "Comment id"),
        StudentIdQuery
    ),
    responses(
        (status = 200, description = "Comment deleted"),
        (status = 401, description = "studentId missing"),
        (status = 403, description = "Comment belongs to someone else"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn delete_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppPath((article_id, comment_id)): AppPath<(Uuid, Uuid)>,
    AppQuery(query): AppQuery<StudentIdQuery>,
) -> AppResult<ApiResponse<()>> {
    let student_id = query.student_id.ok_or(AppError::Unauthorized)?;
    confirm_student(&headers, &state.config, student_id)?;

    let comment = state
        .repo
        .find_comment(comment_id)
        .await?
        .filter(|comment| comment.article_id == article_id)
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

    if comment.student_id != Some(student_id) {
        return Err(AppError::Forbidden(
            "You can only delete your own comments".to_string(),
        ));
    }

    state.repo.delete_comment(comment_id).await?;
    tracing::debug!(%comment_id, %student_id, "comment deleted");

    Ok(ApiResponse::done("Comment deleted successfully"))
}
