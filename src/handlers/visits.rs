use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
};
use uuid::Uuid;

use super::non_empty;
use crate::{
    AppState,
    auth::{AuthAdmin, confirm_student},
    error::{AppError, AppResult},
    extract::{AppJson, AppPath, AppQuery},
    models::{
        CreateVisitRequest, NewVisit, UpdateVisitRequest, VisitChanges, VisitFilter,
        VisitResponse, VisitStatus, parse_visit_date,
    },
    response::{ApiResponse, created},
};

fn visit_not_found() -> AppError {
    AppError::NotFound("Visit not found".to_string())
}

fn parse_status(raw: &str) -> AppResult<VisitStatus> {
    VisitStatus::parse(raw).ok_or_else(|| AppError::BadRequest("Invalid status".to_string()))
}

/// create_visit
///
/// [Public Route] Books a counseling visit. Registered students send `studentId`;
/// everyone else must give `studentName` and `class`. New visits start as pending.
#[utoipa::path(
    post,
    path = "/api/visits",
    request_body = CreateVisitRequest,
    responses(
        (status = 201, description = "Visit booked", body = VisitResponse),
        (status = 400, description = "Missing or malformed field"),
        (status = 404, description = "Student not found")
    )
)]
pub async fn create_visit(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(payload): AppJson<CreateVisitRequest>,
) -> AppResult<(StatusCode, ApiResponse<VisitResponse>)> {
    let (Some(visit_date), Some(visit_time), Some(reason)) = (
        non_empty(payload.visit_date),
        non_empty(payload.visit_time),
        non_empty(payload.reason),
    ) else {
        return Err(AppError::BadRequest(
            "Visit date, time and reason are required".to_string(),
        ));
    };

    let visit_date = parse_visit_date(&visit_date)
        .ok_or_else(|| AppError::BadRequest("Invalid visit date".to_string()))?;

    let new_visit = match payload.student_id {
        Some(student_id) => {
            confirm_student(&headers, &state.config, student_id)?;
            if state.repo.find_student(student_id).await?.is_none() {
                return Err(AppError::NotFound("Student not found".to_string()));
            }
            NewVisit {
                student_id: Some(student_id),
                student_name: None,
                class_name: None,
                email: None,
                phone: None,
                visit_date,
                visit_time,
                reason,
            }
        }
        None => {
            let (Some(student_name), Some(class_name)) =
                (non_empty(payload.student_name), non_empty(payload.class_name))
            else {
                return Err(AppError::BadRequest(
                    "Student name and class are required".to_string(),
                ));
            };
            NewVisit {
                student_id: None,
                student_name: Some(student_name),
                class_name: Some(class_name),
                email: non_empty(payload.email),
                phone: non_empty(payload.phone),
                visit_date,
                visit_time,
                reason,
            }
        }
    };

    let visit = state.repo.create_visit(new_visit).await?;
    tracing::info!(visit_id = %visit.id, date = %visit.visit_date, "visit requested");

    Ok(created(
        ApiResponse::ok(VisitResponse::from(visit)).with_message("Visit scheduled successfully"),
    ))
}

/// list_visits
///
/// [Admin Route] All visit requests, newest first, optionally filtered by `?status=`.
#[utoipa::path(
    get,
    path = "/api/visits",
    params(VisitFilter),
    responses(
        (status = 200, description = "Visits", body = [VisitResponse]),
        (status = 400, description = "Invalid status filter"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_visits(
    _admin: AuthAdmin,
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<VisitFilter>,
) -> AppResult<ApiResponse<Vec<VisitResponse>>> {
    let status = match non_empty(filter.status) {
        Some(raw) => Some(parse_status(&raw)?),
        None => None,
    };

    let visits = state.repo.list_visits(status).await?;
    Ok(ApiResponse::ok(
        visits.into_iter().map(VisitResponse::from).collect(),
    ))
}

/// get_visit
///
/// [Admin Route] A single visit request.
#[utoipa::path(
    get,
    path = "/api/visits/{id}",
    params(("id" = Uuid, Path, description = "Visit id")),
    responses(
        (status = 200, description = "Visit", body = VisitResponse),
        (status = 404, description = "Visit not found")
    )
)]
pub async fn get_visit(
    _admin: AuthAdmin,
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<ApiResponse<VisitResponse>> {
    let visit = state.repo.find_visit(id).await?.ok_or_else(visit_not_found)?;
    Ok(ApiResponse::ok(visit.into()))
}

/// update_visit
///
/// [Admin Route] Merges `status`, `notes` and `approvedBy` into a visit. Serves PUT and
/// PATCH.
///
/// Any of the four statuses may be set from any other. Approving without naming an
/// approver records the calling admin. `"notes": null` clears the notes.
#[utoipa::path(
    put,
    path = "/api/visits/{id}",
    params(("id" = Uuid, Path, description = "Visit id")),
    request_body = UpdateVisitRequest,
    responses(
        (status = 200, description = "Visit updated", body = VisitResponse),
        (status = 400, description = "Invalid status or unknown approver"),
        (status = 404, description = "Visit not found")
    )
)]
pub async fn update_visit(
    admin: AuthAdmin,
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateVisitRequest>,
) -> AppResult<ApiResponse<VisitResponse>> {
    let status = match non_empty(payload.status) {
        Some(raw) => Some(parse_status(&raw)?),
        None => None,
    };

    if let Some(approver) = payload.approved_by {
        if state.repo.find_admin(approver).await?.is_none() {
            return Err(AppError::BadRequest("Approver not found".to_string()));
        }
    }

    let approved_by = match (status, payload.approved_by) {
        (_, Some(approver)) => Some(approver),
        (Some(VisitStatus::Approved), None) => Some(admin.id),
        _ => None,
    };

    let changes = VisitChanges {
        status,
        notes: payload.notes,
        approved_by,
    };

    let visit = state
        .repo
        .update_visit(id, changes)
        .await?
        .ok_or_else(visit_not_found)?;

    tracing::info!(
        visit_id = %id,
        status = %visit.status,
        updated_by = %admin.id,
        "visit updated"
    );

    Ok(ApiResponse::ok(VisitResponse::from(visit)).with_message("Visit updated successfully"))
}

/// delete_visit
///
/// [Admin Route] Removes a visit request.
#[utoipa::path(
    delete,
    path = "/api/visits/{id}",
    params(("id" = Uuid, Path, description = "Visit id")),
    responses(
        (status = 200, description = "Visit deleted"),
        (status = 404, description = "Visit not found")
    )
)]
pub async fn delete_visit(
    admin: AuthAdmin,
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<ApiResponse<()>> {
    if !state.repo.delete_visit(id).await? {
        return Err(visit_not_found());
    }

    tracing::info!(visit_id = %id, deleted_by = %admin.id, "visit deleted");
    Ok(ApiResponse::done("Visit deleted successfully"))
}
