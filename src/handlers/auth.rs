use axum::{extract::State, http::StatusCode};

use super::non_empty;
use crate::{
    AppState,
    auth::{PrincipalKind, hash_password, issue_token, verify_password},
    error::{AppError, AppResult},
    extract::{AppJson, AppQuery},
    models::{
        AdminLoginRequest, AdminSession, IdQuery, NewStudent, StudentIdentifier,
        StudentLoginRequest, StudentProfile, StudentRegisterRequest, StudentSession,
    },
    response::{ApiResponse, created},
};

/// admin_login
///
/// [Public Route] Verifies an admin's username and password.
///
/// An unknown username and a wrong password produce the same 401, so the response does
/// not reveal which usernames exist.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = AdminLoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AdminSession),
        (status = 400, description = "Missing username or password"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn admin_login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<AdminLoginRequest>,
) -> AppResult<ApiResponse<AdminSession>> {
    let (Some(username), Some(password)) =
        (non_empty(payload.username), non_empty(payload.password))
    else {
        return Err(AppError::BadRequest(
            "Username and password are required".to_string(),
        ));
    };

    let admin = state
        .repo
        .find_admin_by_username(username.trim())
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(&password, &admin.password_hash) {
        tracing::debug!(username = %admin.username, "admin login rejected");
        return Err(AppError::InvalidCredentials);
    }

    let token = issue_token(&state.config, admin.id, PrincipalKind::Admin)?;
    tracing::info!(admin_id = %admin.id, "admin logged in");

    Ok(ApiResponse::ok(AdminSession {
        admin: admin.into(),
        token,
    })
    .with_message("Login successful"))
}

/// student_login
///
/// [Public Route] Verifies a student by NISN or email. When both are sent, NISN wins.
#[utoipa::path(
    post,
    path = "/api/auth/student/login",
    request_body = StudentLoginRequest,
    responses(
        (status = 200, description = "Logged in", body = StudentSession),
        (status = 400, description = "Missing identifier or password"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn student_login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<StudentLoginRequest>,
) -> AppResult<ApiResponse<StudentSession>> {
    let identifier = match (non_empty(payload.nisn), non_empty(payload.email)) {
        (Some(nisn), _) => Some(StudentIdentifier::Nisn(nisn.trim().to_string())),
        (None, Some(email)) => Some(StudentIdentifier::Email(email.trim().to_string())),
        (None, None) => None,
    };

    let (Some(identifier), Some(password)) = (identifier, non_empty(payload.password)) else {
        return Err(AppError::BadRequest(
            "NISN or email and password are required".to_string(),
        ));
    };

    let student = state
        .repo
        .find_student_by_identifier(&identifier)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(&password, &student.password_hash) {
        return Err(AppError::InvalidCredentials);
    }

    let token = issue_token(&state.config, student.id, PrincipalKind::Student)?;
    tracing::info!(student_id = %student.id, "student logged in");

    Ok(ApiResponse::ok(StudentSession {
        student: student.into(),
        token,
    })
    .with_message("Login successful"))
}

/// register_student
///
/// [Public Route] Creates a student account. Either identifier may be used; both are
/// checked for uniqueness.
#[utoipa::path(
    post,
    path = "/api/auth/student/register",
    request_body = StudentRegisterRequest,
    responses(
        (status = 201, description = "Registered", body = StudentProfile),
        (status = 400, description = "Missing fields"),
        (status = 409, description = "NISN or email already registered")
    )
)]
pub async fn register_student(
    State(state): State<AppState>,
    AppJson(payload): AppJson<StudentRegisterRequest>,
) -> AppResult<(StatusCode, ApiResponse<StudentProfile>)> {
    let nisn = non_empty(payload.nisn).map(|v| v.trim().to_string());
    let email = non_empty(payload.email).map(|v| v.trim().to_string());

    let (Some(name), Some(password)) = (non_empty(payload.name), non_empty(payload.password))
    else {
        return Err(AppError::BadRequest(
            "Name, password and NISN or email are required".to_string(),
        ));
    };
    if nisn.is_none() && email.is_none() {
        return Err(AppError::BadRequest(
            "Name, password and NISN or email are required".to_string(),
        ));
    }

    let identifiers = nisn
        .iter()
        .map(|v| StudentIdentifier::Nisn(v.clone()))
        .chain(email.iter().map(|v| StudentIdentifier::Email(v.clone())));
    for identifier in identifiers {
        if state.repo.find_student_by_identifier(&identifier).await?.is_some() {
            let message = match identifier {
                StudentIdentifier::Nisn(_) => "NISN already registered",
                StudentIdentifier::Email(_) => "Email already registered",
            };
            return Err(AppError::Conflict(message.to_string()));
        }
    }

    let student = state
        .repo
        .create_student(NewStudent {
            name: name.trim().to_string(),
            nisn,
            email,
            password_hash: hash_password(&password)?,
            class_name: non_empty(payload.class_name),
            phone: non_empty(payload.phone),
        })
        .await?;

    tracing::info!(student_id = %student.id, "student registered");

    Ok(created(
        ApiResponse::ok(StudentProfile::from(student)).with_message("Registration successful"),
    ))
}

/// student_me
///
/// [Public Route] Returns the profile of the student named by `?id=`.
#[utoipa::path(
    get,
    path = "/api/auth/student/me",
    params(IdQuery),
    responses(
        (status = 200, description = "Profile", body = StudentProfile),
        (status = 400, description = "Missing id"),
        (status = 404, description = "Student not found")
    )
)]
pub async fn student_me(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<IdQuery>,
) -> AppResult<ApiResponse<StudentProfile>> {
    let id = query
        .id
        .ok_or_else(|| AppError::BadRequest("Student ID is required".to_string()))?;

    let student = state
        .repo
        .find_student(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;

    Ok(ApiResponse::ok(student.into()))
}
