use axum::{extract::State, http::StatusCode};
use uuid::Uuid;

use super::non_empty;
use crate::{
    AppState,
    auth::{AuthAdmin, hash_password},
    error::{AppError, AppResult},
    extract::{AppJson, AppPath},
    models::{
        AdminChanges, AdminListItem, AdminProfile, AdminRole, CreateAdminRequest, NewAdmin,
        UpdateAdminRequest,
    },
    response::{ApiResponse, created},
};

fn admin_not_found() -> AppError {
    AppError::NotFound("Admin not found".to_string())
}

/// list_admins
///
/// [Super Admin Route] Lists every admin account, newest first, with the number of
/// articles each authored and visits each approved under `_count`.
#[utoipa::path(
    get,
    path = "/api/admins",
    responses(
        (status = 200, description = "Admin directory", body = [AdminListItem]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a super admin")
    )
)]
pub async fn list_admins(
    admin: AuthAdmin,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<AdminListItem>>> {
    admin.require_super_admin("view admins")?;

    let admins = state.repo.list_admins().await?;
    Ok(ApiResponse::ok(
        admins.into_iter().map(AdminListItem::from).collect(),
    ))
}

/// get_admin
///
/// [Super Admin Route] Returns a single admin profile.
#[utoipa::path(
    get,
    path = "/api/admins/{id}",
    params(("id" = Uuid, Path, description = "Admin id")),
    responses(
        (status = 200, description = "Admin", body = AdminProfile),
        (status = 403, description = "Not a super admin"),
        (status = 404, description = "Admin not found")
    )
)]
pub async fn get_admin(
    admin: AuthAdmin,
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<ApiResponse<AdminProfile>> {
    admin.require_super_admin("view admins")?;

    let found = state.repo.find_admin(id).await?.ok_or_else(admin_not_found)?;
    Ok(ApiResponse::ok(found.into()))
}

/// create_admin
///
/// [Super Admin Route] Creates a new admin account.
///
/// All four fields are mandatory and `role` must be `ADMIN` or `SUPER_ADMIN`.
#[utoipa::path(
    post,
    path = "/api/admins",
    request_body = CreateAdminRequest,
    responses(
        (status = 201, description = "Admin created", body = AdminProfile),
        (status = 400, description = "Missing field or invalid role"),
        (status = 403, description = "Not a super admin"),
        (status = 409, description = "Username already exists")
    )
)]
pub async fn create_admin(
    admin: AuthAdmin,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateAdminRequest>,
) -> AppResult<(StatusCode, ApiResponse<AdminProfile>)> {
    admin.require_super_admin("create admins")?;

    let (Some(name), Some(username), Some(password), Some(role)) = (
        non_empty(payload.name),
        non_empty(payload.username),
        non_empty(payload.password),
        non_empty(payload.role),
    ) else {
        return Err(AppError::BadRequest("All fields are required".to_string()));
    };

    let role = AdminRole::parse(role.trim())
        .ok_or_else(|| AppError::BadRequest("Invalid role".to_string()))?;
    let username = username.trim().to_string();

    if state.repo.find_admin_by_username(&username).await?.is_some() {
        return Err(AppError::Conflict("Username already exists".to_string()));
    }

    let new_admin = state
        .repo
        .create_admin(NewAdmin {
            name: name.trim().to_string(),
            username,
            password_hash: hash_password(&password)?,
            role,
        })
        .await?;

    tracing::info!(
        admin_id = %new_admin.id,
        created_by = %admin.id,
        role = role.as_str(),
        "admin account created"
    );

    Ok(created(
        ApiResponse::ok(AdminProfile::from(new_admin)).with_message("Admin created successfully"),
    ))
}

/// update_admin
///
/// [Super Admin Route] Partially updates an admin. Empty fields are skipped; an
/// unrecognised `role` is ignored rather than rejected.
#[utoipa::path(
    put,
    path = "/api/admins/{id}",
    params(("id" = Uuid, Path, description = "Admin id")),
    request_body = UpdateAdminRequest,
    responses(
        (status = 200, description = "Admin updated", body = AdminProfile),
        (status = 403, description = "Not a super admin"),
        (status = 404, description = "Admin not found"),
        (status = 409, description = "Username already exists")
    )
)]
pub async fn update_admin(
    admin: AuthAdmin,
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateAdminRequest>,
) -> AppResult<ApiResponse<AdminProfile>> {
    admin.require_super_admin("update admins")?;

    if state.repo.find_admin(id).await?.is_none() {
        return Err(admin_not_found());
    }

    let username = non_empty(payload.username).map(|u| u.trim().to_string());
    if let Some(username) = &username {
        let holder = state.repo.find_admin_by_username(username).await?;
        if holder.is_some_and(|holder| holder.id != id) {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }
    }

    let password_hash = match non_empty(payload.password) {
        Some(password) => Some(hash_password(&password)?),
        None => None,
    };

    let changes = AdminChanges {
        name: non_empty(payload.name).map(|n| n.trim().to_string()),
        username,
        password_hash,
        role: payload.role.as_deref().and_then(AdminRole::parse),
    };

    let updated = state
        .repo
        .update_admin(id, changes)
        .await?
        .ok_or_else(admin_not_found)?;

    Ok(ApiResponse::ok(AdminProfile::from(updated)).with_message("Admin updated successfully"))
}

/// delete_admin
///
/// [Super Admin Route] Removes an admin account and, by cascade, their articles.
/// A super admin cannot remove their own account.
#[utoipa::path(
    delete,
    path = "/api/admins/{id}",
    params(("id" = Uuid, Path, description = "Admin id")),
    responses(
        (status = 200, description = "Admin deleted"),
        (status = 400, description = "Attempted self-deletion"),
        (status = 403, description = "Not a super admin"),
        (status = 404, description = "Admin not found")
    )
)]
pub async fn delete_admin(
    admin: AuthAdmin,
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<ApiResponse<()>> {
    admin.require_super_admin("delete admins")?;

    if admin.id == id {
        return Err(AppError::BadRequest(
            "Cannot delete your own account".to_string(),
        ));
    }

    if !state.repo.delete_admin(id).await? {
        return Err(admin_not_found());
    }

    tracing::info!(admin_id = %id, deleted_by = %admin.id, "admin account deleted");
    Ok(ApiResponse::done("Admin deleted successfully"))
}
