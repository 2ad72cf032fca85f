use crate::{
    auth::hash_password,
    error::AppResult,
    models::{AdminRole, NewAdmin},
    repository::RepositoryState,
};

/// Username, display name and role of the accounts every fresh install gets.
pub const DEFAULT_ADMINS: [(&str, &str, AdminRole); 2] = [
    ("super.admin", "Super Admin", AdminRole::SuperAdmin),
    ("admin", "Admin", AdminRole::Admin),
];

/// seed_default_admins
///
/// Creates the default admin accounts with `password`. Accounts that already exist are
/// left as they are, so running this on every startup is safe.
pub async fn seed_default_admins(repo: &RepositoryState, password: &str) -> AppResult<()> {
    for (username, name, role) in DEFAULT_ADMINS {
        let admin = repo
            .ensure_admin(NewAdmin {
                name: name.to_string(),
                username: username.to_string(),
                password_hash: hash_password(password)?,
                role,
            })
            .await?;

        tracing::info!(username = %admin.username, role = %admin.role, "default admin ready");
    }

    Ok(())
}
