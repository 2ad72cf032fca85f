use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::{AppError, AppResult},
    models::AdminRole,
    repository::RepositoryState,
};

/// PrincipalKind
///
/// Which table a token subject refers to. A student token never authenticates an admin
/// and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    Admin,
    Student,
}

/// Claims
///
/// Payload of the session tokens issued at login.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Row id of the admin or student.
    pub sub: Uuid,
    pub kind: PrincipalKind,
    pub exp: usize,
    pub iat: usize,
}

/// Signs a session token for `subject`, valid for `config.token_ttl_secs`.
pub fn issue_token(config: &AppConfig, subject: Uuid, kind: PrincipalKind) -> AppResult<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: subject,
        kind,
        iat: usize::try_from(now).unwrap_or_default(),
        exp: usize::try_from(now.saturating_add(config.token_ttl_secs)).unwrap_or_default(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
}

/// Decodes and validates a session token. Expired or tampered tokens yield `None`.
pub fn decode_token(config: &AppConfig, token: &str) -> Option<Claims> {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .ok()
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolves the subject a bearer value speaks for.
///
/// Signed tokens are always honoured when their kind matches. In `Env::Local` a bare row
/// UUID is accepted as well, which is how older dashboard clients authenticate.
fn resolve_subject(config: &AppConfig, token: &str, kind: PrincipalKind) -> Option<Uuid> {
    if let Some(claims) = decode_token(config, token) {
        return (claims.kind == kind).then_some(claims.sub);
    }

    match config.env {
        Env::Local => Uuid::parse_str(token).ok(),
        Env::Production => None,
    }
}

/// AuthAdmin
///
/// The resolved admin behind a request. Used as a handler argument on every admin-only
/// route; the role is re-read from the database on each request so demotions and
/// deletions take effect immediately.
#[derive(Debug, Clone)]
pub struct AuthAdmin {
    pub id: Uuid,
    /// 'ADMIN' or 'SUPER_ADMIN'.
    pub role: String,
}

impl AuthAdmin {
    pub fn is_super_admin(&self) -> bool {
        AdminRole::parse(&self.role) == Some(AdminRole::SuperAdmin)
    }

    /// Rejects with 403 unless the caller is a super admin. `action` completes the
    /// sentence "Only super admin can ...".
    pub fn require_super_admin(&self, action: &str) -> AppResult<()> {
        if self.is_super_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Forbidden: Only super admin can {action}"
            )))
        }
    }
}

/// Rejection: 401 when the bearer is missing, invalid, or names no existing admin.
impl<S> FromRequestParts<S> for AuthAdmin
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let token = bearer_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        let admin_id =
            resolve_subject(&config, token, PrincipalKind::Admin).ok_or(AppError::Unauthorized)?;

        let admin = repo
            .find_admin(admin_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthAdmin {
            id: admin.id,
            role: admin.role,
        })
    }
}

/// confirm_student
///
/// Checks that the caller may act as `student_id` (comment deletion, student-linked
/// comments and visits). In production this requires a student token whose subject is
/// `student_id`; locally the supplied id is trusted.
pub fn confirm_student(headers: &HeaderMap, config: &AppConfig, student_id: Uuid) -> AppResult<()> {
    if config.env == Env::Local {
        return Ok(());
    }

    let token = bearer_token(headers).ok_or(AppError::Unauthorized)?;
    match resolve_subject(config, token, PrincipalKind::Student) {
        Some(subject) if subject == student_id => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

// --- Password Hashing ---

/// Hashes a password with Argon2id and a random salt.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

/// Returns true when `password` matches the stored PHC `hash`. Malformed hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let hash = hash_password("guru123").unwrap();
        assert!(verify_password("guru123", &hash));
        assert!(!verify_password("guru124", &hash));
        assert!(!verify_password("guru123", "not-a-phc-string"));
    }

    #[test]
    fn token_kind_is_enforced() {
        let config = AppConfig {
            env: Env::Production,
            ..AppConfig::default()
        };
        let id = Uuid::new_v4();
        let token = issue_token(&config, id, PrincipalKind::Student).unwrap();

        assert_eq!(resolve_subject(&config, &token, PrincipalKind::Student), Some(id));
        assert_eq!(resolve_subject(&config, &token, PrincipalKind::Admin), None);
    }

    #[test]
    fn huge_ttl_saturates_instead_of_overflowing() {
        let config = AppConfig {
            token_ttl_secs: i64::MAX,
            ..AppConfig::default()
        };
        let id = Uuid::new_v4();
        let token = issue_token(&config, id, PrincipalKind::Admin).unwrap();

        let claims = decode_token(&config, &token).unwrap();
        assert_eq!(claims.sub, id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn raw_ids_only_accepted_locally() {
        let id = Uuid::new_v4();
        let local = AppConfig::default();
        let production = AppConfig {
            env: Env::Production,
            ..AppConfig::default()
        };

        assert_eq!(
            resolve_subject(&local, &id.to_string(), PrincipalKind::Admin),
            Some(id)
        );
        assert_eq!(
            resolve_subject(&production, &id.to_string(), PrincipalKind::Admin),
            None
        );
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issuer = AppConfig {
            jwt_secret: "issuer-secret".to_string(),
            ..AppConfig::default()
        };
        let verifier = AppConfig {
            env: Env::Production,
            jwt_secret: "verifier-secret".to_string(),
            ..AppConfig::default()
        };
        let token = issue_token(&issuer, Uuid::new_v4(), PrincipalKind::Admin).unwrap();

        assert!(decode_token(&verifier, &token).is_none());
    }
}
