use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderValue, Request, StatusCode, header, request::Parts},
};
use bk_portal::{
    AppState, InMemoryRepository,
    auth::{AuthAdmin, Claims, PrincipalKind, confirm_student, issue_token},
    config::{AppConfig, Env},
    models::{AdminRole, NewAdmin},
    repository::RepositoryState,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::sync::Arc;
use uuid::Uuid;

// --- Helpers ---

fn production_config() -> AppConfig {
    AppConfig {
        env: Env::Production,
        jwt_secret: "production-test-secret".to_string(),
        ..AppConfig::default()
    }
}

async fn state_with_admin(config: AppConfig, role: AdminRole) -> (AppState, Uuid) {
    let repo = Arc::new(InMemoryRepository::new()) as RepositoryState;
    let admin = repo
        .create_admin(NewAdmin {
            name: "Bu Rina".to_string(),
            username: "rina".to_string(),
            password_hash: "unused".to_string(),
            role,
        })
        .await
        .unwrap();

    (AppState { repo, config }, admin.id)
}

fn parts_with_bearer(value: Option<&str>) -> Parts {
    let mut builder = Request::builder().uri("/api/visits");
    if let Some(value) = value {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {value}"));
    }
    builder.body(()).unwrap().into_parts().0
}

fn bearer_headers(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    );
    headers
}

// --- AuthAdmin Extractor ---

#[tokio::test]
async fn test_auth_admin_resolves_signed_token() {
    let config = production_config();
    let (state, admin_id) = state_with_admin(config.clone(), AdminRole::SuperAdmin).await;
    let token = issue_token(&config, admin_id, PrincipalKind::Admin).unwrap();

    let mut parts = parts_with_bearer(Some(&token));
    let admin = AuthAdmin::from_request_parts(&mut parts, &state)
        .await
        .unwrap();

    assert_eq!(admin.id, admin_id);
    assert!(admin.is_super_admin());
    assert!(admin.require_super_admin("create admins").is_ok());
}

#[tokio::test]
async fn test_auth_admin_missing_header_is_unauthorized() {
    let (state, _) = state_with_admin(AppConfig::default(), AdminRole::Admin).await;

    let mut parts = parts_with_bearer(None);
    let err = AuthAdmin::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_admin_rejects_raw_id_in_production() {
    let (state, admin_id) = state_with_admin(production_config(), AdminRole::Admin).await;

    let mut parts = parts_with_bearer(Some(&admin_id.to_string()));
    let err = AuthAdmin::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_admin_rejects_student_token() {
    let config = production_config();
    let (state, admin_id) = state_with_admin(config.clone(), AdminRole::Admin).await;
    // A student token that happens to carry an admin's id must still be refused.
    let token = issue_token(&config, admin_id, PrincipalKind::Student).unwrap();

    let mut parts = parts_with_bearer(Some(&token));
    let err = AuthAdmin::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_admin_rejects_expired_token() {
    let config = production_config();
    let (state, admin_id) = state_with_admin(config.clone(), AdminRole::Admin).await;

    let issued = chrono::Utc::now().timestamp() as usize - 7_200;
    let claims = Claims {
        sub: admin_id,
        kind: PrincipalKind::Admin,
        iat: issued,
        exp: issued + 60,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .unwrap();

    let mut parts = parts_with_bearer(Some(&token));
    let err = AuthAdmin::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_admin_for_deleted_account_is_unauthorized() {
    let config = production_config();
    let (state, admin_id) = state_with_admin(config.clone(), AdminRole::Admin).await;
    let token = issue_token(&config, admin_id, PrincipalKind::Admin).unwrap();
    state.repo.delete_admin(admin_id).await.unwrap();

    let mut parts = parts_with_bearer(Some(&token));
    let err = AuthAdmin::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
}

#[test]
fn test_regular_admin_fails_super_admin_check() {
    let admin = AuthAdmin {
        id: Uuid::new_v4(),
        role: "ADMIN".to_string(),
    };

    let err = admin.require_super_admin("delete admins").unwrap_err();
    assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(err.to_string(), "Forbidden: Only super admin can delete admins");
}

// --- Student Confirmation ---

#[test]
fn test_confirm_student_trusts_supplied_id_locally() {
    let config = AppConfig::default();
    assert!(confirm_student(&HeaderMap::new(), &config, Uuid::new_v4()).is_ok());
}

#[test]
fn test_confirm_student_requires_matching_token_in_production() {
    let config = production_config();
    let student_id = Uuid::new_v4();
    let own_token = issue_token(&config, student_id, PrincipalKind::Student).unwrap();
    let other_token = issue_token(&config, Uuid::new_v4(), PrincipalKind::Student).unwrap();

    assert!(confirm_student(&bearer_headers(&own_token), &config, student_id).is_ok());

    let missing = confirm_student(&HeaderMap::new(), &config, student_id).unwrap_err();
    assert_eq!(missing.status_code(), StatusCode::UNAUTHORIZED);

    let mismatched = confirm_student(&bearer_headers(&other_token), &config, student_id).unwrap_err();
    assert_eq!(mismatched.status_code(), StatusCode::UNAUTHORIZED);
}
