use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use bk_portal::{
    AppState, InMemoryRepository, create_router,
    auth::{PrincipalKind, hash_password, issue_token},
    config::AppConfig,
    models::{AdminRole, NewAdmin},
    repository::RepositoryState,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

// --- Test Harness ---

struct TestRouter {
    repo: RepositoryState,
    config: AppConfig,
}

impl TestRouter {
    fn new() -> Self {
        Self {
            repo: Arc::new(InMemoryRepository::new()) as RepositoryState,
            config: AppConfig::default(),
        }
    }

    fn router(&self) -> Router {
        create_router(AppState {
            repo: self.repo.clone(),
            config: self.config.clone(),
        })
    }

    async fn admin(&self, username: &str, role: AdminRole) -> (Uuid, String) {
        let admin = self
            .repo
            .create_admin(NewAdmin {
                name: username.to_string(),
                username: username.to_string(),
                password_hash: "unused".to_string(),
                role,
            })
            .await
            .unwrap();
        let token = issue_token(&self.config, admin.id, PrincipalKind::Admin).unwrap();
        (admin.id, token)
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}

// --- Infrastructure ---

#[tokio::test]
async fn test_health_returns_ok() {
    let app = TestRouter::new();
    let response = app
        .router()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let app = TestRouter::new();
    let (status, doc) = app
        .send(Method::GET, "/api-docs/openapi.json", None, None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/articles/{id}"].is_object());
    assert!(doc["paths"]["/api/dashboard/stats"].is_object());
}

// --- Authentication ---

#[tokio::test]
async fn test_login_failure_is_401_without_data() {
    let app = TestRouter::new();
    let hash = hash_password("benar").unwrap();
    app.repo
        .create_admin(NewAdmin {
            name: "Guru".to_string(),
            username: "guru".to_string(),
            password_hash: hash,
            role: AdminRole::Admin,
        })
        .await
        .unwrap();

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "guru", "password": "salah" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Invalid credentials");
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn test_login_success_envelope() {
    let app = TestRouter::new();
    let hash = hash_password("benar").unwrap();
    app.repo
        .create_admin(NewAdmin {
            name: "Guru".to_string(),
            username: "guru".to_string(),
            password_hash: hash,
            role: AdminRole::Admin,
        })
        .await
        .unwrap();

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "guru", "password": "benar" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["admin"]["username"], "guru");
    assert!(body["data"]["admin"].get("passwordHash").is_none());
    assert!(body["data"]["token"].is_string());
}

#[tokio::test]
async fn test_protected_route_without_bearer_is_401() {
    let app = TestRouter::new();
    let (status, body) = app.send(Method::GET, "/api/visits", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn test_raw_admin_id_accepted_as_bearer_locally() {
    let app = TestRouter::new();
    let (admin_id, _) = app.admin("guru", AdminRole::Admin).await;

    let (status, _) = app
        .send(
            Method::GET,
            "/api/dashboard/stats",
            Some(&admin_id.to_string()),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_register_duplicate_email_is_409() {
    let app = TestRouter::new();
    let payload = json!({
        "name": "Rina",
        "email": "rina@sekolah.id",
        "password": "rina123",
        "class": "XI-1"
    });

    let (first, body) = app
        .send(
            Method::POST,
            "/api/auth/student/register",
            None,
            Some(payload.clone()),
        )
        .await;
    assert_eq!(first, StatusCode::CREATED);
    assert_eq!(body["data"]["class"], "XI-1");

    let (second, _) = app
        .send(Method::POST, "/api/auth/student/register", None, Some(payload))
        .await;
    assert_eq!(second, StatusCode::CONFLICT);
}

// --- Admin Directory ---

#[tokio::test]
async fn test_admin_directory_is_super_admin_only() {
    let app = TestRouter::new();
    let (_, token) = app.admin("guru", AdminRole::Admin).await;

    let (status, body) = app.send(Method::GET, "/api/admins", Some(&token), None).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_admin_list_includes_counts() {
    let app = TestRouter::new();
    let (super_id, token) = app.admin("super.admin", AdminRole::SuperAdmin).await;

    app.send(
        Method::POST,
        "/api/articles",
        Some(&token),
        Some(json!({
            "title": "Judul",
            "excerpt": "Ringkasan",
            "content": "Isi",
            "authorId": super_id
        })),
    )
    .await;

    let (status, body) = app.send(Method::GET, "/api/admins", Some(&token), None).await;

    assert_eq!(status, StatusCode::OK);
    let list = body["data"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["_count"]["articles"], 1);
    assert_eq!(list[0]["_count"]["visits"], 0);
}

#[tokio::test]
async fn test_create_duplicate_admin_is_409_and_self_delete_is_400() {
    let app = TestRouter::new();
    let (super_id, token) = app.admin("super.admin", AdminRole::SuperAdmin).await;
    let payload = json!({
        "name": "Guru",
        "username": "guru",
        "password": "guru123",
        "role": "ADMIN"
    });

    let (created, body) = app
        .send(Method::POST, "/api/admins", Some(&token), Some(payload.clone()))
        .await;
    assert_eq!(created, StatusCode::CREATED);
    assert_eq!(body["data"]["role"], "ADMIN");

    let (duplicate, _) = app
        .send(Method::POST, "/api/admins", Some(&token), Some(payload))
        .await;
    assert_eq!(duplicate, StatusCode::CONFLICT);

    let (self_delete, _) = app
        .send(
            Method::DELETE,
            &format!("/api/admins/{super_id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(self_delete, StatusCode::BAD_REQUEST);
}

// --- Articles ---

#[tokio::test]
async fn test_article_patch_matches_put() {
    let app = TestRouter::new();
    let (admin_id, token) = app.admin("guru", AdminRole::Admin).await;

    let mut ids = Vec::new();
    for _ in 0..2 {
        let (_, body) = app
            .send(
                Method::POST,
                "/api/articles",
                Some(&token),
                Some(json!({
                    "title": "Judul",
                    "excerpt": "Ringkasan",
                    "content": "Isi",
                    "authorId": admin_id
                })),
            )
            .await;
        ids.push(body["data"]["id"].as_str().unwrap().to_string());
    }

    let change = json!({ "title": "Diperbarui", "category": "Karir", "readTime": "" });
    let (put_status, put_body) = app
        .send(
            Method::PUT,
            &format!("/api/articles/{}", ids[0]),
            Some(&token),
            Some(change.clone()),
        )
        .await;
    let (patch_status, patch_body) = app
        .send(
            Method::PATCH,
            &format!("/api/articles/{}", ids[1]),
            Some(&token),
            Some(change),
        )
        .await;

    assert_eq!(put_status, StatusCode::OK);
    assert_eq!(patch_status, StatusCode::OK);
    for field in ["title", "excerpt", "content", "image", "category", "readTime", "author"] {
        assert_eq!(put_body["data"][field], patch_body["data"][field], "{field}");
    }
    assert_eq!(put_body["data"]["readTime"], "5 min read");
}

#[tokio::test]
async fn test_article_reads_are_public_writes_are_not() {
    let app = TestRouter::new();

    let (list_status, body) = app.send(Method::GET, "/api/articles", None, None).await;
    assert_eq!(list_status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));

    let (create_status, _) = app
        .send(
            Method::POST,
            "/api/articles",
            None,
            Some(json!({ "title": "x", "excerpt": "y", "content": "z" })),
        )
        .await;
    assert_eq!(create_status, StatusCode::UNAUTHORIZED);
}

// --- Comments ---

#[tokio::test]
async fn test_non_owner_cannot_delete_comment() {
    let app = TestRouter::new();
    let (admin_id, token) = app.admin("guru", AdminRole::Admin).await;
    let (_, article) = app
        .send(
            Method::POST,
            "/api/articles",
            Some(&token),
            Some(json!({
                "title": "Judul",
                "excerpt": "Ringkasan",
                "content": "Isi",
                "authorId": admin_id
            })),
        )
        .await;
    let article_id = article["data"]["id"].as_str().unwrap().to_string();

    let mut students = Vec::new();
    for nisn in ["111", "222"] {
        let (_, body) = app
            .send(
                Method::POST,
                "/api/auth/student/register",
                None,
                Some(json!({ "name": nisn, "nisn": nisn, "password": "pw" })),
            )
            .await;
        students.push(body["data"]["id"].as_str().unwrap().to_string());
    }

    let (status, comment) = app
        .send(
            Method::POST,
            &format!("/api/articles/{article_id}/comments"),
            None,
            Some(json!({ "content": "Bermanfaat", "studentId": students[0] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let comment_id = comment["data"]["id"].as_str().unwrap().to_string();

    let (forbidden, _) = app
        .send(
            Method::DELETE,
            &format!(
                "/api/articles/{article_id}/comments/{comment_id}?studentId={}",
                students[1]
            ),
            None,
            None,
        )
        .await;
    assert_eq!(forbidden, StatusCode::FORBIDDEN);

    let (listed, body) = app
        .send(
            Method::GET,
            &format!("/api/articles/{article_id}/comments"),
            None,
            None,
        )
        .await;
    assert_eq!(listed, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["student"]["name"], "111");
}

// --- Visits ---

#[tokio::test]
async fn test_visit_status_put_persists_any_value() {
    let app = TestRouter::new();
    let (_, token) = app.admin("guru", AdminRole::Admin).await;

    let (created, body) = app
        .send(
            Method::POST,
            "/api/visits",
            None,
            Some(json!({
                "studentName": "Andi",
                "class": "XII-3",
                "visitDate": "2025-05-02",
                "visitTime": "10:30",
                "reason": "Masalah belajar"
            })),
        )
        .await;
    assert_eq!(created, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "pending");
    let visit_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/visits/{visit_id}"),
            Some(&token),
            Some(json!({ "status": "completed" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");

    let (status, body) = app
        .send(
            Method::PATCH,
            &format!("/api/visits/{visit_id}"),
            Some(&token),
            Some(json!({ "status": "PENDING" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "pending");

    let (_, fetched) = app
        .send(
            Method::GET,
            &format!("/api/visits/{visit_id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(fetched["data"]["status"], "pending");
}

#[tokio::test]
async fn test_delete_missing_visit_is_404() {
    let app = TestRouter::new();
    let (_, token) = app.admin("guru", AdminRole::Admin).await;

    let (status, body) = app
        .send(
            Method::DELETE,
            &format!("/api/visits/{}", Uuid::new_v4()),
            Some(&token),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Visit not found");
}

// --- Errors ---

fn assert_failure_envelope(body: &Value) {
    assert_eq!(body["success"], false, "expected error envelope, got {body}");
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn test_malformed_path_id_is_404_envelope() {
    let app = TestRouter::new();
    let (_, token) = app.admin("guru", AdminRole::Admin).await;

    let (status, body) = app
        .send(Method::GET, "/api/articles/not-a-uuid", None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_failure_envelope(&body);

    let (status, body) = app
        .send(Method::DELETE, "/api/visits/123", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_failure_envelope(&body);
}

#[tokio::test]
async fn test_wrongly_typed_body_is_400_envelope() {
    let app = TestRouter::new();
    let (_, token) = app.admin("guru", AdminRole::Admin).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/visits",
            None,
            Some(json!({
                "studentId": "abc",
                "visitDate": "2025-05-02",
                "visitTime": "10:30",
                "reason": "Konsultasi"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_failure_envelope(&body);

    let (_, created) = app
        .send(
            Method::POST,
            "/api/visits",
            None,
            Some(json!({
                "studentName": "Andi",
                "class": "XII-3",
                "visitDate": "2025-05-02",
                "visitTime": "10:30",
                "reason": "Konsultasi"
            })),
        )
        .await;
    let visit_id = created["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/visits/{visit_id}"),
            Some(&token),
            Some(json!({ "status": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_failure_envelope(&body);
}

#[tokio::test]
async fn test_unparseable_json_body_is_400_envelope() {
    let app = TestRouter::new();
    let request = Request::post("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"username\":"))
        .unwrap();

    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_failure_envelope(&body);
}

#[tokio::test]
async fn test_malformed_student_id_on_comment_delete_is_401_envelope() {
    let app = TestRouter::new();

    let (status, body) = app
        .send(
            Method::DELETE,
            &format!(
                "/api/articles/{}/comments/{}?studentId=xyz",
                Uuid::new_v4(),
                Uuid::new_v4()
            ),
            None,
            None,
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_failure_envelope(&body);
}

#[tokio::test]
async fn test_database_failure_hides_details() {
    let app = TestRouter {
        repo: Arc::new(InMemoryRepository::new_failing()) as RepositoryState,
        config: AppConfig::default(),
    };

    let (status, body) = app.send(Method::GET, "/api/articles", None, None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
}
