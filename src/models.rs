use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Domain Enumerations ---

/// AdminRole
///
/// The RBAC field of an admin account. Stored as its upper-case name in `admins.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminRole {
    Admin,
    SuperAdmin,
}

impl AdminRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::SuperAdmin => "SUPER_ADMIN",
        }
    }

    /// Exact match against the stored names. Anything else is not a role.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ADMIN" => Some(Self::Admin),
            "SUPER_ADMIN" => Some(Self::SuperAdmin),
            _ => None,
        }
    }
}

/// VisitStatus
///
/// Lifecycle of a counseling visit: PENDING, then APPROVED or CANCELLED, then COMPLETED.
/// Transitions are not enforced; an admin may set any value from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitStatus {
    Pending,
    Approved,
    Completed,
    Cancelled,
}

impl VisitStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Case-insensitive; clients send the lower-case form they receive.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "APPROVED" => Some(Self::Approved),
            "COMPLETED" => Some(Self::Completed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// ISO-8601 with millisecond precision and a `Z` suffix, e.g. `2025-01-31T08:00:00.000Z`.
pub fn iso_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Calendar date as `YYYY-MM-DD`.
pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (reduced to its UTC date).
pub fn parse_visit_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|at| at.with_timezone(&Utc).date_naive())
    })
}

// --- Database Rows ---

/// Admin
///
/// A row of `admins`. Carries the password hash, so it never leaves the server as-is;
/// handlers convert it into `AdminProfile`.
#[derive(Debug, Clone, FromRow)]
pub struct Admin {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// AdminWithCounts
///
/// Admin listing row, joined with the number of authored articles and approved visits.
#[derive(Debug, Clone, FromRow)]
pub struct AdminWithCounts {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub article_count: i64,
    pub visit_count: i64,
}

/// Student
///
/// A row of `students`. At least one of `nisn` / `email` is present.
#[derive(Debug, Clone, FromRow)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub nisn: Option<String>,
    pub email: Option<String>,
    pub password_hash: String,
    /// Maps SQL column "class"; `class` is not usable as a Rust identifier.
    #[sqlx(rename = "class")]
    pub class_name: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Article
///
/// A row of `articles` joined with the author's display name.
#[derive(Debug, Clone, FromRow)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub image: String,
    pub category: String,
    pub read_time: String,
    pub author_id: Uuid,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Comment
///
/// A row of `comments`. Student comments are joined with the student's name and class;
/// anonymous comments carry their own `name` / `email`.
#[derive(Debug, Clone, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub article_id: Uuid,
    pub student_id: Option<Uuid>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(default)]
    pub student_name: Option<String>,
    #[sqlx(default)]
    pub student_class: Option<String>,
}

/// Visit
///
/// A row of `visits`. For registered students, name/class/phone/email are resolved from
/// the linked student record; anonymous visits keep their manually entered values.
#[derive(Debug, Clone, FromRow)]
pub struct Visit {
    pub id: Uuid,
    pub student_id: Option<Uuid>,
    pub student_name: Option<String>,
    #[sqlx(rename = "class")]
    pub class_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub visit_date: NaiveDate,
    pub visit_time: String,
    pub reason: String,
    pub status: String,
    pub notes: Option<String>,
    pub approved_by: Option<Uuid>,
    #[sqlx(default)]
    pub approver_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Repository Inputs ---

#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub name: String,
    pub username: String,
    pub password_hash: String,
    pub role: AdminRole,
}

/// Partial admin update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct AdminChanges {
    pub name: Option<String>,
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<AdminRole>,
}

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub name: String,
    pub nisn: Option<String>,
    pub email: Option<String>,
    pub password_hash: String,
    pub class_name: Option<String>,
    pub phone: Option<String>,
}

/// The unique key a student logs in with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentIdentifier {
    Nisn(String),
    Email(String),
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ArticleFilter {
    /// Exact category match.
    pub category: Option<String>,
    /// Case-insensitive match against title, excerpt and content.
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub image: String,
    pub category: String,
    pub read_time: String,
    pub author_id: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub image: Option<String>,
    pub category: Option<String>,
    pub read_time: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub article_id: Uuid,
    pub student_id: Option<Uuid>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct NewVisit {
    pub student_id: Option<Uuid>,
    pub student_name: Option<String>,
    pub class_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub visit_date: NaiveDate,
    pub visit_time: String,
    pub reason: String,
}

/// Partial visit update. `notes: Some(None)` clears the notes.
#[derive(Debug, Clone, Default)]
pub struct VisitChanges {
    pub status: Option<VisitStatus>,
    pub notes: Option<Option<String>>,
    pub approved_by: Option<Uuid>,
}

// --- Request Payloads (Input Schemas) ---

/// Distinguishes an explicit `null` (Some(None)) from an absent field (None).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Query-string UUID where a malformed value counts as absent.
fn lenient_uuid<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|raw| Uuid::parse_str(raw.trim()).ok()))
}

/// AdminLoginRequest
///
/// Input payload for `POST /api/auth/login`. Fields are optional so missing values
/// produce a 400 envelope instead of a deserialization rejection.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct AdminLoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// StudentLoginRequest
///
/// Students log in with either their NISN or their email.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct StudentLoginRequest {
    pub nisn: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct StudentRegisterRequest {
    pub name: Option<String>,
    pub nisn: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct CreateAdminRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    #[schema(example = "ADMIN")]
    pub role: Option<String>,
}

/// UpdateAdminRequest
///
/// Partial update; omitted or empty fields are left unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdateAdminRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateArticleRequest {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub image: Option<String>,
    pub category: Option<String>,
    pub read_time: Option<String>,
    pub author_id: Option<Uuid>,
}

/// UpdateArticleRequest
///
/// Shared by PUT and PATCH. Empty strings count as "not provided".
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArticleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub content: Option<String>,
    pub student_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateVisitRequest {
    pub student_name: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[schema(example = "2025-02-14")]
    pub visit_date: Option<String>,
    #[schema(example = "09:00")]
    pub visit_time: Option<String>,
    pub reason: Option<String>,
    pub student_id: Option<Uuid>,
}

/// UpdateVisitRequest
///
/// Admin-side partial merge. `status` is matched case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVisitRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "approved")]
    pub status: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct VisitFilter {
    /// One of pending, approved, completed, cancelled.
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct StudentIdQuery {
    /// The acting student. A value that is not a UUID identifies nobody.
    #[serde(default, deserialize_with = "lenient_uuid")]
    pub student_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IdQuery {
    pub id: Option<Uuid>,
}

// --- Response Schemas (Output) ---

/// AdminProfile
///
/// Admin record as returned to clients, without the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AdminProfile {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub role: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Admin> for AdminProfile {
    fn from(admin: Admin) -> Self {
        Self {
            id: admin.id,
            name: admin.name,
            username: admin.username,
            role: admin.role,
            created_at: iso_timestamp(&admin.created_at),
            updated_at: iso_timestamp(&admin.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AdminCounts {
    pub articles: i64,
    pub visits: i64,
}

/// AdminListItem
///
/// Entry of the admin directory listing, with ownership counters under `_count`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AdminListItem {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub role: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(rename = "_count")]
    pub counts: AdminCounts,
}

impl From<AdminWithCounts> for AdminListItem {
    fn from(row: AdminWithCounts) -> Self {
        Self {
            id: row.id,
            name: row.name,
            username: row.username,
            role: row.role,
            created_at: iso_timestamp(&row.created_at),
            updated_at: iso_timestamp(&row.updated_at),
            counts: AdminCounts {
                articles: row.article_count,
                visits: row.visit_count,
            },
        }
    }
}

/// AdminSession
///
/// Successful admin login: the profile plus a bearer token for subsequent calls.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AdminSession {
    pub admin: AdminProfile,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StudentProfile {
    pub id: Uuid,
    pub name: String,
    pub nisn: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub phone: Option<String>,
    pub created_at: String,
}

impl From<Student> for StudentProfile {
    fn from(student: Student) -> Self {
        Self {
            id: student.id,
            name: student.name,
            nisn: student.nisn,
            email: student.email,
            class_name: student.class_name,
            phone: student.phone,
            created_at: iso_timestamp(&student.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct StudentSession {
    pub student: StudentProfile,
    pub token: String,
}

/// ArticleResponse
///
/// Article shaped for the frontend: `author` is the author's name and `date` the
/// `YYYY-MM-DD` part of `createdAt`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ArticleResponse {
    pub id: Uuid,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub image: String,
    pub category: String,
    pub read_time: String,
    pub author_id: Uuid,
    pub author: String,
    pub date: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Article> for ArticleResponse {
    fn from(article: Article) -> Self {
        Self {
            id: article.id,
            title: article.title,
            excerpt: article.excerpt,
            content: article.content,
            image: article.image,
            category: article.category,
            read_time: article.read_time,
            author_id: article.author_id,
            author: article.author_name,
            date: iso_date(article.created_at.date_naive()),
            created_at: iso_timestamp(&article.created_at),
            updated_at: iso_timestamp(&article.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CommentAuthor {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CommentResponse {
    pub id: Uuid,
    pub article_id: Uuid,
    pub student_id: Option<Uuid>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
    pub student: Option<CommentAuthor>,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        let student = match (comment.student_id, comment.student_name) {
            (Some(id), Some(name)) => Some(CommentAuthor {
                id,
                name,
                class_name: comment.student_class,
            }),
            _ => None,
        };

        Self {
            id: comment.id,
            article_id: comment.article_id,
            student_id: comment.student_id,
            name: comment.name,
            email: comment.email,
            content: comment.content,
            created_at: iso_timestamp(&comment.created_at),
            updated_at: iso_timestamp(&comment.updated_at),
            student,
        }
    }
}

/// VisitResponse
///
/// Visit shaped for the dashboard. `status` is lower-case and `approvedBy` is the
/// approver's name.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct VisitResponse {
    pub id: Uuid,
    pub student_id: Option<Uuid>,
    pub student_name: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub visit_date: String,
    pub visit_time: String,
    pub reason: String,
    pub status: String,
    pub notes: Option<String>,
    pub approved_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Visit> for VisitResponse {
    fn from(visit: Visit) -> Self {
        Self {
            id: visit.id,
            student_id: visit.student_id,
            student_name: visit.student_name,
            class_name: visit.class_name,
            email: visit.email,
            phone: visit.phone,
            visit_date: iso_date(visit.visit_date),
            visit_time: visit.visit_time,
            reason: visit.reason,
            status: visit.status.to_ascii_lowercase(),
            notes: visit.notes,
            approved_by: visit.approver_name,
            created_at: iso_timestamp(&visit.created_at),
            updated_at: iso_timestamp(&visit.updated_at),
        }
    }
}

/// DashboardStats
///
/// Counters for the admin dashboard overview (GET /api/dashboard/stats).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DashboardStats {
    pub total_articles: i64,
    pub total_visits: i64,
    pub pending_visits: i64,
    /// Visits whose `visitDate` is the server's current UTC date.
    pub today_visits: i64,
    pub total_students: i64,
    pub total_comments: i64,
}
