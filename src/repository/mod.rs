use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{
    Admin, AdminChanges, AdminWithCounts, Article, ArticleChanges, ArticleFilter, Comment,
    DashboardStats, NewAdmin, NewArticle, NewComment, NewStudent, NewVisit, Student,
    StudentIdentifier, Visit, VisitChanges, VisitStatus,
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// Result of a persistence call. Database failures surface to handlers, which turn them
/// into 500 responses.
pub type RepoResult<T> = Result<T, sqlx::Error>;

/// Repository Trait
///
/// The persistence contract the handlers are written against. `Option` means "row may
/// not exist", `bool` on deletes means "a row was removed".
///
/// **Send + Sync + async_trait** make `Arc<dyn Repository>` shareable across Axum tasks.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Admins ---
    async fn find_admin(&self, id: Uuid) -> RepoResult<Option<Admin>>;
    async fn find_admin_by_username(&self, username: &str) -> RepoResult<Option<Admin>>;
    /// Newest first, with article and approved-visit counts.
    async fn list_admins(&self) -> RepoResult<Vec<AdminWithCounts>>;
    async fn create_admin(&self, new: NewAdmin) -> RepoResult<Admin>;
    async fn update_admin(&self, id: Uuid, changes: AdminChanges) -> RepoResult<Option<Admin>>;
    async fn delete_admin(&self, id: Uuid) -> RepoResult<bool>;
    /// Inserts the admin unless the username exists; the existing row is returned untouched.
    async fn ensure_admin(&self, new: NewAdmin) -> RepoResult<Admin>;

    // --- Students ---
    async fn find_student(&self, id: Uuid) -> RepoResult<Option<Student>>;
    async fn find_student_by_identifier(
        &self,
        identifier: &StudentIdentifier,
    ) -> RepoResult<Option<Student>>;
    async fn create_student(&self, new: NewStudent) -> RepoResult<Student>;

    // --- Articles ---
    /// Newest first.
    async fn list_articles(&self, filter: &ArticleFilter) -> RepoResult<Vec<Article>>;
    async fn find_article(&self, id: Uuid) -> RepoResult<Option<Article>>;
    async fn create_article(&self, new: NewArticle) -> RepoResult<Article>;
    async fn update_article(&self, id: Uuid, changes: ArticleChanges)
    -> RepoResult<Option<Article>>;
    async fn delete_article(&self, id: Uuid) -> RepoResult<bool>;

    // --- Comments ---
    /// Newest first, joined with the commenting student when there is one.
    async fn list_comments(&self, article_id: Uuid) -> RepoResult<Vec<Comment>>;
    async fn find_comment(&self, id: Uuid) -> RepoResult<Option<Comment>>;
    async fn create_comment(&self, new: NewComment) -> RepoResult<Comment>;
    async fn delete_comment(&self, id: Uuid) -> RepoResult<bool>;

    // --- Visits ---
    /// Newest first, optionally restricted to one status.
    async fn list_visits(&self, status: Option<VisitStatus>) -> RepoResult<Vec<Visit>>;
    async fn find_visit(&self, id: Uuid) -> RepoResult<Option<Visit>>;
    async fn create_visit(&self, new: NewVisit) -> RepoResult<Visit>;
    /// Last write wins; no transition rules are applied to `status`.
    async fn update_visit(&self, id: Uuid, changes: VisitChanges) -> RepoResult<Option<Visit>>;
    async fn delete_visit(&self, id: Uuid) -> RepoResult<bool>;

    // --- Dashboard ---
    async fn get_stats(&self, today: NaiveDate) -> RepoResult<DashboardStats>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
