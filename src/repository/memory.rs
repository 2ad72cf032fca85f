use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::error::{DatabaseError, ErrorKind};
use std::{
    borrow::Cow,
    error::Error as StdError,
    sync::{Mutex, MutexGuard},
};
use uuid::Uuid;

use super::{RepoResult, Repository};
use crate::models::{
    Admin, AdminChanges, AdminWithCounts, Article, ArticleChanges, ArticleFilter, Comment,
    DashboardStats, NewAdmin, NewArticle, NewComment, NewStudent, NewVisit, Student,
    StudentIdentifier, Visit, VisitChanges, VisitStatus,
};

/// Duplicate-key failure shaped like the one Postgres raises (SQLSTATE 23505), so callers
/// classify both backends the same way.
#[derive(Debug, thiserror::Error)]
#[error("duplicate key value violates unique constraint \"{constraint}\"")]
struct UniqueViolation {
    constraint: &'static str,
}

impl DatabaseError for UniqueViolation {
    fn message(&self) -> &str {
        "duplicate key value violates unique constraint"
    }

    fn code(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed("23505"))
    }

    fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
        self
    }

    fn constraint(&self) -> Option<&str> {
        Some(self.constraint)
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::UniqueViolation
    }
}

fn unique_violation(constraint: &'static str) -> sqlx::Error {
    sqlx::Error::Database(Box::new(UniqueViolation { constraint }))
}

#[derive(Default)]
struct MemoryState {
    admins: Vec<Admin>,
    students: Vec<Student>,
    articles: Vec<Article>,
    comments: Vec<Comment>,
    visits: Vec<Visit>,
}

impl MemoryState {
    fn admin_name(&self, id: Uuid) -> Option<String> {
        self.admins
            .iter()
            .find(|admin| admin.id == id)
            .map(|admin| admin.name.clone())
    }

    fn student(&self, id: Option<Uuid>) -> Option<&Student> {
        id.and_then(|id| self.students.iter().find(|student| student.id == id))
    }

    fn hydrate_article(&self, article: &Article) -> Article {
        Article {
            author_name: self.admin_name(article.author_id).unwrap_or_default(),
            ..article.clone()
        }
    }

    fn hydrate_comment(&self, comment: &Comment) -> Comment {
        let student = self.student(comment.student_id);
        Comment {
            student_name: student.map(|s| s.name.clone()),
            student_class: student.and_then(|s| s.class_name.clone()),
            ..comment.clone()
        }
    }

    /// Mirrors the COALESCE rules of the SQL projection.
    fn hydrate_visit(&self, visit: &Visit) -> Visit {
        let student = self.student(visit.student_id);
        Visit {
            student_name: student
                .map(|s| s.name.clone())
                .or_else(|| visit.student_name.clone()),
            class_name: student
                .and_then(|s| s.class_name.clone())
                .or_else(|| visit.class_name.clone()),
            email: visit
                .email
                .clone()
                .or_else(|| student.and_then(|s| s.email.clone())),
            phone: student
                .and_then(|s| s.phone.clone())
                .or_else(|| visit.phone.clone()),
            approver_name: visit.approved_by.and_then(|id| self.admin_name(id)),
            ..visit.clone()
        }
    }
}

/// Newest first; rows sharing a timestamp keep reverse insertion order.
fn newest_first<T, F>(rows: impl DoubleEndedIterator<Item = T>, created_at: F) -> Vec<T>
where
    F: Fn(&T) -> chrono::DateTime<Utc>,
{
    let mut rows: Vec<T> = rows.rev().collect();
    rows.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
    rows
}

/// InMemoryRepository
///
/// A process-local `Repository` used by the handler and router tests, so the HTTP
/// behaviour can be exercised without a PostgreSQL instance. It mirrors the cascade rules
/// of the SQL schema.
#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<MemoryState>,
    /// When true, every operation fails as if the database were unreachable.
    pub should_fail: bool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    fn state(&self) -> RepoResult<MutexGuard<'_, MemoryState>> {
        if self.should_fail {
            return Err(sqlx::Error::PoolClosed);
        }
        self.state
            .lock()
            .map_err(|_| sqlx::Error::Protocol("in-memory repository lock poisoned".into()))
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    // --- ADMINS ---

    async fn find_admin(&self, id: Uuid) -> RepoResult<Option<Admin>> {
        Ok(self.state()?.admins.iter().find(|a| a.id == id).cloned())
    }

    async fn find_admin_by_username(&self, username: &str) -> RepoResult<Option<Admin>> {
        Ok(self
            .state()?
            .admins
            .iter()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn list_admins(&self) -> RepoResult<Vec<AdminWithCounts>> {
        let state = self.state()?;
        let rows = state.admins.iter().map(|admin| AdminWithCounts {
            id: admin.id,
            name: admin.name.clone(),
            username: admin.username.clone(),
            role: admin.role.clone(),
            created_at: admin.created_at,
            updated_at: admin.updated_at,
            article_count: state
                .articles
                .iter()
                .filter(|ar| ar.author_id == admin.id)
                .count() as i64,
            visit_count: state
                .visits
                .iter()
                .filter(|v| v.approved_by == Some(admin.id))
                .count() as i64,
        });
        Ok(newest_first(rows.collect::<Vec<_>>().into_iter(), |row| {
            row.created_at
        }))
    }

    async fn create_admin(&self, new: NewAdmin) -> RepoResult<Admin> {
        let mut state = self.state()?;
        if state.admins.iter().any(|a| a.username == new.username) {
            return Err(unique_violation("admins_username_key"));
        }

        let now = Utc::now();
        let admin = Admin {
            id: Uuid::new_v4(),
            name: new.name,
            username: new.username,
            password_hash: new.password_hash,
            role: new.role.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        state.admins.push(admin.clone());
        Ok(admin)
    }

    async fn update_admin(&self, id: Uuid, changes: AdminChanges) -> RepoResult<Option<Admin>> {
        let mut state = self.state()?;
        if let Some(username) = &changes.username {
            if state
                .admins
                .iter()
                .any(|a| a.id != id && &a.username == username)
            {
                return Err(unique_violation("admins_username_key"));
            }
        }
        let Some(admin) = state.admins.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };

        if let Some(name) = changes.name {
            admin.name = name;
        }
        if let Some(username) = changes.username {
            admin.username = username;
        }
        if let Some(password_hash) = changes.password_hash {
            admin.password_hash = password_hash;
        }
        if let Some(role) = changes.role {
            admin.role = role.as_str().to_string();
        }
        admin.updated_at = Utc::now();
        Ok(Some(admin.clone()))
    }

    /// Cascades to the admin's articles and their comments; approved visits are kept
    /// with the approver cleared.
    async fn delete_admin(&self, id: Uuid) -> RepoResult<bool> {
        let mut state = self.state()?;
        let before = state.admins.len();
        state.admins.retain(|a| a.id != id);
        if state.admins.len() == before {
            return Ok(false);
        }

        let removed: Vec<Uuid> = state
            .articles
            .iter()
            .filter(|ar| ar.author_id == id)
            .map(|ar| ar.id)
            .collect();
        state.articles.retain(|ar| ar.author_id != id);
        state.comments.retain(|c| !removed.contains(&c.article_id));
        for visit in state.visits.iter_mut().filter(|v| v.approved_by == Some(id)) {
            visit.approved_by = None;
        }
        Ok(true)
    }

    async fn ensure_admin(&self, new: NewAdmin) -> RepoResult<Admin> {
        if let Some(existing) = self.find_admin_by_username(&new.username).await? {
            return Ok(existing);
        }
        self.create_admin(new).await
    }

    // --- STUDENTS ---

    async fn find_student(&self, id: Uuid) -> RepoResult<Option<Student>> {
        Ok(self.state()?.students.iter().find(|s| s.id == id).cloned())
    }

    async fn find_student_by_identifier(
        &self,
        identifier: &StudentIdentifier,
    ) -> RepoResult<Option<Student>> {
        let state = self.state()?;
        let found = state.students.iter().find(|s| match identifier {
            StudentIdentifier::Nisn(nisn) => s.nisn.as_deref() == Some(nisn.as_str()),
            StudentIdentifier::Email(email) => s.email.as_deref() == Some(email.as_str()),
        });
        Ok(found.cloned())
    }

    async fn create_student(&self, new: NewStudent) -> RepoResult<Student> {
        let mut state = self.state()?;
        if new.nisn.is_some() && state.students.iter().any(|s| s.nisn == new.nisn) {
            return Err(unique_violation("students_nisn_key"));
        }
        if new.email.is_some() && state.students.iter().any(|s| s.email == new.email) {
            return Err(unique_violation("students_email_key"));
        }
        let now = Utc::now();
        let student = Student {
            id: Uuid::new_v4(),
            name: new.name,
            nisn: new.nisn,
            email: new.email,
            password_hash: new.password_hash,
            class_name: new.class_name,
            phone: new.phone,
            created_at: now,
            updated_at: now,
        };
        state.students.push(student.clone());
        Ok(student)
    }

    // --- ARTICLES ---

    async fn list_articles(&self, filter: &ArticleFilter) -> RepoResult<Vec<Article>> {
        let state = self.state()?;
        let category = filter.category.as_deref().filter(|c| !c.is_empty());
        let search = filter
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let rows: Vec<Article> = state
            .articles
            .iter()
            .filter(|ar| category.is_none_or(|c| ar.category == c))
            .filter(|ar| {
                search.as_deref().is_none_or(|needle| {
                    [&ar.title, &ar.excerpt, &ar.content]
                        .iter()
                        .any(|field| field.to_lowercase().contains(needle))
                })
            })
            .map(|ar| state.hydrate_article(ar))
            .collect();

        Ok(newest_first(rows.into_iter(), |ar| ar.created_at))
    }

    async fn find_article(&self, id: Uuid) -> RepoResult<Option<Article>> {
        let state = self.state()?;
        Ok(state
            .articles
            .iter()
            .find(|ar| ar.id == id)
            .map(|ar| state.hydrate_article(ar)))
    }

    async fn create_article(&self, new: NewArticle) -> RepoResult<Article> {
        let mut state = self.state()?;
        if !state.admins.iter().any(|a| a.id == new.author_id) {
            return Err(sqlx::Error::Protocol("article author does not exist".into()));
        }

        let now = Utc::now();
        let article = Article {
            id: Uuid::new_v4(),
            title: new.title,
            excerpt: new.excerpt,
            content: new.content,
            image: new.image,
            category: new.category,
            read_time: new.read_time,
            author_id: new.author_id,
            author_name: String::new(),
            created_at: now,
            updated_at: now,
        };
        state.articles.push(article.clone());
        Ok(state.hydrate_article(&article))
    }

    async fn update_article(
        &self,
        id: Uuid,
        changes: ArticleChanges,
    ) -> RepoResult<Option<Article>> {
        let mut state = self.state()?;
        let Some(article) = state.articles.iter_mut().find(|ar| ar.id == id) else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            article.title = title;
        }
        if let Some(excerpt) = changes.excerpt {
            article.excerpt = excerpt;
        }
        if let Some(content) = changes.content {
            article.content = content;
        }
        if let Some(image) = changes.image {
            article.image = image;
        }
        if let Some(category) = changes.category {
            article.category = category;
        }
        if let Some(read_time) = changes.read_time {
            article.read_time = read_time;
        }
        article.updated_at = Utc::now();

        let updated = article.clone();
        Ok(Some(state.hydrate_article(&updated)))
    }

    async fn delete_article(&self, id: Uuid) -> RepoResult<bool> {
        let mut state = self.state()?;
        let before = state.articles.len();
        state.articles.retain(|ar| ar.id != id);
        let removed = state.articles.len() != before;
        if removed {
            state.comments.retain(|c| c.article_id != id);
        }
        Ok(removed)
    }

    // --- COMMENTS ---

    async fn list_comments(&self, article_id: Uuid) -> RepoResult<Vec<Comment>> {
        let state = self.state()?;
        let rows: Vec<Comment> = state
            .comments
            .iter()
            .filter(|c| c.article_id == article_id)
            .map(|c| state.hydrate_comment(c))
            .collect();
        Ok(newest_first(rows.into_iter(), |c| c.created_at))
    }

    async fn find_comment(&self, id: Uuid) -> RepoResult<Option<Comment>> {
        let state = self.state()?;
        Ok(state
            .comments
            .iter()
            .find(|c| c.id == id)
            .map(|c| state.hydrate_comment(c)))
    }

    async fn create_comment(&self, new: NewComment) -> RepoResult<Comment> {
        let mut state = self.state()?;
        if !state.articles.iter().any(|ar| ar.id == new.article_id) {
            return Err(sqlx::Error::Protocol("comment article does not exist".into()));
        }

        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4(),
            article_id: new.article_id,
            student_id: new.student_id,
            name: new.name,
            email: new.email,
            content: new.content,
            created_at: now,
            updated_at: now,
            student_name: None,
            student_class: None,
        };
        state.comments.push(comment.clone());
        Ok(state.hydrate_comment(&comment))
    }

    async fn delete_comment(&self, id: Uuid) -> RepoResult<bool> {
        let mut state = self.state()?;
        let before = state.comments.len();
        state.comments.retain(|c| c.id != id);
        Ok(state.comments.len() != before)
    }

    // --- VISITS ---

    async fn list_visits(&self, status: Option<VisitStatus>) -> RepoResult<Vec<Visit>> {
        let state = self.state()?;
        let rows: Vec<Visit> = state
            .visits
            .iter()
            .filter(|v| status.is_none_or(|s| v.status == s.as_str()))
            .map(|v| state.hydrate_visit(v))
            .collect();
        Ok(newest_first(rows.into_iter(), |v| v.created_at))
    }

    async fn find_visit(&self, id: Uuid) -> RepoResult<Option<Visit>> {
        let state = self.state()?;
        Ok(state
            .visits
            .iter()
            .find(|v| v.id == id)
            .map(|v| state.hydrate_visit(v)))
    }

    async fn create_visit(&self, new: NewVisit) -> RepoResult<Visit> {
        let mut state = self.state()?;
        let now = Utc::now();
        let visit = Visit {
            id: Uuid::new_v4(),
            student_id: new.student_id,
            student_name: new.student_name,
            class_name: new.class_name,
            email: new.email,
            phone: new.phone,
            visit_date: new.visit_date,
            visit_time: new.visit_time,
            reason: new.reason,
            status: VisitStatus::Pending.as_str().to_string(),
            notes: None,
            approved_by: None,
            approver_name: None,
            created_at: now,
            updated_at: now,
        };
        state.visits.push(visit.clone());
        Ok(state.hydrate_visit(&visit))
    }

    async fn update_visit(&self, id: Uuid, changes: VisitChanges) -> RepoResult<Option<Visit>> {
        let mut state = self.state()?;
        let Some(visit) = state.visits.iter_mut().find(|v| v.id == id) else {
            return Ok(None);
        };

        if let Some(status) = changes.status {
            visit.status = status.as_str().to_string();
        }
        if let Some(notes) = changes.notes {
            visit.notes = notes;
        }
        if let Some(approved_by) = changes.approved_by {
            visit.approved_by = Some(approved_by);
        }
        visit.updated_at = Utc::now();

        let updated = visit.clone();
        Ok(Some(state.hydrate_visit(&updated)))
    }

    async fn delete_visit(&self, id: Uuid) -> RepoResult<bool> {
        let mut state = self.state()?;
        let before = state.visits.len();
        state.visits.retain(|v| v.id != id);
        Ok(state.visits.len() != before)
    }

    // --- DASHBOARD ---

    async fn get_stats(&self, today: NaiveDate) -> RepoResult<DashboardStats> {
        let state = self.state()?;
        let count = |n: usize| n as i64;
        Ok(DashboardStats {
            total_articles: count(state.articles.len()),
            total_visits: count(state.visits.len()),
            pending_visits: count(
                state
                    .visits
                    .iter()
                    .filter(|v| v.status == VisitStatus::Pending.as_str())
                    .count(),
            ),
            today_visits: count(state.visits.iter().filter(|v| v.visit_date == today).count()),
            total_students: count(state.students.len()),
            total_comments: count(state.comments.len()),
        })
    }
}
