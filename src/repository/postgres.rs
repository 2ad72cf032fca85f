use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, query_builder::QueryBuilder};
use uuid::Uuid;

use super::{RepoResult, Repository};
use crate::models::{
    Admin, AdminChanges, AdminWithCounts, Article, ArticleChanges, ArticleFilter, Comment,
    DashboardStats, NewAdmin, NewArticle, NewComment, NewStudent, NewVisit, Student,
    StudentIdentifier, Visit, VisitChanges, VisitStatus,
};

const ADMIN_COLUMNS: &str = "id, name, username, password_hash, role, created_at, updated_at";

const STUDENT_COLUMNS: &str =
    "id, name, nisn, email, password_hash, class, phone, created_at, updated_at";

/// Article projection over a source aliased `ar` (a table or a CTE), joined with its author.
fn article_select(source: &str) -> String {
    format!(
        r#"
        SELECT ar.id, ar.title, ar.excerpt, ar.content, ar.image, ar.category, ar.read_time,
               ar.author_id, ad.name AS author_name, ar.created_at, ar.updated_at
        FROM {source} ar
        JOIN admins ad ON ad.id = ar.author_id
        "#
    )
}

/// Comment projection over a source aliased `c`, joined with the commenting student.
fn comment_select(source: &str) -> String {
    format!(
        r#"
        SELECT c.id, c.article_id, c.student_id, c.name, c.email, c.content,
               c.created_at, c.updated_at, s.name AS student_name, s.class AS student_class
        FROM {source} c
        LEFT JOIN students s ON s.id = c.student_id
        "#
    )
}

/// Visit projection over a source aliased `v`. Student-linked visits take their contact
/// details from the student record.
fn visit_select(source: &str) -> String {
    format!(
        r#"
        SELECT v.id, v.student_id,
               COALESCE(s.name, v.student_name) AS student_name,
               COALESCE(s.class, v.class) AS class,
               COALESCE(v.email, s.email) AS email,
               COALESCE(s.phone, v.phone) AS phone,
               v.visit_date, v.visit_time, v.reason, v.status, v.notes, v.approved_by,
               ad.name AS approver_name, v.created_at, v.updated_at
        FROM {source} v
        LEFT JOIN students s ON s.id = v.student_id
        LEFT JOIN admins ad ON ad.id = v.approved_by
        "#
    )
}

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Queries are built at runtime and bound with
/// parameters; nothing user-supplied is ever interpolated into SQL text.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- ADMINS ---

    async fn find_admin(&self, id: Uuid) -> RepoResult<Option<Admin>> {
        sqlx::query_as::<_, Admin>(&format!("SELECT {ADMIN_COLUMNS} FROM admins WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_admin_by_username(&self, username: &str) -> RepoResult<Option<Admin>> {
        sqlx::query_as::<_, Admin>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admins WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    /// list_admins
    ///
    /// Counts are correlated subqueries so admins with no articles or visits still appear.
    async fn list_admins(&self) -> RepoResult<Vec<AdminWithCounts>> {
        sqlx::query_as::<_, AdminWithCounts>(
            r#"
            SELECT a.id, a.name, a.username, a.role, a.created_at, a.updated_at,
                   (SELECT COUNT(*) FROM articles ar WHERE ar.author_id = a.id) AS article_count,
                   (SELECT COUNT(*) FROM visits v WHERE v.approved_by = a.id) AS visit_count
            FROM admins a
            ORDER BY a.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn create_admin(&self, new: NewAdmin) -> RepoResult<Admin> {
        sqlx::query_as::<_, Admin>(&format!(
            r#"
            INSERT INTO admins (id, name, username, password_hash, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING {ADMIN_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new.name)
        .bind(new.username)
        .bind(new.password_hash)
        .bind(new.role.as_str())
        .fetch_one(&self.pool)
        .await
    }

    /// update_admin
    ///
    /// `COALESCE` keeps the current value for every field left as `None`.
    async fn update_admin(&self, id: Uuid, changes: AdminChanges) -> RepoResult<Option<Admin>> {
        sqlx::query_as::<_, Admin>(&format!(
            r#"
            UPDATE admins
            SET name = COALESCE($2, name),
                username = COALESCE($3, username),
                password_hash = COALESCE($4, password_hash),
                role = COALESCE($5, role),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ADMIN_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.username)
        .bind(changes.password_hash)
        .bind(changes.role.map(|role| role.as_str()))
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_admin(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM admins WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// ensure_admin
    ///
    /// `ON CONFLICT DO NOTHING` returns no row when the username is taken, in which case
    /// the existing row is read back.
    async fn ensure_admin(&self, new: NewAdmin) -> RepoResult<Admin> {
        let inserted = sqlx::query_as::<_, Admin>(&format!(
            r#"
            INSERT INTO admins (id, name, username, password_hash, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            ON CONFLICT (username) DO NOTHING
            RETURNING {ADMIN_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.username)
        .bind(&new.password_hash)
        .bind(new.role.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(admin) => Ok(admin),
            None => self
                .find_admin_by_username(&new.username)
                .await?
                .ok_or(sqlx::Error::RowNotFound),
        }
    }

    // --- STUDENTS ---

    async fn find_student(&self, id: Uuid) -> RepoResult<Option<Student>> {
        sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_student_by_identifier(
        &self,
        identifier: &StudentIdentifier,
    ) -> RepoResult<Option<Student>> {
        let (column, value) = match identifier {
            StudentIdentifier::Nisn(nisn) => ("nisn", nisn),
            StudentIdentifier::Email(email) => ("email", email),
        };

        sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE {column} = $1"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_student(&self, new: NewStudent) -> RepoResult<Student> {
        sqlx::query_as::<_, Student>(&format!(
            r#"
            INSERT INTO students (id, name, nisn, email, password_hash, class, phone, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
            RETURNING {STUDENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new.name)
        .bind(new.nisn)
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.class_name)
        .bind(new.phone)
        .fetch_one(&self.pool)
        .await
    }

    // --- ARTICLES ---

    /// list_articles
    ///
    /// Optional filters are appended with `QueryBuilder::push_bind`, keeping every value
    /// parameterised.
    async fn list_articles(&self, filter: &ArticleFilter) -> RepoResult<Vec<Article>> {
        let base = article_select("articles");
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(base.as_str());
        builder.push(" WHERE TRUE");

        if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
            builder.push(" AND ar.category = ");
            builder.push_bind(category.to_string());
        }

        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = contains_pattern(search);
            builder.push(" AND (ar.title ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(r" ESCAPE '\' OR ar.excerpt ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(r" ESCAPE '\' OR ar.content ILIKE ");
            builder.push_bind(pattern);
            builder.push(r" ESCAPE '\')");
        }

        builder.push(" ORDER BY ar.created_at DESC");

        builder
            .build_query_as::<Article>()
            .fetch_all(&self.pool)
            .await
    }

    async fn find_article(&self, id: Uuid) -> RepoResult<Option<Article>> {
        sqlx::query_as::<_, Article>(&format!("{} WHERE ar.id = $1", article_select("articles")))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// create_article
    ///
    /// Inserts and joins the author name in one round trip through a CTE.
    async fn create_article(&self, new: NewArticle) -> RepoResult<Article> {
        let query = format!(
            r#"
            WITH inserted AS (
                INSERT INTO articles (id, title, excerpt, content, image, category, read_time, author_id, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW())
                RETURNING *
            )
            {}
            "#,
            article_select("inserted")
        );

        sqlx::query_as::<_, Article>(&query)
            .bind(Uuid::new_v4())
            .bind(new.title)
            .bind(new.excerpt)
            .bind(new.content)
            .bind(new.image)
            .bind(new.category)
            .bind(new.read_time)
            .bind(new.author_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn update_article(
        &self,
        id: Uuid,
        changes: ArticleChanges,
    ) -> RepoResult<Option<Article>> {
        let query = format!(
            r#"
            WITH updated AS (
                UPDATE articles
                SET title = COALESCE($2, title),
                    excerpt = COALESCE($3, excerpt),
                    content = COALESCE($4, content),
                    image = COALESCE($5, image),
                    category = COALESCE($6, category),
                    read_time = COALESCE($7, read_time),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            {}
            "#,
            article_select("updated")
        );

        sqlx::query_as::<_, Article>(&query)
            .bind(id)
            .bind(changes.title)
            .bind(changes.excerpt)
            .bind(changes.content)
            .bind(changes.image)
            .bind(changes.category)
            .bind(changes.read_time)
            .fetch_optional(&self.pool)
            .await
    }

    async fn delete_article(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- COMMENTS ---

    async fn list_comments(&self, article_id: Uuid) -> RepoResult<Vec<Comment>> {
        sqlx::query_as::<_, Comment>(&format!(
            "{} WHERE c.article_id = $1 ORDER BY c.created_at DESC",
            comment_select("comments")
        ))
        .bind(article_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn find_comment(&self, id: Uuid) -> RepoResult<Option<Comment>> {
        sqlx::query_as::<_, Comment>(&format!("{} WHERE c.id = $1", comment_select("comments")))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_comment(&self, new: NewComment) -> RepoResult<Comment> {
        let query = format!(
            r#"
            WITH inserted AS (
                INSERT INTO comments (id, article_id, student_id, name, email, content, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
                RETURNING *
            )
            {}
            "#,
            comment_select("inserted")
        );

        sqlx::query_as::<_, Comment>(&query)
            .bind(Uuid::new_v4())
            .bind(new.article_id)
            .bind(new.student_id)
            .bind(new.name)
            .bind(new.email)
            .bind(new.content)
            .fetch_one(&self.pool)
            .await
    }

    async fn delete_comment(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- VISITS ---

    async fn list_visits(&self, status: Option<VisitStatus>) -> RepoResult<Vec<Visit>> {
        let base = visit_select("visits");
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(base.as_str());

        if let Some(status) = status {
            builder.push(" WHERE v.status = ");
            builder.push_bind(status.as_str());
        }

        builder.push(" ORDER BY v.created_at DESC");

        builder
            .build_query_as::<Visit>()
            .fetch_all(&self.pool)
            .await
    }

    async fn find_visit(&self, id: Uuid) -> RepoResult<Option<Visit>> {
        sqlx::query_as::<_, Visit>(&format!("{} WHERE v.id = $1", visit_select("visits")))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// create_visit
    ///
    /// New visits always start as PENDING.
    async fn create_visit(&self, new: NewVisit) -> RepoResult<Visit> {
        let query = format!(
            r#"
            WITH inserted AS (
                INSERT INTO visits (id, student_id, student_name, class, email, phone,
                                    visit_date, visit_time, reason, status, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'PENDING', NOW(), NOW())
                RETURNING *
            )
            {}
            "#,
            visit_select("inserted")
        );

        sqlx::query_as::<_, Visit>(&query)
            .bind(Uuid::new_v4())
            .bind(new.student_id)
            .bind(new.student_name)
            .bind(new.class_name)
            .bind(new.email)
            .bind(new.phone)
            .bind(new.visit_date)
            .bind(new.visit_time)
            .bind(new.reason)
            .fetch_one(&self.pool)
            .await
    }

    /// update_visit
    ///
    /// `notes` is applied whenever the caller sent the field at all, so an explicit null
    /// clears it.
    async fn update_visit(&self, id: Uuid, changes: VisitChanges) -> RepoResult<Option<Visit>> {
        let (notes_provided, notes) = match changes.notes {
            Some(notes) => (true, notes),
            None => (false, None),
        };

        let query = format!(
            r#"
            WITH updated AS (
                UPDATE visits
                SET status = COALESCE($2, status),
                    notes = CASE WHEN $3 THEN $4 ELSE notes END,
                    approved_by = COALESCE($5, approved_by),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            {}
            "#,
            visit_select("updated")
        );

        sqlx::query_as::<_, Visit>(&query)
            .bind(id)
            .bind(changes.status.map(|status| status.as_str()))
            .bind(notes_provided)
            .bind(notes)
            .bind(changes.approved_by)
            .fetch_optional(&self.pool)
            .await
    }

    async fn delete_visit(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM visits WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- DASHBOARD ---

    async fn get_stats(&self, today: NaiveDate) -> RepoResult<DashboardStats> {
        sqlx::query_as::<_, DashboardStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM articles) AS total_articles,
                (SELECT COUNT(*) FROM visits) AS total_visits,
                (SELECT COUNT(*) FROM visits WHERE status = 'PENDING') AS pending_visits,
                (SELECT COUNT(*) FROM visits WHERE visit_date = $1) AS today_visits,
                (SELECT COUNT(*) FROM students) AS total_students,
                (SELECT COUNT(*) FROM comments) AS total_comments
            "#,
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await
    }
}

/// `ILIKE` pattern matching `needle` literally anywhere in the value. Pair with
/// `ESCAPE '\'`.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
