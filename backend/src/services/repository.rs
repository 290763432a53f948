//! Repositories
//!
//! Durable CRUD storage for manga, chapters and pages. The traits are the
//! seam the catalog services depend on; the PostgreSQL implementations are
//! the production backends.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use crate::models::{Chapter, EntityKind, Manga, NewChapter, NewManga, NewPage, Page};

/// Errors that can occur during repository operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: i64 },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl RepositoryError {
    pub fn not_found(kind: EntityKind, id: i64) -> Self {
        Self::NotFound { kind, id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Map constraint violations to typed errors, everything else to `Database`
fn classify(err: sqlx::Error, kind: EntityKind) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict(format!(
                "{kind} with the same number already exists"
            ));
        }
        if db_err.is_foreign_key_violation() {
            return RepositoryError::Validation(format!("{kind} references a missing parent"));
        }
    }
    RepositoryError::Database(err)
}

#[async_trait]
pub trait MangaRepository: Send + Sync {
    async fn create(&self, new: &NewManga) -> Result<Manga, RepositoryError>;
    async fn get_by_id(&self, id: i64) -> Result<Manga, RepositoryError>;
    async fn list(&self) -> Result<Vec<Manga>, RepositoryError>;
    async fn update(&self, id: i64, changes: &NewManga) -> Result<Manga, RepositoryError>;
    async fn delete(&self, id: i64) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ChapterRepository: Send + Sync {
    async fn create(&self, new: &NewChapter) -> Result<Chapter, RepositoryError>;
    async fn get_by_id(&self, id: i64) -> Result<Chapter, RepositoryError>;
    async fn list_by_manga(&self, manga_id: i64) -> Result<Vec<Chapter>, RepositoryError>;
    async fn update(&self, id: i64, changes: &NewChapter) -> Result<Chapter, RepositoryError>;
    async fn delete(&self, id: i64) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait PageRepository: Send + Sync {
    async fn create(&self, new: &NewPage) -> Result<Page, RepositoryError>;
    async fn get_by_id(&self, id: i64) -> Result<Page, RepositoryError>;
    async fn list_by_chapter(&self, chapter_id: i64) -> Result<Vec<Page>, RepositoryError>;
    async fn update(&self, id: i64, changes: &NewPage) -> Result<Page, RepositoryError>;
    async fn delete(&self, id: i64) -> Result<(), RepositoryError>;
}

/// The three catalog repositories, as handed to the services
#[derive(Clone)]
pub struct Repositories {
    pub manga: Arc<dyn MangaRepository>,
    pub chapters: Arc<dyn ChapterRepository>,
    pub pages: Arc<dyn PageRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            manga: Arc::new(PgMangaRepository::new(pool.clone())),
            chapters: Arc::new(PgChapterRepository::new(pool.clone())),
            pages: Arc::new(PgPageRepository::new(pool)),
        }
    }
}

// ============================================================================
// PostgreSQL implementations
// ============================================================================

#[derive(Debug, Clone)]
pub struct PgMangaRepository {
    pool: PgPool,
}

impl PgMangaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MangaRepository for PgMangaRepository {
    async fn create(&self, new: &NewManga) -> Result<Manga, RepositoryError> {
        sqlx::query_as::<_, Manga>(
            "INSERT INTO manga (title, description) VALUES ($1, $2) RETURNING id, title, description",
        )
        .bind(&new.title)
        .bind(&new.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, EntityKind::Manga))
    }

    async fn get_by_id(&self, id: i64) -> Result<Manga, RepositoryError> {
        sqlx::query_as::<_, Manga>("SELECT id, title, description FROM manga WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::not_found(EntityKind::Manga, id))
    }

    async fn list(&self) -> Result<Vec<Manga>, RepositoryError> {
        Ok(
            sqlx::query_as::<_, Manga>("SELECT id, title, description FROM manga ORDER BY id")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn update(&self, id: i64, changes: &NewManga) -> Result<Manga, RepositoryError> {
        sqlx::query_as::<_, Manga>(
            r#"
            UPDATE manga SET title = $2, description = $3
            WHERE id = $1
            RETURNING id, title, description
            "#,
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify(e, EntityKind::Manga))?
        .ok_or(RepositoryError::not_found(EntityKind::Manga, id))
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM manga WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found(EntityKind::Manga, id));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PgChapterRepository {
    pool: PgPool,
}

impl PgChapterRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChapterRepository for PgChapterRepository {
    async fn create(&self, new: &NewChapter) -> Result<Chapter, RepositoryError> {
        sqlx::query_as::<_, Chapter>(
            r#"
            INSERT INTO chapters (manga_id, number, title) VALUES ($1, $2, $3)
            RETURNING id, manga_id, number, title
            "#,
        )
        .bind(new.manga_id)
        .bind(new.number)
        .bind(&new.title)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, EntityKind::Chapter))
    }

    async fn get_by_id(&self, id: i64) -> Result<Chapter, RepositoryError> {
        sqlx::query_as::<_, Chapter>(
            "SELECT id, manga_id, number, title FROM chapters WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::not_found(EntityKind::Chapter, id))
    }

    async fn list_by_manga(&self, manga_id: i64) -> Result<Vec<Chapter>, RepositoryError> {
        Ok(sqlx::query_as::<_, Chapter>(
            "SELECT id, manga_id, number, title FROM chapters WHERE manga_id = $1 ORDER BY number",
        )
        .bind(manga_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update(&self, id: i64, changes: &NewChapter) -> Result<Chapter, RepositoryError> {
        sqlx::query_as::<_, Chapter>(
            r#"
            UPDATE chapters SET manga_id = $2, number = $3, title = $4
            WHERE id = $1
            RETURNING id, manga_id, number, title
            "#,
        )
        .bind(id)
        .bind(changes.manga_id)
        .bind(changes.number)
        .bind(&changes.title)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify(e, EntityKind::Chapter))?
        .ok_or(RepositoryError::not_found(EntityKind::Chapter, id))
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM chapters WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found(EntityKind::Chapter, id));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PgPageRepository {
    pool: PgPool,
}

impl PgPageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PageRepository for PgPageRepository {
    async fn create(&self, new: &NewPage) -> Result<Page, RepositoryError> {
        sqlx::query_as::<_, Page>(
            r#"
            INSERT INTO pages (chapter_id, number, image_path) VALUES ($1, $2, $3)
            RETURNING id, chapter_id, number, image_path
            "#,
        )
        .bind(new.chapter_id)
        .bind(new.number)
        .bind(&new.image_path)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, EntityKind::Page))
    }

    async fn get_by_id(&self, id: i64) -> Result<Page, RepositoryError> {
        sqlx::query_as::<_, Page>(
            "SELECT id, chapter_id, number, image_path FROM pages WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::not_found(EntityKind::Page, id))
    }

    async fn list_by_chapter(&self, chapter_id: i64) -> Result<Vec<Page>, RepositoryError> {
        Ok(sqlx::query_as::<_, Page>(
            "SELECT id, chapter_id, number, image_path FROM pages WHERE chapter_id = $1 ORDER BY number",
        )
        .bind(chapter_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update(&self, id: i64, changes: &NewPage) -> Result<Page, RepositoryError> {
        sqlx::query_as::<_, Page>(
            r#"
            UPDATE pages SET chapter_id = $2, number = $3, image_path = $4
            WHERE id = $1
            RETURNING id, chapter_id, number, image_path
            "#,
        )
        .bind(id)
        .bind(changes.chapter_id)
        .bind(changes.number)
        .bind(&changes.image_path)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify(e, EntityKind::Page))?
        .ok_or(RepositoryError::not_found(EntityKind::Page, id))
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM pages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found(EntityKind::Page, id));
        }
        Ok(())
    }
}
