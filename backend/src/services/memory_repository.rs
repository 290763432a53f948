//! In-memory repositories
//!
//! Process-local catalog storage mirroring the PostgreSQL schema rules
//! (missing parents rejected, unique numbers per parent, cascading
//! deletes). Counts repository reads so tests can observe cache behavior.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::repository::{
    ChapterRepository, MangaRepository, PageRepository, Repositories, RepositoryError,
};
use crate::models::{Chapter, EntityKind, Manga, NewChapter, NewManga, NewPage, Page};

#[derive(Debug, Default)]
struct CatalogState {
    next_id: i64,
    manga: BTreeMap<i64, Manga>,
    chapters: BTreeMap<i64, Chapter>,
    pages: BTreeMap<i64, Page>,
}

impl CatalogState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn chapter_number_taken(&self, manga_id: i64, number: i32, except: Option<i64>) -> bool {
        self.chapters
            .values()
            .any(|c| c.manga_id == manga_id && c.number == number && Some(c.id) != except)
    }

    fn page_number_taken(&self, chapter_id: i64, number: i32, except: Option<i64>) -> bool {
        self.pages
            .values()
            .any(|p| p.chapter_id == chapter_id && p.number == number && Some(p.id) != except)
    }

    fn remove_chapter_cascade(&mut self, chapter_id: i64) {
        self.chapters.remove(&chapter_id);
        self.pages.retain(|_, p| p.chapter_id != chapter_id);
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: RwLock<CatalogState>,
    reads: AtomicUsize,
}

/// Shared in-memory catalog handing out the three repository views
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    inner: Arc<Inner>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn manga_repository(&self) -> Arc<dyn MangaRepository> {
        Arc::new(InMemoryMangaRepository(self.clone()))
    }

    pub fn chapter_repository(&self) -> Arc<dyn ChapterRepository> {
        Arc::new(InMemoryChapterRepository(self.clone()))
    }

    pub fn page_repository(&self) -> Arc<dyn PageRepository> {
        Arc::new(InMemoryPageRepository(self.clone()))
    }

    pub fn repositories(&self) -> Repositories {
        Repositories {
            manga: self.manga_repository(),
            chapters: self.chapter_repository(),
            pages: self.page_repository(),
        }
    }

    /// Number of read calls served so far (lookups and listings)
    pub fn read_count(&self) -> usize {
        self.inner.reads.load(Ordering::SeqCst)
    }

    fn record_read(&self) {
        self.inner.reads.fetch_add(1, Ordering::SeqCst);
    }
}

struct InMemoryMangaRepository(InMemoryCatalog);
struct InMemoryChapterRepository(InMemoryCatalog);
struct InMemoryPageRepository(InMemoryCatalog);

#[async_trait]
impl MangaRepository for InMemoryMangaRepository {
    async fn create(&self, new: &NewManga) -> Result<Manga, RepositoryError> {
        let mut state = self.0.inner.state.write().await;
        let manga = Manga {
            id: state.allocate_id(),
            title: new.title.clone(),
            description: new.description.clone(),
        };
        state.manga.insert(manga.id, manga.clone());
        Ok(manga)
    }

    async fn get_by_id(&self, id: i64) -> Result<Manga, RepositoryError> {
        self.0.record_read();
        self.0
            .inner
            .state
            .read()
            .await
            .manga
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::not_found(EntityKind::Manga, id))
    }

    async fn list(&self) -> Result<Vec<Manga>, RepositoryError> {
        self.0.record_read();
        Ok(self.0.inner.state.read().await.manga.values().cloned().collect())
    }

    async fn update(&self, id: i64, changes: &NewManga) -> Result<Manga, RepositoryError> {
        let mut state = self.0.inner.state.write().await;
        let manga = state
            .manga
            .get_mut(&id)
            .ok_or(RepositoryError::not_found(EntityKind::Manga, id))?;
        manga.title = changes.title.clone();
        manga.description = changes.description.clone();
        Ok(manga.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let mut state = self.0.inner.state.write().await;
        if state.manga.remove(&id).is_none() {
            return Err(RepositoryError::not_found(EntityKind::Manga, id));
        }
        let chapter_ids: Vec<i64> = state
            .chapters
            .values()
            .filter(|c| c.manga_id == id)
            .map(|c| c.id)
            .collect();
        for chapter_id in chapter_ids {
            state.remove_chapter_cascade(chapter_id);
        }
        Ok(())
    }
}

#[async_trait]
impl ChapterRepository for InMemoryChapterRepository {
    async fn create(&self, new: &NewChapter) -> Result<Chapter, RepositoryError> {
        let mut state = self.0.inner.state.write().await;
        if !state.manga.contains_key(&new.manga_id) {
            return Err(RepositoryError::Validation(
                "chapter references a missing parent".to_string(),
            ));
        }
        if state.chapter_number_taken(new.manga_id, new.number, None) {
            return Err(RepositoryError::Conflict(
                "chapter with the same number already exists".to_string(),
            ));
        }
        let chapter = Chapter {
            id: state.allocate_id(),
            manga_id: new.manga_id,
            number: new.number,
            title: new.title.clone(),
        };
        state.chapters.insert(chapter.id, chapter.clone());
        Ok(chapter)
    }

    async fn get_by_id(&self, id: i64) -> Result<Chapter, RepositoryError> {
        self.0.record_read();
        self.0
            .inner
            .state
            .read()
            .await
            .chapters
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::not_found(EntityKind::Chapter, id))
    }

    async fn list_by_manga(&self, manga_id: i64) -> Result<Vec<Chapter>, RepositoryError> {
        self.0.record_read();
        let state = self.0.inner.state.read().await;
        let mut chapters: Vec<Chapter> = state
            .chapters
            .values()
            .filter(|c| c.manga_id == manga_id)
            .cloned()
            .collect();
        chapters.sort_by_key(|c| c.number);
        Ok(chapters)
    }

    async fn update(&self, id: i64, changes: &NewChapter) -> Result<Chapter, RepositoryError> {
        let mut state = self.0.inner.state.write().await;
        if !state.chapters.contains_key(&id) {
            return Err(RepositoryError::not_found(EntityKind::Chapter, id));
        }
        if !state.manga.contains_key(&changes.manga_id) {
            return Err(RepositoryError::Validation(
                "chapter references a missing parent".to_string(),
            ));
        }
        if state.chapter_number_taken(changes.manga_id, changes.number, Some(id)) {
            return Err(RepositoryError::Conflict(
                "chapter with the same number already exists".to_string(),
            ));
        }
        let chapter = Chapter {
            id,
            manga_id: changes.manga_id,
            number: changes.number,
            title: changes.title.clone(),
        };
        state.chapters.insert(id, chapter.clone());
        Ok(chapter)
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let mut state = self.0.inner.state.write().await;
        if !state.chapters.contains_key(&id) {
            return Err(RepositoryError::not_found(EntityKind::Chapter, id));
        }
        state.remove_chapter_cascade(id);
        Ok(())
    }
}

#[async_trait]
impl PageRepository for InMemoryPageRepository {
    async fn create(&self, new: &NewPage) -> Result<Page, RepositoryError> {
        let mut state = self.0.inner.state.write().await;
        if !state.chapters.contains_key(&new.chapter_id) {
            return Err(RepositoryError::Validation(
                "page references a missing parent".to_string(),
            ));
        }
        if state.page_number_taken(new.chapter_id, new.number, None) {
            return Err(RepositoryError::Conflict(
                "page with the same number already exists".to_string(),
            ));
        }
        let page = Page {
            id: state.allocate_id(),
            chapter_id: new.chapter_id,
            number: new.number,
            image_path: new.image_path.clone(),
        };
        state.pages.insert(page.id, page.clone());
        Ok(page)
    }

    async fn get_by_id(&self, id: i64) -> Result<Page, RepositoryError> {
        self.0.record_read();
        self.0
            .inner
            .state
            .read()
            .await
            .pages
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::not_found(EntityKind::Page, id))
    }

    async fn list_by_chapter(&self, chapter_id: i64) -> Result<Vec<Page>, RepositoryError> {
        self.0.record_read();
        let state = self.0.inner.state.read().await;
        let mut pages: Vec<Page> = state
            .pages
            .values()
            .filter(|p| p.chapter_id == chapter_id)
            .cloned()
            .collect();
        pages.sort_by_key(|p| p.number);
        Ok(pages)
    }

    async fn update(&self, id: i64, changes: &NewPage) -> Result<Page, RepositoryError> {
        let mut state = self.0.inner.state.write().await;
        if !state.pages.contains_key(&id) {
            return Err(RepositoryError::not_found(EntityKind::Page, id));
        }
        if !state.chapters.contains_key(&changes.chapter_id) {
            return Err(RepositoryError::Validation(
                "page references a missing parent".to_string(),
            ));
        }
        if state.page_number_taken(changes.chapter_id, changes.number, Some(id)) {
            return Err(RepositoryError::Conflict(
                "page with the same number already exists".to_string(),
            ));
        }
        let page = Page {
            id,
            chapter_id: changes.chapter_id,
            number: changes.number,
            image_path: changes.image_path.clone(),
        };
        state.pages.insert(id, page.clone());
        Ok(page)
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let mut state = self.0.inner.state.write().await;
        if state.pages.remove(&id).is_none() {
            return Err(RepositoryError::not_found(EntityKind::Page, id));
        }
        Ok(())
    }
}
