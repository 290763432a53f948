//! Manga model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Manga entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Manga {
    pub id: i64,
    pub title: String,
    pub description: String,
}

/// Request payload for manga creation and update
#[derive(Debug, Clone, Deserialize)]
pub struct NewManga {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl NewManga {
    /// Check the payload before it reaches the repository
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        Ok(())
    }
}

/// Manga detail merged with its current view count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MangaWithViews {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub views: i64,
}

impl MangaWithViews {
    pub fn new(manga: Manga, views: i64) -> Self {
        Self {
            id: manga.id,
            title: manga.title,
            description: manga.description,
            views,
        }
    }
}
