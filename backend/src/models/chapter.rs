//! Chapter model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Chapter entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Chapter {
    pub id: i64,
    pub manga_id: i64,
    pub number: i32,
    pub title: String,
}

/// Request payload for chapter creation and update
#[derive(Debug, Clone, Deserialize)]
pub struct NewChapter {
    pub manga_id: i64,
    pub number: i32,
    pub title: String,
}

impl NewChapter {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        if self.manga_id <= 0 {
            return Err("manga_id must be a positive integer".to_string());
        }
        if self.number < 0 {
            return Err("number must not be negative".to_string());
        }
        Ok(())
    }
}

/// Chapter detail merged with its current view count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterWithViews {
    pub id: i64,
    pub manga_id: i64,
    pub number: i32,
    pub title: String,
    pub views: i64,
}

impl ChapterWithViews {
    pub fn new(chapter: Chapter, views: i64) -> Self {
        Self {
            id: chapter.id,
            manga_id: chapter.manga_id,
            number: chapter.number,
            title: chapter.title,
            views,
        }
    }
}
