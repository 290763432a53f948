//! Page model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Page entity. `image_path` points at the stored image file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Page {
    pub id: i64,
    pub chapter_id: i64,
    pub number: i32,
    pub image_path: String,
}

impl Page {
    /// Content type inferred from the image file extension (JPEG when unknown)
    pub fn content_type(&self) -> &'static str {
        let path = self.image_path.to_ascii_lowercase();
        if path.ends_with(".png") {
            "image/png"
        } else if path.ends_with(".webp") {
            "image/webp"
        } else if path.ends_with(".gif") {
            "image/gif"
        } else {
            "image/jpeg"
        }
    }
}

/// Request payload for page creation and update
#[derive(Debug, Clone, Deserialize)]
pub struct NewPage {
    pub chapter_id: i64,
    pub number: i32,
    pub image_path: String,
}

impl NewPage {
    pub fn validate(&self) -> Result<(), String> {
        if self.chapter_id <= 0 {
            return Err("chapter_id must be a positive integer".to_string());
        }
        if self.number < 0 {
            return Err("number must not be negative".to_string());
        }
        if self.image_path.trim().is_empty() {
            return Err("image_path must not be empty".to_string());
        }
        Ok(())
    }
}

/// Page metadata merged with its current view count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWithViews {
    pub id: i64,
    pub chapter_id: i64,
    pub number: i32,
    pub image_path: String,
    pub views: i64,
}

impl PageWithViews {
    pub fn new(page: Page, views: i64) -> Self {
        Self {
            id: page.id,
            chapter_id: page.chapter_id,
            number: page.number,
            image_path: page.image_path,
            views,
        }
    }
}
