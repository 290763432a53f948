//! Cache key definitions
//!
//! Every cached entity or listing is addressed by a [`CacheKey`]. Storage
//! keys encode the kind and the scope so that no two distinct keys map to
//! the same string.

use std::fmt;

/// Namespace shared by all entity cache entries
const CACHE_PREFIX: &str = "cache";

/// Cache key for an entity detail or a listing scoped by its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// All manga
    MangaList,
    MangaDetail(i64),
    /// Chapters of one manga
    ChapterList { manga_id: i64 },
    ChapterDetail(i64),
    /// Pages of one chapter
    PageList { chapter_id: i64 },
    PageDetail(i64),
}

impl CacheKey {
    /// Convert to storage key string
    ///
    /// Format: `cache:<kind>:list`, `cache:<kind>:<id>` or
    /// `cache:<parent kind>:<parent id>:<children>`.
    pub fn to_storage_key(&self) -> String {
        match self {
            Self::MangaList => format!("{CACHE_PREFIX}:manga:list"),
            Self::MangaDetail(id) => format!("{CACHE_PREFIX}:manga:{id}"),
            Self::ChapterList { manga_id } => format!("{CACHE_PREFIX}:manga:{manga_id}:chapters"),
            Self::ChapterDetail(id) => format!("{CACHE_PREFIX}:chapter:{id}"),
            Self::PageList { chapter_id } => format!("{CACHE_PREFIX}:chapter:{chapter_id}:pages"),
            Self::PageDetail(id) => format!("{CACHE_PREFIX}:page:{id}"),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_storage_key())
    }
}
