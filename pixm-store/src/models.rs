//! Row types read back from the catalog.

use crate::error::Result;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuthorRow {
    pub id: i64,
    pub name: String,
    pub account: String,
    pub is_followed: bool,
    pub is_stub: bool,
    pub total_illusts: i64,
    pub total_manga: i64,
    pub total_novels: i64,
    pub total_public_bookmarks: i64,
    pub total_followers: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ItemRow {
    pub id: i64,
    pub author_id: i64,
    pub kind: String,
    pub title: String,
    pub caption: String,
    pub page_count: i64,
    pub total_views: i64,
    pub total_bookmarks: i64,
    pub bookmark_rate: f64,
    pub is_bookmarked: bool,
    pub is_downloaded: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnimationAssetRow {
    pub item_id: i64,
    pub archive_url: String,
    frame_delays: String,
}

impl AnimationAssetRow {
    /// Per-frame delays in hundredths of a second.
    pub fn frame_delays(&self) -> Result<Vec<u32>> {
        Ok(serde_json::from_str(&self.frame_delays)?)
    }
}
