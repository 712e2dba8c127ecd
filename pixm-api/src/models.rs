//! Normalized records produced at the API boundary.
//!
//! These are the only item/author shapes the store and the sync pipeline
//! operate on.

use chrono::{DateTime, FixedOffset};
use std::fmt;
use std::str::FromStr;

/// Closed set of remote item types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// Single or multi-page still image set.
    Illust,
    /// Multi-page comic.
    Manga,
    /// Short animation reconstructed from a frame archive.
    Ugoira,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Illust => "illust",
            Self::Manga => "manga",
            Self::Ugoira => "ugoira",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "illust" => Ok(Self::Illust),
            "manga" => Ok(Self::Manga),
            "ugoira" => Ok(Self::Ugoira),
            other => Err(format!("unknown item kind: {other}")),
        }
    }
}

/// Tag with its optional translation; deduplicated by `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub translated_name: Option<String>,
}

/// Asset URLs for one page, by resolution variant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageUrls {
    pub original: Option<String>,
    pub large: Option<String>,
    pub medium: Option<String>,
    pub square: Option<String>,
}

impl PageUrls {
    /// Highest-resolution URL available for download.
    pub fn best(&self) -> Option<&str> {
        self.original
            .as_deref()
            .or(self.large.as_deref())
            .or(self.medium.as_deref())
    }
}

/// Metadata needed to rebuild an animation from its frame archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationDescriptor {
    /// Frame archive (ZIP) URL, upgraded to the high-resolution variant.
    pub archive_url: String,
    /// Per-frame display duration in hundredths of a second, one entry
    /// per frame in archive listing order.
    pub frame_delays_cs: Vec<u32>,
}

/// Minimal author record known from a listing item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorStub {
    pub id: i64,
    pub name: String,
    pub account: String,
    pub is_followed: bool,
}

/// Full author record from the profile endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorProfile {
    pub id: i64,
    pub name: String,
    pub account: String,
    pub is_followed: bool,
    pub total_illusts: i64,
    pub total_manga: i64,
    pub total_novels: i64,
    pub total_public_bookmarks: i64,
    pub total_followers: i64,
}

/// A fully normalized remote item.
#[derive(Debug, Clone)]
pub struct NormalizedItem {
    pub id: i64,
    pub author: AuthorStub,
    pub kind: ItemKind,
    pub title: String,
    pub caption: String,
    /// Always equals `pages.len()`.
    pub page_count: u32,
    pub total_views: i64,
    pub total_bookmarks: i64,
    /// bookmarks / views, 0 when the item has no views yet.
    pub bookmark_rate: f64,
    pub is_bookmarked: bool,
    pub created_at: DateTime<FixedOffset>,
    pub tags: Vec<Tag>,
    /// One entry per page, in display order.
    pub pages: Vec<PageUrls>,
    /// Present iff `kind == ItemKind::Ugoira`.
    pub animation: Option<AnimationDescriptor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_kind_round_trips() {
        for kind in [ItemKind::Illust, ItemKind::Manga, ItemKind::Ugoira] {
            assert_eq!(kind.as_str().parse::<ItemKind>().unwrap(), kind);
        }
        assert!("novel".parse::<ItemKind>().is_err());
    }

    #[test]
    fn best_url_prefers_original() {
        let urls = PageUrls {
            original: Some("o".into()),
            large: Some("l".into()),
            medium: Some("m".into()),
            square: None,
        };
        assert_eq!(urls.best(), Some("o"));

        let urls = PageUrls {
            original: None,
            large: Some("l".into()),
            medium: Some("m".into()),
            square: None,
        };
        assert_eq!(urls.best(), Some("l"));

        assert_eq!(PageUrls::default().best(), None);
    }
}
