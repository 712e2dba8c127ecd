//! The gallery listing/metadata capability consumed by the sync pipeline.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::AuthorProfile;
use crate::types::{ListingPage, RawUgoiraMetadata};

/// Which listing a sync run walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingSource {
    /// The author's own submissions.
    Works,
    /// The author's bookmarks; `private` selects the restricted shelf.
    Bookmarks { private: bool },
}

/// Paginated gallery API.
///
/// Implementations own auth and transport; every method may fail with a
/// network error, which callers wrap in the shared retry policy.
#[async_trait]
pub trait GalleryApi: Send + Sync {
    /// Fetch the first listing page for `source` of `author_id`.
    async fn fetch_listing_page(
        &self,
        source: ListingSource,
        author_id: i64,
    ) -> Result<ListingPage>;

    /// Fetch a continuation page via the `next_url` of a previous page.
    async fn fetch_next_page(&self, next_url: &str) -> Result<ListingPage>;

    /// Fetch the frame archive URL and per-frame delays of an animated item.
    async fn fetch_animation_metadata(&self, item_id: i64) -> Result<RawUgoiraMetadata>;

    /// Fetch the full profile of an author.
    async fn fetch_author_profile(&self, author_id: i64) -> Result<AuthorProfile>;
}
