//! Raw payload → normalized record mapping.
//!
//! This is the single place untyped remote shapes are interpreted. The
//! mapping is strict about the invariants downstream code relies on
//! (page count matches the page-URL list, known item kind, parseable
//! timestamp); violations surface as [`ApiError::MalformedPayload`] and
//! abort the current page.

use std::collections::HashSet;

use chrono::DateTime;

use crate::error::{ApiError, Result};
use crate::models::{
    AnimationDescriptor, AuthorProfile, AuthorStub, ItemKind, NormalizedItem, PageUrls, Tag,
};
use crate::types::{AuthorDetailResponse, RawImageUrls, RawItem, RawUgoiraMetadata};

/// The ugoira metadata endpoint hands out the medium-resolution archive;
/// the high-resolution variant lives at the same path with this marker
/// swapped. The downloader falls back again if the upgrade 404s.
const ARCHIVE_LOW_RES: &str = "600x600";
const ARCHIVE_HIGH_RES: &str = "1920x1080";

fn page_urls(urls: &RawImageUrls, original: Option<&str>) -> PageUrls {
    PageUrls {
        original: original
            .map(str::to_owned)
            .or_else(|| urls.original.clone()),
        large: urls.large.clone(),
        medium: urls.medium.clone(),
        square: urls.square_medium.clone(),
    }
}

/// Normalize one visible listing item.
///
/// `ugoira` must be supplied for animated items (the pipeline fetches it
/// from the metadata endpoint before calling this).
pub fn normalize_item(
    raw: &RawItem,
    ugoira: Option<&RawUgoiraMetadata>,
) -> Result<NormalizedItem> {
    let kind: ItemKind = raw
        .kind
        .parse()
        .map_err(|e: String| ApiError::MalformedPayload(format!("item {}: {e}", raw.id)))?;

    let created_at = DateTime::parse_from_rfc3339(&raw.create_date).map_err(|e| {
        ApiError::MalformedPayload(format!(
            "item {}: bad create_date {:?}: {e}",
            raw.id, raw.create_date
        ))
    })?;

    // Dedup tags by text, keeping first occurrence order.
    let mut seen = HashSet::new();
    let tags: Vec<Tag> = raw
        .tags
        .iter()
        .filter(|t| seen.insert(t.name.clone()))
        .map(|t| Tag {
            name: t.name.clone(),
            translated_name: t.translated_name.clone(),
        })
        .collect();

    // Single-page items carry their original URL out-of-line in
    // meta_single_page; multi-page items list everything in meta_pages.
    let pages: Vec<PageUrls> = if raw.meta_pages.is_empty() {
        vec![page_urls(
            &raw.image_urls,
            raw.meta_single_page.original_image_url.as_deref(),
        )]
    } else {
        raw.meta_pages
            .iter()
            .map(|p| page_urls(&p.image_urls, None))
            .collect()
    };

    if pages.len() != raw.page_count as usize {
        return Err(ApiError::MalformedPayload(format!(
            "item {}: page_count {} does not match {} page URL sets",
            raw.id,
            raw.page_count,
            pages.len()
        )));
    }

    let animation = ugoira.map(|meta| AnimationDescriptor {
        archive_url: meta
            .zip_urls
            .medium
            .replace(ARCHIVE_LOW_RES, ARCHIVE_HIGH_RES),
        frame_delays_cs: meta.frames.iter().map(|f| f.delay / 10).collect(),
    });

    let bookmark_rate = if raw.total_view > 0 {
        raw.total_bookmarks as f64 / raw.total_view as f64
    } else {
        0.0
    };

    Ok(NormalizedItem {
        id: raw.id,
        author: AuthorStub {
            id: raw.user.id,
            name: raw.user.name.clone(),
            account: raw.user.account.clone(),
            is_followed: raw.user.is_followed,
        },
        kind,
        title: raw.title.clone(),
        caption: raw.caption.clone(),
        page_count: raw.page_count,
        total_views: raw.total_view,
        total_bookmarks: raw.total_bookmarks,
        bookmark_rate,
        is_bookmarked: raw.is_bookmarked,
        created_at,
        tags,
        pages,
        animation,
    })
}

/// Map a `user/detail` response to the enriched author record.
pub fn map_author_profile(resp: &AuthorDetailResponse) -> AuthorProfile {
    AuthorProfile {
        id: resp.user.id,
        name: resp.user.name.clone(),
        account: resp.user.account.clone(),
        is_followed: resp.user.is_followed,
        total_illusts: resp.profile.total_illusts,
        total_manga: resp.profile.total_manga,
        total_novels: resp.profile.total_novels,
        total_public_bookmarks: resp.profile.total_illust_bookmarks_public,
        total_followers: resp.profile.total_follow_users,
    }
}
