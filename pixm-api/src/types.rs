//! Wire payload types for the Pixiv app-API.
//!
//! These structs mirror the JSON shapes returned by `app-api.pixiv.net`
//! and exist only at the API boundary; the rest of the workspace consumes
//! the normalized records in [`crate::models`].

use serde::Deserialize;

/// One page of a works/bookmarks listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingPage {
    #[serde(default)]
    pub illusts: Vec<RawItem>,
    pub next_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawItem {
    pub id: i64,
    pub title: String,
    /// "illust", "manga" or "ugoira".
    #[serde(rename = "type")]
    pub kind: String,
    pub image_urls: RawImageUrls,
    #[serde(default)]
    pub caption: String,
    pub user: RawUser,
    #[serde(default)]
    pub tags: Vec<RawTag>,
    pub create_date: String,
    pub page_count: u32,
    #[serde(default)]
    pub meta_single_page: RawMetaSinglePage,
    #[serde(default)]
    pub meta_pages: Vec<RawMetaPage>,
    #[serde(default)]
    pub total_view: i64,
    #[serde(default)]
    pub total_bookmarks: i64,
    #[serde(default)]
    pub is_bookmarked: bool,
    /// Deleted and restricted works come back with `visible: false` and
    /// mostly-empty fields; such items are skipped by the pipeline.
    #[serde(default)]
    pub visible: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawUser {
    pub id: i64,
    pub name: String,
    pub account: String,
    #[serde(default)]
    pub is_followed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTag {
    pub name: String,
    #[serde(default)]
    pub translated_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawImageUrls {
    #[serde(default)]
    pub square_medium: Option<String>,
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub large: Option<String>,
    #[serde(default)]
    pub original: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMetaSinglePage {
    #[serde(default)]
    pub original_image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMetaPage {
    pub image_urls: RawImageUrls,
}

/// Envelope of `v1/ugoira/metadata`.
#[derive(Debug, Clone, Deserialize)]
pub struct UgoiraMetadataResponse {
    pub ugoira_metadata: RawUgoiraMetadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawUgoiraMetadata {
    pub zip_urls: RawZipUrls,
    pub frames: Vec<RawFrame>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawZipUrls {
    pub medium: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFrame {
    pub file: String,
    /// Display duration in milliseconds.
    pub delay: u32,
}

/// Envelope of `v1/user/detail`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorDetailResponse {
    pub user: RawUser,
    #[serde(default)]
    pub profile: RawProfile,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProfile {
    #[serde(default)]
    pub total_illusts: i64,
    #[serde(default)]
    pub total_manga: i64,
    #[serde(default)]
    pub total_novels: i64,
    #[serde(default)]
    pub total_illust_bookmarks_public: i64,
    #[serde(default)]
    pub total_follow_users: i64,
}

/// Envelope of the OAuth token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OauthResponse {
    pub response: OauthInner,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OauthInner {
    pub access_token: String,
    pub refresh_token: String,
    pub user: OauthUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OauthUser {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_listing_page() {
        let raw = r#"{
            "illusts": [{
                "id": 100,
                "title": "t",
                "type": "illust",
                "image_urls": {"medium": "https://i.pximg.net/m/100_p0.jpg"},
                "caption": "",
                "user": {"id": 7, "name": "n", "account": "a", "is_followed": false},
                "tags": [{"name": "tag1", "translated_name": null}],
                "create_date": "2024-05-01T12:00:00+09:00",
                "page_count": 1,
                "meta_single_page": {"original_image_url": "https://i.pximg.net/o/100_p0.png"},
                "meta_pages": [],
                "total_view": 10,
                "total_bookmarks": 2,
                "is_bookmarked": false,
                "visible": true
            }],
            "next_url": null
        }"#;

        let page: ListingPage = serde_json::from_str(raw).unwrap();
        assert_eq!(page.illusts.len(), 1);
        assert!(page.next_url.is_none());
        let item = &page.illusts[0];
        assert_eq!(item.id, 100);
        assert_eq!(item.kind, "illust");
        assert!(item.visible);
        assert_eq!(
            item.meta_single_page.original_image_url.as_deref(),
            Some("https://i.pximg.net/o/100_p0.png")
        );
    }

    #[test]
    fn parses_ugoira_metadata() {
        let raw = r#"{
            "ugoira_metadata": {
                "zip_urls": {"medium": "https://i.pximg.net/z/600x600/77_ugoira.zip"},
                "frames": [
                    {"file": "000000.jpg", "delay": 70},
                    {"file": "000001.jpg", "delay": 130}
                ]
            }
        }"#;

        let meta: UgoiraMetadataResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(meta.ugoira_metadata.frames.len(), 2);
        assert_eq!(meta.ugoira_metadata.frames[1].delay, 130);
    }

    #[test]
    fn invisible_item_defaults() {
        // Restricted works omit most fields; only the minimal shape is
        // guaranteed.
        let raw = r#"{
            "id": 5,
            "title": "",
            "type": "illust",
            "image_urls": {},
            "user": {"id": 1, "name": "", "account": ""},
            "create_date": "2024-01-01T00:00:00+09:00",
            "page_count": 0,
            "visible": false
        }"#;

        let item: RawItem = serde_json::from_str(raw).unwrap();
        assert!(!item.visible);
        assert!(item.meta_pages.is_empty());
    }
}
