//! Item selection for downloads.
//!
//! Filters gate which items get their assets queued; every visible item
//! is cataloged regardless of the outcome here.

use std::collections::HashSet;

use pixm_api::{ItemKind, NormalizedItem};

#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    /// Only items of this kind pass, when set.
    pub kind: Option<ItemKind>,
    /// Every listed tag must be present on the item.
    pub include_tags: Vec<String>,
    /// No listed tag may be present on the item.
    pub exclude_tags: Vec<String>,
}

impl ItemFilter {
    pub fn matches(&self, item: &NormalizedItem) -> bool {
        if let Some(kind) = self.kind {
            if item.kind != kind {
                return false;
            }
        }

        let names: HashSet<&str> = item.tags.iter().map(|t| t.name.as_str()).collect();
        if !self.include_tags.iter().all(|t| names.contains(t.as_str())) {
            return false;
        }
        if self.exclude_tags.iter().any(|t| names.contains(t.as_str())) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixm_api::{AuthorStub, PageUrls, Tag};

    fn item(kind: ItemKind, tags: &[&str]) -> NormalizedItem {
        NormalizedItem {
            id: 1,
            author: AuthorStub {
                id: 7,
                name: "a".into(),
                account: "a".into(),
                is_followed: false,
            },
            kind,
            title: String::new(),
            caption: String::new(),
            page_count: 1,
            total_views: 0,
            total_bookmarks: 0,
            bookmark_rate: 0.0,
            is_bookmarked: false,
            created_at: chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00+09:00")
                .unwrap(),
            tags: tags
                .iter()
                .map(|name| Tag {
                    name: (*name).to_string(),
                    translated_name: None,
                })
                .collect(),
            pages: vec![PageUrls::default()],
            animation: None,
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(ItemFilter::default().matches(&item(ItemKind::Illust, &["any"])));
    }

    #[test]
    fn kind_filter_gates_by_type() {
        let filter = ItemFilter {
            kind: Some(ItemKind::Ugoira),
            ..Default::default()
        };
        assert!(filter.matches(&item(ItemKind::Ugoira, &[])));
        assert!(!filter.matches(&item(ItemKind::Illust, &[])));
    }

    #[test]
    fn include_tags_must_all_be_present() {
        let filter = ItemFilter {
            include_tags: vec!["sky".into(), "landscape".into()],
            ..Default::default()
        };
        assert!(filter.matches(&item(ItemKind::Illust, &["sky", "landscape", "extra"])));
        assert!(!filter.matches(&item(ItemKind::Illust, &["sky"])));
    }

    #[test]
    fn any_exclude_tag_rejects() {
        let filter = ItemFilter {
            exclude_tags: vec!["wip".into()],
            ..Default::default()
        };
        assert!(filter.matches(&item(ItemKind::Illust, &["sky"])));
        assert!(!filter.matches(&item(ItemKind::Illust, &["sky", "wip"])));
    }
}
